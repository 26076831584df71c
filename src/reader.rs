//! The per-device reader task: a detached OS thread that coalesces every
//! current subscriber's request into a single hardware read loop.

use std::io::Write;
use std::sync::Arc;

use nix::errno::Errno;

use crate::entry::DeviceEntry;
use crate::error::CoreError;
use crate::registry::DeviceRegistry;
use crate::subscriber::Subscriber;

enum Outcome {
    Keep,
    Done(Result<(), CoreError>),
}

/// What tore the entry's reader loop down, carried across the iteration
/// boundary so teardown can signal the right [`CoreError`] variant — a
/// failed allocation is not a device read failure, even though both end
/// the loop the same way.
#[derive(Clone, Copy)]
enum StickyError {
    Read(i32),
    OutOfMemory,
}

impl StickyError {
    fn into_core_error(self) -> CoreError {
        match self {
            StickyError::Read(code) => CoreError::DeviceReadFailed { code },
            StickyError::OutOfMemory => CoreError::OutOfMemory,
        }
    }
}

/// The reader task's body. Runs until its entry's subscriber list drains
/// naturally (every subscriber satisfied) or a hardware read fails.
pub(crate) fn run(registry: Arc<DeviceRegistry>, entry: Arc<DeviceEntry>, cap_bytes: usize) {
    let id = entry.device.id();
    let sample_size = entry.sample_size;
    let mut sticky: Option<StickyError> = None;

    let (map_guard, stop_error) = loop {
        let map_guard = registry.entries.lock();

        if let Some(err) = sticky {
            break (map_guard, Some(err));
        }

        let nb_samples = {
            let subs = entry.subscribers.lock();
            if subs.is_empty() {
                break (map_guard, None);
            }
            subs.iter()
                .map(|s| s.remaining)
                .min()
                .expect("checked non-empty above")
        };

        let cap = (cap_bytes / sample_size).max(1);
        let len = nb_samples.min(cap) * sample_size;

        let mut buf = Vec::new();
        if buf.try_reserve_exact(len).is_err() {
            sticky = Some(StickyError::OutOfMemory);
            continue;
        }
        buf.resize(len, 0u8);

        drop(map_guard);

        let ret = entry.device.read_raw(&mut buf);

        {
            let mut subs = entry.subscribers.lock();
            let mut i = 0;
            while i < subs.len() {
                match process_subscriber(&mut subs[i], ret, &buf, sample_size) {
                    Outcome::Keep => i += 1,
                    Outcome::Done(status) => {
                        subs.remove(i).signal(status);
                    }
                }
            }
        }

        if ret < 0 {
            sticky = Some(StickyError::Read(ret));
        }
    };

    // Teardown. The registry lock, acquired above, is held continuously
    // across signalling and removal so a racing `attach` either finds the
    // entry still intact or finds it gone; it can never link a subscriber
    // onto an entry mid-teardown.
    {
        let mut subs = entry.subscribers.lock();
        for sub in subs.drain(..) {
            let status = match stop_error {
                Some(err) => Err(err.into_core_error()),
                None => Ok(()),
            };
            sub.signal(status);
        }
    }

    let mut map_guard = map_guard;
    map_guard.remove(&id);
    drop(map_guard);

    if let Err(code) = entry.device.close() {
        tracing::warn!(device = id, code, "failed to close device");
    }

    tracing::debug!(device = id, "reader task exiting");
}

/// Applies one iteration's read result to a single subscriber, writing
/// framing and payload to its sink. Returns whether it stays linked.
fn process_subscriber(sub: &mut Subscriber, ret: i32, buf: &[u8], sample_size: usize) -> Outcome {
    if ret < 0 {
        let verbose = sub.verbose;
        let _ = sub.write(|w| {
            if verbose {
                let desc = Errno::from_i32(-ret).desc();
                write!(w, "ERROR reading device: {desc}\n")
            } else {
                write!(w, "{ret}\n")
            }
        });
        // Leave it linked; the next iteration sees the sticky error and
        // tears the entry down, signalling every remaining subscriber then.
        return Outcome::Keep;
    }

    let got = ret as usize / sample_size;
    if got > sub.remaining {
        // This subscriber joined after `nb_samples` was fixed for this
        // iteration; none of the bytes just read were sized for it.
        return Outcome::Keep;
    }

    let bytes = ret as usize;
    let verbose = sub.verbose;
    let result = sub.write(|w| {
        if !verbose {
            write!(w, "{ret}\n")?;
        }
        w.write_all(&buf[..bytes])
    });

    match result {
        Ok(()) => {
            sub.remaining -= got;
            if sub.remaining == 0 {
                Outcome::Done(Ok(()))
            } else {
                Outcome::Keep
            }
        }
        Err(source) => Outcome::Done(Err(CoreError::SinkWriteFailed { source })),
    }
}
