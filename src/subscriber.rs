//! A single `read_dev` caller's stake in a device entry's stream.

use std::io::Write;
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::CoreError;

/// One caller's outstanding request against a device entry.
///
/// Lives in the entry's subscriber list, guarded by the entry's
/// subscriber-list lock. `remaining` is mutated only by the reader task
/// while holding that lock.
pub(crate) struct Subscriber {
    /// Samples still owed to this subscriber.
    pub(crate) remaining: usize,
    /// Selects numeric (`%d\n`) vs human-readable (`ERROR: ...`) framing.
    pub(crate) verbose: bool,
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
    done: Sender<Result<(), CoreError>>,
}

impl Subscriber {
    pub(crate) fn new(
        remaining: usize,
        verbose: bool,
        sink: Arc<Mutex<Box<dyn Write + Send>>>,
    ) -> (Self, Receiver<Result<(), CoreError>>) {
        // A channel with capacity one is the single-fire completion signal:
        // exactly one send, exactly one matching recv.
        let (done, rx) = bounded(1);
        (
            Self {
                remaining,
                verbose,
                sink,
                done,
            },
            rx,
        )
    }

    /// Runs `f` against the client's sink, holding its lock for the
    /// duration. The reader task and the waiting caller never call this
    /// concurrently on the same subscriber: the caller only touches the
    /// sink before linking and after this subscriber signals completion.
    pub(crate) fn write(&self, f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> std::io::Result<()> {
        let mut guard = self.sink.lock();
        f(&mut **guard)
    }

    /// Delivers the terminal status and unlinks this subscriber from
    /// whatever list it was stored in. Best-effort: a caller that gave up
    /// waiting leaves the channel with no receiver, which is fine.
    pub(crate) fn signal(self, status: Result<(), CoreError>) {
        let _ = self.done.send(status);
    }
}
