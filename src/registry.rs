//! Process-wide mapping from device id to its (at most one) live entry.
//!
//! `attach` is the only way into this map: it finds-or-creates an entry and
//! links the caller's subscriber in the same critical section, so a
//! freshly spawned reader task can never observe an empty subscriber list
//! before its first caller has joined. See DESIGN.md for why this departs
//! from a strict lookup-then-attach split.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::device::Device;
use crate::entry::DeviceEntry;
use crate::error::CoreError;
use crate::reader;
use crate::subscriber::Subscriber;

/// Tunable knobs for the read engine.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Upper bound, in bytes, on a single hardware read. Keeps a large
    /// request from starving other subscribers' joins and departures on
    /// the same device.
    pub read_cap_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_cap_bytes: 1024,
        }
    }
}

pub struct DeviceRegistry {
    entries: Mutex<HashMap<u32, Arc<DeviceEntry>>>,
    config: Config,
}

impl DeviceRegistry {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// Finds or creates the entry for `device` and links `subscriber` into
    /// it. Opens the device and spawns its reader task on first creation.
    ///
    /// Returns `InvalidArgument` if an existing entry already agreed on a
    /// different sample size, `DeviceOpenFailed` if opening a new device
    /// fails, or `ThreadSpawnFailed` if the reader task could not be
    /// started.
    pub(crate) fn attach(
        self: &Arc<Self>,
        device: Arc<dyn Device>,
        sample_size: usize,
        subscriber: Subscriber,
    ) -> Result<(), CoreError> {
        let mut map = self.entries.lock();
        let id = device.id();

        if let Some(entry) = map.get(&id) {
            if entry.sample_size != sample_size {
                return Err(CoreError::InvalidArgument {
                    expected: entry.sample_size,
                    actual: sample_size,
                });
            }
            entry.subscribers.lock().push(subscriber);
            return Ok(());
        }

        device.open().map_err(|code| CoreError::DeviceOpenFailed { code })?;

        let entry = Arc::new(DeviceEntry {
            device: device.clone(),
            sample_size,
            subscribers: Mutex::new(vec![subscriber]),
        });

        let registry = self.clone();
        let cap_bytes = self.config.read_cap_bytes;
        let for_thread = entry.clone();

        let spawned = thread::Builder::new()
            .name(format!("iiod-reader-{id}"))
            .spawn(move || reader::run(registry, for_thread, cap_bytes));

        match spawned {
            Ok(_detached) => {
                debug!(device = id, sample_size, "device entry created");
                map.insert(id, entry);
                Ok(())
            }
            Err(source) => {
                warn!(device = id, "failed to spawn reader task");
                let _ = device.close();
                Err(CoreError::ThreadSpawnFailed { source })
            }
        }
    }
}
