//! The per-client record handed to the command dispatcher by the (out of
//! scope) command parser and the outer accept loop.

use std::io::{self, Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::DeviceContext;

/// State carried for the lifetime of one client connection.
pub struct ClientContext {
    /// Selects numeric (`%d\n`) vs human-readable (`ERROR: ...`) framing.
    pub verbose: bool,
    /// Opaque command source; the dispatcher never reads from it. Owned
    /// here only because a complete per-client record carries one.
    pub source: Box<dyn Read + Send>,
    /// Device context used to resolve id/name selectors.
    pub devices: Arc<dyn DeviceContext>,
    /// Set and read by the outer accept loop; the core never consults it.
    pub stop_requested: Arc<AtomicBool>,
    /// Client-bound output stream. Shared so a reader task can write into
    /// it while this client's thread is parked on a subscriber's
    /// completion signal; never touched by both sides at once.
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ClientContext {
    pub fn new(
        source: Box<dyn Read + Send>,
        sink: Box<dyn Write + Send>,
        verbose: bool,
        devices: Arc<dyn DeviceContext>,
    ) -> Self {
        Self {
            verbose,
            source,
            devices,
            stop_requested: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub(crate) fn sink_handle(&self) -> Arc<Mutex<Box<dyn Write + Send>>> {
        self.sink.clone()
    }

    pub(crate) fn lock_sink(&self) -> parking_lot::MutexGuard<'_, Box<dyn Write + Send>> {
        self.sink.lock()
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        self.sink.lock().flush()
    }
}
