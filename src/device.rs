//! The opaque device handle the core operates against.
//!
//! Device discovery and the concrete transport to physical hardware are out
//! of scope here; the core only ever sees these two traits.

use std::sync::Arc;

/// A physical IIO device, opened and read through an opaque handle.
///
/// The core never owns a concrete implementation: it is handed `Arc<dyn
/// Device>` instances by a [`DeviceContext`] and otherwise treats them as
/// black boxes.
pub trait Device: Send + Sync {
    /// Stable identifier used as the registry key. Two [`Device`] values
    /// with the same id are treated as the same underlying hardware.
    fn id(&self) -> u32;

    /// Human-readable name, used for name-based lookup and diagnostics.
    fn name(&self) -> &str;

    /// Opens the device. Called at most once per device entry, by whichever
    /// caller's `read_dev` first creates it.
    fn open(&self) -> Result<(), i32>;

    /// Closes the device. Called at most once, by the reader task, after
    /// its last subscriber has been signalled and the entry removed from
    /// the registry.
    fn close(&self) -> Result<(), i32>;

    /// Performs one hardware read into `buf`, returning the number of bytes
    /// read on success, or a negative error code.
    fn read_raw(&self, buf: &mut [u8]) -> i32;

    /// Reads a named attribute's value into `buf`, returning the number of
    /// bytes written into it.
    fn attr_read(&self, name: &str, buf: &mut [u8]) -> Result<usize, i32>;

    /// Writes a named attribute's value.
    fn attr_write(&self, name: &str, value: &[u8]) -> Result<(), i32>;
}

/// Selects a device by id or by name — the two lookup keys the (out of
/// scope) command grammar exposes to callers.
#[derive(Debug, Clone, Copy)]
pub enum DeviceSelector<'a> {
    Id(u32),
    Name(&'a str),
}

impl DeviceSelector<'_> {
    pub(crate) fn describe(&self) -> String {
        match self {
            DeviceSelector::Id(id) => id.to_string(),
            DeviceSelector::Name(name) => (*name).to_string(),
        }
    }
}

/// Enumerates and resolves device handles. Discovery itself stays out of
/// scope; this trait only answers "does this selector resolve right now".
pub trait DeviceContext: Send + Sync {
    fn find(&self, selector: DeviceSelector<'_>) -> Option<Arc<dyn Device>>;
}
