//! Device-multiplexing read engine and command dispatcher for an IIO
//! daemon's server core.
//!
//! Multiple clients may ask to read samples from the same physical device
//! concurrently; this crate ensures each device is opened at most once,
//! coalesces concurrent readers into a single hardware read loop per
//! device, and dispatches bytes to every subscriber without blocking on a
//! slow one. It also services per-attribute read and write commands.
//!
//! Command parsing, transport, and device discovery are out of scope: the
//! dispatcher is driven by an external parser, and devices are handed in
//! through the [`Device`] and [`DeviceContext`] traits.

mod client;
mod device;
mod dispatcher;
mod entry;
mod error;
mod framing;
mod reader;
mod registry;
mod subscriber;

pub mod logging;

pub use client::ClientContext;
pub use device::{Device, DeviceContext, DeviceSelector};
pub use dispatcher::CommandDispatcher;
pub use error::CoreError;
pub use registry::Config;
