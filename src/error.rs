//! Error taxonomy shared by the registry, reader task and command
//! dispatcher. Every variant carries (or can derive) a POSIX-style error
//! code so the programmatic API (a signed integer) and the verbose sink
//! framing (a human-readable line) can both be produced from the same
//! value.

use nix::errno::Errno;
use snafu::Snafu;
use std::io;

/// Errors surfaced by the device-multiplexing core.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CoreError {
    /// The requested id/name does not resolve in the device context.
    #[snafu(display("No such device"))]
    NoDevice {
        /// The selector the caller used to look the device up, kept for
        /// diagnostics; the wire text is fixed regardless of its value.
        device: String,
    },

    /// A caller asked for a sample size that disagrees with the one
    /// already agreed upon by an existing entry's subscribers.
    #[snafu(display("Invalid argument"))]
    InvalidArgument {
        /// Sample size already in use by the entry.
        expected: usize,
        /// Sample size the new caller asked for.
        actual: usize,
    },

    /// Buffer allocation for a hardware read failed.
    #[snafu(display("Cannot allocate memory"))]
    OutOfMemory,

    /// The device handle's `open` returned a non-zero (positive errno)
    /// code.
    #[snafu(display("{}", Errno::from_i32(*code).desc()))]
    DeviceOpenFailed {
        /// Positive errno reported by the device handle.
        code: i32,
    },

    /// The device handle's `read_raw` returned a negative code.
    #[snafu(display("{}", Errno::from_i32(-*code).desc()))]
    DeviceReadFailed {
        /// The raw (negative) value returned by `read_raw`.
        code: i32,
    },

    /// A named attribute read or write returned a non-zero (positive
    /// errno) code.
    #[snafu(display("{}", Errno::from_i32(*code).desc()))]
    AttrIoFailed {
        /// Positive errno reported by the device handle.
        code: i32,
    },

    /// Writing to a client's sink failed.
    #[snafu(display("{source}"))]
    SinkWriteFailed {
        /// The I/O error reported by the sink.
        source: io::Error,
    },

    /// The reader task could not be spawned.
    #[snafu(display("{source}"))]
    ThreadSpawnFailed {
        /// The OS error reported by the thread spawn call.
        source: io::Error,
    },
}

impl CoreError {
    /// The signed status this error renders as on the wire: a negative
    /// errno, regardless of which sign convention the originating code used.
    pub fn errno_code(&self) -> i32 {
        match self {
            CoreError::NoDevice { .. } => -(Errno::ENODEV as i32),
            CoreError::InvalidArgument { .. } => -(Errno::EINVAL as i32),
            CoreError::OutOfMemory => -(Errno::ENOMEM as i32),
            CoreError::DeviceOpenFailed { code } => -code.abs(),
            CoreError::DeviceReadFailed { code } => -code.abs(),
            CoreError::AttrIoFailed { code } => -code.abs(),
            CoreError::SinkWriteFailed { source } => {
                -source.raw_os_error().unwrap_or(Errno::EIO as i32).abs()
            }
            CoreError::ThreadSpawnFailed { source } => {
                -source.raw_os_error().unwrap_or(Errno::EAGAIN as i32).abs()
            }
        }
    }
}
