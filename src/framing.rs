//! Wire framing for the synchronous commands (`read_dev_attr`,
//! `write_dev_attr`, and device-lookup failures). The streaming `read_dev`
//! per-iteration framing lives next to the byte copy it interleaves with,
//! in `reader::process_subscriber`.

use std::io::{self, Write};

use crate::error::CoreError;

/// "ERROR: <description>\n" — used for device/attribute lookup and
/// attribute read/write failures.
pub(crate) const GENERIC_ERROR_PREFIX: &str = "ERROR: ";

fn write_status_line<W: Write>(mut sink: W, status: i32) -> io::Result<()> {
    write!(sink, "{status}\n")
}

fn write_error_line<W: Write>(mut sink: W, prefix: &str, err: &CoreError) -> io::Result<()> {
    write!(sink, "{prefix}{err}\n")
}

/// Renders a synchronous command's outcome per the client's verbosity: a
/// human-readable line for a verbose client's error, a signed decimal line
/// otherwise.
pub(crate) fn emit_outcome<W: Write>(
    mut sink: W,
    verbose: bool,
    result: Result<i32, &CoreError>,
) -> io::Result<()> {
    match result {
        Ok(value) => write_status_line(sink, value),
        Err(err) if verbose => write_error_line(&mut sink, GENERIC_ERROR_PREFIX, err),
        Err(err) => write_status_line(sink, err.errno_code()),
    }
}
