//! The three operations the (out of scope) command parser drives:
//! streaming sample reads and per-attribute read/write.

use std::io::Write;
use std::sync::Arc;

use crate::client::ClientContext;
use crate::device::{Device, DeviceSelector};
use crate::error::CoreError;
use crate::framing;
use crate::registry::{Config, DeviceRegistry};
use crate::subscriber::Subscriber;

/// Byte cap on a single attribute's value. Not part of the streaming read
/// path's cap; attribute values are small, bounded, one-shot transfers.
const ATTR_BUF_CAP: usize = 1024;

/// Dispatches the three device-facing commands against a shared registry.
pub struct CommandDispatcher {
    registry: Arc<DeviceRegistry>,
}

impl CommandDispatcher {
    pub fn new(config: Config) -> Self {
        Self {
            registry: DeviceRegistry::new(config),
        }
    }

    /// Reads `nb` samples of `sample_size` bytes from the device resolved
    /// by `selector`, streaming them to `client`'s sink as they arrive.
    /// Returns the number of bytes transferred, or a negative error code.
    pub fn read_dev(
        &self,
        client: &ClientContext,
        selector: DeviceSelector<'_>,
        nb: usize,
        sample_size: usize,
    ) -> i32 {
        let device = match client.devices.find(selector) {
            Some(device) => device,
            None => return self.report_no_device(client, selector),
        };

        if nb == 0 {
            // Completes immediately with status zero, no payload, no
            // registry involvement.
            return 0;
        }

        let (subscriber, done) = Subscriber::new(nb, client.verbose, client.sink_handle());
        if let Err(err) = self.registry.attach(device, sample_size, subscriber) {
            // Rejected before ever linking: no reader iteration or teardown
            // will run for this subscriber, so this is the only chance to
            // tell the client. Once linked, `process_subscriber` and the
            // teardown signal own that framing instead.
            let mut sink = client.lock_sink();
            let _ = framing::emit_outcome(&mut *sink, client.verbose, Err(&err));
            drop(sink);
            let _ = client.flush();
            return err.errno_code();
        }

        let status = done
            .recv()
            .expect("reader task dropped the subscriber without signalling");
        let _ = client.flush();
        match status {
            Ok(()) => (nb * sample_size) as i32,
            Err(err) => err.errno_code(),
        }
    }

    /// Reads `attr` from the device resolved by `selector`.
    pub fn read_dev_attr(&self, client: &ClientContext, selector: DeviceSelector<'_>, attr: &str) -> i32 {
        let device = match client.devices.find(selector) {
            Some(device) => device,
            None => return self.report_no_device(client, selector),
        };

        let mut buf = vec![0u8; ATTR_BUF_CAP];
        let outcome = device
            .attr_read(attr, &mut buf)
            .map_err(|code| CoreError::AttrIoFailed { code });

        let mut sink = client.lock_sink();
        let status = match &outcome {
            Ok(len) => Ok(*len as i32),
            Err(err) => Err(err),
        };
        let _ = framing::emit_outcome(&mut *sink, client.verbose, status);
        if let Ok(len) = &outcome {
            let _ = sink.write_all(&buf[..*len]);
            let _ = sink.write_all(b"\n");
        }
        drop(sink);
        let _ = client.flush();

        match outcome {
            Ok(len) => len as i32,
            Err(err) => err.errno_code(),
        }
    }

    /// Writes `value` to `attr` on the device resolved by `selector`.
    pub fn write_dev_attr(
        &self,
        client: &ClientContext,
        selector: DeviceSelector<'_>,
        attr: &str,
        value: &[u8],
    ) -> i32 {
        let device = match client.devices.find(selector) {
            Some(device) => device,
            None => return self.report_no_device(client, selector),
        };

        let outcome = device
            .attr_write(attr, value)
            .map_err(|code| CoreError::AttrIoFailed { code });

        let mut sink = client.lock_sink();
        let status = match &outcome {
            Ok(()) => Ok(0),
            Err(err) => Err(err),
        };
        let _ = framing::emit_outcome(&mut *sink, client.verbose, status);
        drop(sink);
        let _ = client.flush();

        match outcome {
            Ok(()) => 0,
            Err(err) => err.errno_code(),
        }
    }

    fn report_no_device(&self, client: &ClientContext, selector: DeviceSelector<'_>) -> i32 {
        let err = CoreError::NoDevice {
            device: selector.describe(),
        };
        tracing::debug!(device = %selector.describe(), "no such device");
        let mut sink = client.lock_sink();
        let _ = framing::emit_outcome(&mut *sink, client.verbose, Err(&err));
        err.errno_code()
    }
}
