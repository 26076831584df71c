//! A single device's live state: its handle, the sample size its current
//! subscribers agreed on, and the subscriber list the reader task serves.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::Device;
use crate::subscriber::Subscriber;

pub(crate) struct DeviceEntry {
    pub(crate) device: Arc<dyn Device>,
    /// Bytes per sample, fixed for the entry's lifetime by whichever
    /// `read_dev` call created it.
    pub(crate) sample_size: usize,
    pub(crate) subscribers: Mutex<Vec<Subscriber>>,
}
