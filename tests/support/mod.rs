//! In-process mock device and client plumbing shared by the integration
//! tests. Mirrors the shape of the teacher crate's `io-engine-tests` helper
//! crate: plain functions and a fake handle, no mocking framework.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use iiod_core::{ClientContext, Device, DeviceContext, DeviceSelector};

/// A fake IIO device. Fills reads with a little-endian counter so tests can
/// assert on exact byte sequences instead of just lengths, and can be
/// scripted to return specific sample counts or error codes per call.
pub struct MockDevice {
    id: u32,
    name: String,
    sample_size: usize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    counter: Mutex<u32>,
    /// Queue of per-call outcomes: `Ok(n)` delivers `n` samples, `Err(code)`
    /// returns `code` (already negative) from `read_raw`. Once drained,
    /// calls fall back to filling the caller's whole buffer.
    script: Mutex<VecDeque<Result<usize, i32>>>,
    attrs: Mutex<HashMap<String, Vec<u8>>>,
    /// Consumed by the first `read_raw` call only, letting a test line up
    /// two subscribers onto the same iteration deterministically instead of
    /// racing real thread scheduling.
    gate: Mutex<Option<std::sync::mpsc::Receiver<()>>>,
}

impl MockDevice {
    pub fn new(id: u32, name: &str, sample_size: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.to_string(),
            sample_size,
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            counter: Mutex::new(0),
            script: Mutex::new(VecDeque::new()),
            attrs: Mutex::new(HashMap::new()),
            gate: Mutex::new(None),
        })
    }

    pub fn with_script(self: &Arc<Self>, outcomes: impl IntoIterator<Item = Result<usize, i32>>) {
        self.script.lock().extend(outcomes);
    }

    /// Arranges for the next `read_raw` call to block until the returned
    /// sender is used (or dropped).
    pub fn gate_next_read(&self) -> std::sync::mpsc::Sender<()> {
        let (tx, rx) = std::sync::mpsc::channel();
        *self.gate.lock() = Some(rx);
        tx
    }

    pub fn set_attr(&self, name: &str, value: &[u8]) {
        self.attrs.lock().insert(name.to_string(), value.to_vec());
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Polls `closes()` until it reaches `at_least` or `timeout` elapses.
    /// Used to deterministically wait out the reader task's asynchronous
    /// teardown before asserting on re-open behavior.
    pub fn wait_closed(&self, at_least: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.closes() >= at_least {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.closes() >= at_least
    }

    fn fill(&self, buf: &mut [u8], samples: usize) {
        let mut counter = self.counter.lock();
        for s in 0..samples {
            let idx = *counter;
            *counter = counter.wrapping_add(1);
            let off = s * self.sample_size;
            let width = self.sample_size.min(4);
            buf[off..off + width].copy_from_slice(&idx.to_le_bytes()[..width]);
            for b in &mut buf[off + width..off + self.sample_size] {
                *b = 0;
            }
        }
    }
}

impl Device for MockDevice {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<(), i32> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), i32> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_raw(&self, buf: &mut [u8]) -> i32 {
        if let Some(rx) = self.gate.lock().take() {
            let _ = rx.recv();
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(samples)) => {
                let bytes = samples * self.sample_size;
                assert!(bytes <= buf.len(), "scripted read larger than requested buffer");
                self.fill(buf, samples);
                bytes as i32
            }
            Some(Err(code)) => code,
            None => {
                let samples = buf.len() / self.sample_size;
                self.fill(buf, samples);
                (samples * self.sample_size) as i32
            }
        }
    }

    fn attr_read(&self, name: &str, buf: &mut [u8]) -> Result<usize, i32> {
        match self.attrs.lock().get(name) {
            Some(value) => {
                let len = value.len();
                buf[..len].copy_from_slice(value);
                Ok(len)
            }
            None => Err(nix::errno::Errno::ENOENT as i32),
        }
    }

    fn attr_write(&self, name: &str, value: &[u8]) -> Result<(), i32> {
        self.attrs.lock().insert(name.to_string(), value.to_vec());
        Ok(())
    }
}

/// Resolves a fixed set of devices by id or name.
pub struct MockContext {
    devices: Vec<Arc<MockDevice>>,
}

impl MockContext {
    pub fn new(devices: Vec<Arc<MockDevice>>) -> Arc<Self> {
        Arc::new(Self { devices })
    }
}

impl DeviceContext for MockContext {
    fn find(&self, selector: DeviceSelector<'_>) -> Option<Arc<dyn Device>> {
        match selector {
            DeviceSelector::Id(id) => self
                .devices
                .iter()
                .find(|d| d.id() == id)
                .map(|d| d.clone() as Arc<dyn Device>),
            DeviceSelector::Name(name) => self
                .devices
                .iter()
                .find(|d| d.name() == name)
                .map(|d| d.clone() as Arc<dyn Device>),
        }
    }
}

/// An in-memory sink shared between a [`ClientContext`] and the test that
/// built it, so the test can inspect exactly what was written.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that fails every write once `poisoned` samples have gone through
/// it, simulating a client that vanished mid-stream.
pub struct FlakySink {
    inner: SharedBuf,
    failed: Arc<AtomicU32>,
}

impl FlakySink {
    pub fn new(inner: SharedBuf) -> (Self, Arc<AtomicU32>) {
        let failed = Arc::new(AtomicU32::new(0));
        (
            Self {
                inner,
                failed: failed.clone(),
            },
            failed,
        )
    }
}

impl Write for FlakySink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        self.failed.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub fn client(devices: Arc<MockContext>, verbose: bool) -> (ClientContext, SharedBuf) {
    let buf = SharedBuf::new();
    let ctx = ClientContext::new(
        Box::new(io::empty()) as Box<dyn Read + Send>,
        Box::new(buf.clone()) as Box<dyn Write + Send>,
        verbose,
        devices as Arc<dyn DeviceContext>,
    );
    (ctx, buf)
}

pub fn client_with_sink(
    devices: Arc<MockContext>,
    verbose: bool,
    sink: Box<dyn Write + Send>,
) -> ClientContext {
    ClientContext::new(
        Box::new(io::empty()) as Box<dyn Read + Send>,
        sink,
        verbose,
        devices as Arc<dyn DeviceContext>,
    )
}
