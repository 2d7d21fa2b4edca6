//! In-memory [`Converter`] for tests.
//!
//! [`RecordingConverter`] records every call, can fail selected files, can be
//! held behind a gate, and tracks how many conversions overlap so tests can
//! assert the worker pool's concurrency bound without `cjpeg` installed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchjpg_core::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::converter::Converter;

#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// Recording fake converter.
#[derive(Clone, Default)]
pub struct RecordingConverter {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    fail_names: Arc<Vec<String>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    panic_on: Option<String>,
    gauge: Arc<Gauge>,
}

impl RecordingConverter {
    /// A converter that succeeds instantly and writes a small destination file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every source whose file name equals `name`.
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        let mut names = (*self.fail_names).clone();
        names.push(name.into());
        self.fail_names = Arc::new(names);
        self
    }

    /// Sleep this long inside every conversion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block every conversion until a permit is available on `gate`.
    /// Permits are consumed, so `gate.add_permits(n)` releases `n` calls.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Panic when converting a source with this file name.
    pub fn panic_on(mut self, name: impl Into<String>) -> Self {
        self.panic_on = Some(name.into());
        self
    }

    /// Every source passed to `convert`, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of conversions observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

struct Running<'a>(&'a Gauge);

impl<'a> Running<'a> {
    fn enter(gauge: &'a Gauge) -> Self {
        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.peak.fetch_max(now, Ordering::SeqCst);
        Self(gauge)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Converter for RecordingConverter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<()> {
        let _running = Running::enter(&self.gauge);
        self.calls.lock().push(source.to_path_buf());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| Error::conversion(source, "gate closed"))?;
            permit.forget();
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let name = Self::file_name(source);
        if self.panic_on.as_deref() == Some(name.as_str()) {
            panic!("recording converter told to panic on {name}");
        }
        if self.fail_names.iter().any(|n| *n == name) {
            return Err(Error::conversion(source, "simulated encoder failure"));
        }

        tokio::fs::write(destination, b"jpeg").await?;
        Ok(())
    }
}
