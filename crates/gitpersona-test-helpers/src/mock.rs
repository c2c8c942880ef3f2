//! [`ConfigBackend`] wrappers that fail on request or record their calls.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gitpersona_apply::{ConfigBackend, MemoryBackend, Scope};
use gitpersona_errors::BackendError;
use parking_lot::Mutex;

/// Value returned for keys whose reads are corrupted.
pub const CORRUPTED_VALUE: &str = "<corrupted>";

#[derive(Debug, Default)]
struct Faults {
    writes: usize,
    fail_at: Option<usize>,
    fail_after: Option<usize>,
    corrupt: Option<String>,
    written: Vec<String>,
    sticky: bool,
    tripped: bool,
}

/// Wraps a [`MemoryBackend`] and injects failures into writes and reads.
///
/// Writes (`set`, `add` and `unset`) are counted from 1. Inspect the real state
/// through [`inner`](Self::inner), which is never affected by corruption.
#[derive(Debug)]
pub struct FaultyBackend {
    inner: MemoryBackend,
    faults: Mutex<Faults>,
}

impl FaultyBackend {
    /// Backend with no faults armed.
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Fail the `n`-th write.
    pub fn fail_write(self, n: usize) -> Self {
        self.faults.lock().fail_at = Some(n);
        self
    }

    /// Fail every write after the first `n`.
    pub fn fail_writes_after(self, n: usize) -> Self {
        self.faults.lock().fail_after = Some(n);
        self
    }

    /// Once a write has failed, fail every later write too, so a rollback
    /// cannot complete.
    pub fn and_fail_rollback(self) -> Self {
        self.faults.lock().sticky = true;
        self
    }

    /// Return [`CORRUPTED_VALUE`] when reading `key` after this backend wrote it.
    pub fn corrupt_reads_of(self, key: &str) -> Self {
        self.faults.lock().corrupt = Some(key.to_string());
        self
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// Writes attempted so far.
    pub fn writes(&self) -> usize {
        self.faults.lock().writes
    }

    fn before_write(&self, operation: &'static str, scope: Scope, key: &str) -> Result<(), BackendError> {
        let mut faults = self.faults.lock();
        faults.writes += 1;
        let n = faults.writes;
        let fail = (faults.sticky && faults.tripped)
            || faults.fail_at == Some(n)
            || faults.fail_after.is_some_and(|after| n > after);
        if fail {
            faults.tripped = true;
            return Err(BackendError::command_failed(
                operation,
                scope.as_str(),
                key,
                Some(4),
                format!("injected failure on write {n}"),
            ));
        }
        faults.written.push(key.to_string());
        Ok(())
    }
}

impl ConfigBackend for FaultyBackend {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        let value = self.inner.get(scope, key)?;
        let faults = self.faults.lock();
        let corrupted = faults.corrupt.as_deref() == Some(key)
            && faults.written.iter().any(|k| k == key);
        Ok(if corrupted {
            Some(CORRUPTED_VALUE.to_string())
        } else {
            value
        })
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        let values = self.inner.get_all(scope, key)?;
        let faults = self.faults.lock();
        let corrupted = faults.corrupt.as_deref() == Some(key)
            && faults.written.iter().any(|k| k == key);
        Ok(if corrupted {
            vec![CORRUPTED_VALUE.to_string()]
        } else {
            values
        })
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        self.before_write("set", scope, key)?;
        self.inner.set(scope, key, value)
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        self.before_write("add", scope, key)?;
        self.inner.add(scope, key, value)
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        self.before_write("unset", scope, key)?;
        self.inner.unset(scope, key)
    }
}

/// One call seen by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    /// Name of the calling thread, or `"unnamed"`
    pub thread: String,
    /// `get`, `get-all`, `set`, `add` or `unset`
    pub operation: &'static str,
    /// Key touched
    pub key: String,
}

/// Wraps a [`MemoryBackend`] and records every call with the name of the
/// thread that made it. Clones share the record.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    inner: MemoryBackend,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    write_delay: Duration,
}

impl RecordingBackend {
    /// Record calls made against `inner`.
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            calls: Arc::default(),
            write_delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` before every write, widening the window in which
    /// unserialized switches would interleave.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Calling threads with consecutive calls from the same thread merged.
    /// Two switches that never overlapped show up as two entries.
    pub fn thread_runs(&self) -> Vec<String> {
        let mut runs: Vec<String> = Vec::new();
        for call in self.calls.lock().iter() {
            if runs.last() != Some(&call.thread) {
                runs.push(call.thread.clone());
            }
        }
        runs
    }

    fn record(&self, operation: &'static str, key: &str) {
        let thread = thread::current().name().unwrap_or("unnamed").to_string();
        self.calls.lock().push(BackendCall {
            thread,
            operation,
            key: key.to_string(),
        });
    }

    fn record_write(&self, operation: &'static str, key: &str) {
        self.record(operation, key);
        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
    }
}

impl ConfigBackend for RecordingBackend {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        self.record("get", key);
        self.inner.get(scope, key)
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        self.record("get-all", key);
        self.inner.get_all(scope, key)
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        self.record_write("set", key);
        self.inner.set(scope, key, value)
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        self.record_write("add", key);
        self.inner.add(scope, key, value)
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        self.record_write("unset", key);
        self.inner.unset(scope, key)
    }
}
