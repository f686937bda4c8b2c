use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Real-time counters for a combine run.
///
/// The worker updates these while it runs; the controller side can snapshot them at any time.
pub struct RunMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    files_total: AtomicU64,
    files_processed: AtomicU64,
    files_retained: AtomicU64,
    files_skipped: AtomicU64,
    files_failed: AtomicU64,
    files_empty: AtomicU64,
    rows_combined: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            files_total: AtomicU64::new(0),
            files_processed: AtomicU64::new(0),
            files_retained: AtomicU64::new(0),
            files_skipped: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            files_empty: AtomicU64::new(0),
            rows_combined: AtomicU64::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut started) = self.started_at.lock() {
            *started = Some(Instant::now());
        }

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.files_total.store(0, Ordering::SeqCst);
        self.files_processed.store(0, Ordering::SeqCst);
        self.files_retained.store(0, Ordering::SeqCst);
        self.files_skipped.store(0, Ordering::SeqCst);
        self.files_failed.store(0, Ordering::SeqCst);
        self.files_empty.store(0, Ordering::SeqCst);
        self.rows_combined.store(0, Ordering::SeqCst);
    }

    /// Record the elapsed time since [`Self::begin_run`].
    pub fn end_run(&self) {
        let elapsed = self
            .started_at
            .lock()
            .ok()
            .and_then(|s| *s)
            .map(|s| s.elapsed())
            .unwrap_or_default();
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn set_files_total(&self, total: usize) {
        self.files_total.store(total as u64, Ordering::SeqCst);
    }

    pub fn on_retained(&self, rows: usize) {
        let _ = self.files_retained.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_combined.fetch_add(rows as u64, Ordering::SeqCst);
        self.on_processed();
    }

    pub fn on_skipped(&self) {
        let _ = self.files_skipped.fetch_add(1, Ordering::SeqCst);
        self.on_processed();
    }

    pub fn on_failed(&self) {
        let _ = self.files_failed.fetch_add(1, Ordering::SeqCst);
        self.on_processed();
    }

    pub fn on_empty(&self) {
        let _ = self.files_empty.fetch_add(1, Ordering::SeqCst);
        self.on_processed();
    }

    fn on_processed(&self) {
        let _ = self.files_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RunMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        RunMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            files_total: self.files_total.load(Ordering::SeqCst),
            files_processed: self.files_processed.load(Ordering::SeqCst),
            files_retained: self.files_retained.load(Ordering::SeqCst),
            files_skipped: self.files_skipped.load(Ordering::SeqCst),
            files_failed: self.files_failed.load(Ordering::SeqCst),
            files_empty: self.files_empty.load(Ordering::SeqCst),
            rows_combined: self.rows_combined.load(Ordering::SeqCst),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RunMetrics").field(&self.snapshot()).finish()
    }
}

/// Immutable snapshot of [`RunMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub files_total: u64,
    pub files_processed: u64,
    pub files_retained: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub files_empty: u64,
    pub rows_combined: u64,
}

impl fmt::Display for RunMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files={}/{}, combined={}, skipped={}, failed={}, empty={}, rows={}, elapsed={:?}",
            self.files_processed,
            self.files_total,
            self.files_retained,
            self.files_skipped,
            self.files_failed,
            self.files_empty,
            self.rows_combined,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RunMetrics;

    #[test]
    fn counters_reset_between_runs() {
        let m = RunMetrics::new();
        m.begin_run();
        m.set_files_total(3);
        m.on_retained(10);
        m.on_skipped();
        m.on_failed();
        m.end_run();

        let snap = m.snapshot();
        assert_eq!(snap.run_id, 1);
        assert_eq!(snap.files_processed, 3);
        assert_eq!(snap.rows_combined, 10);
        assert_eq!(snap.files_failed, 1);

        m.begin_run();
        let snap = m.snapshot();
        assert_eq!(snap.run_id, 2);
        assert_eq!(snap.files_processed, 0);
        assert_eq!(snap.rows_combined, 0);
        assert!(snap.elapsed.is_none());
    }
}
