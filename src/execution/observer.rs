use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ingestion::Severity;

use super::metrics::RunMetricsSnapshot;

/// Progress update: percentage plus a short status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 0..=100.
    pub percent: u8,
    pub status: String,
}

/// One human-readable log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Lifecycle of a controller's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Error,
    NoFiles,
    NoData,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Idle | RunState::Running)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The combined workbook was written.
    Completed {
        output_path: PathBuf,
        rows: usize,
        columns: usize,
        summary: RunMetricsSnapshot,
    },
    /// Cancellation was observed; nothing was written.
    Cancelled { processed: usize, total: usize },
    /// The directory held no candidate workbooks.
    NoFiles,
    /// Every candidate was skipped, unreadable or empty; nothing was written.
    NoData { summary: RunMetricsSnapshot },
    /// Writing failed or the worker hit an internal fault.
    Error { message: String },
}

impl RunOutcome {
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed { .. } => RunState::Completed,
            RunOutcome::Cancelled { .. } => RunState::Cancelled,
            RunOutcome::NoFiles => RunState::NoFiles,
            RunOutcome::NoData { .. } => RunState::NoData,
            RunOutcome::Error { .. } => RunState::Error,
        }
    }

    /// Final progress percentage: 100 except for cancelled runs.
    pub fn final_percent(&self) -> u8 {
        match self {
            RunOutcome::Cancelled { processed, total } => percent_of(*processed, *total),
            _ => 100,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed {
                output_path,
                rows,
                columns,
                ..
            } => write!(
                f,
                "completed: {rows} row(s) x {columns} column(s) written to {}",
                output_path.display()
            ),
            RunOutcome::Cancelled { processed, total } => {
                write!(f, "cancelled after {processed} of {total} file(s)")
            }
            RunOutcome::NoFiles => f.write_str("no spreadsheet files found"),
            RunOutcome::NoData { .. } => f.write_str("no data to combine"),
            RunOutcome::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// `floor(done / total * 100)`, or 100 for an empty batch.
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Events emitted by a running pipeline, in production order.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Progress(ProgressEvent),
    Log(LogEntry),
    /// Always the last event of a run.
    Finished(RunOutcome),
}

/// Observer hook for run events.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Forwards events into an mpsc channel. Sends after the receiver is gone are dropped.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: mpsc::Sender<RunEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<RunEvent>) -> Self {
        Self { tx }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl RunObserver for ChannelObserver {
    fn on_event(&self, event: &RunEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn RunObserver>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Arc<dyn RunObserver>) {
        self.observers.push(observer);
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl RunObserver for CompositeObserver {
    fn on_event(&self, event: &RunEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Prints log lines and the final outcome to stderr. Progress events are ignored.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl RunObserver for StdErrObserver {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::Progress(_) => {}
            RunEvent::Log(entry) => eprintln!("[combine]{entry}"),
            RunEvent::Finished(outcome) => eprintln!("[combine][done] {outcome}"),
        }
    }
}

/// Appends log lines and the final outcome to a local file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl RunObserver for FileObserver {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::Progress(_) => {}
            RunEvent::Log(entry) => {
                self.append_line(&format!("{} {} {}", unix_ts(), entry.severity, entry.message))
            }
            RunEvent::Finished(outcome) => {
                self.append_line(&format!("{} finished {}", unix_ts(), outcome))
            }
        }
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_floors_and_handles_empty_batches() {
        assert_eq!(percent_of(0, 3), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 66);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(2, 5), 40);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn cancelled_outcome_reports_partial_percent() {
        let o = RunOutcome::Cancelled {
            processed: 2,
            total: 5,
        };
        assert_eq!(o.final_percent(), 40);
        assert_eq!(o.state(), RunState::Cancelled);
        assert_eq!(RunOutcome::NoFiles.final_percent(), 100);
    }

    #[test]
    fn terminal_states() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::NoData.is_terminal());
    }

    #[test]
    fn composite_forwards_in_order_to_every_channel() {
        let (a, rx_a) = ChannelObserver::channel();
        let (b, rx_b) = ChannelObserver::channel();
        let composite = CompositeObserver::new(vec![Arc::new(a), Arc::new(b)]);

        composite.on_event(&RunEvent::Log(LogEntry::info("one")));
        composite.on_event(&RunEvent::Finished(RunOutcome::NoFiles));

        for rx in [rx_a, rx_b] {
            let got: Vec<RunEvent> = rx.try_iter().collect();
            assert_eq!(
                got,
                vec![
                    RunEvent::Log(LogEntry::info("one")),
                    RunEvent::Finished(RunOutcome::NoFiles)
                ]
            );
        }
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (obs, rx) = ChannelObserver::channel();
        drop(rx);
        obs.on_event(&RunEvent::Log(LogEntry::warning("ignored")));
    }

    #[test]
    fn file_observer_appends_log_lines() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("sheet-stacker-log-{nanos}.log"));
        let obs = FileObserver::new(&path);

        obs.on_event(&RunEvent::Progress(ProgressEvent {
            percent: 10,
            status: "x".to_string(),
        }));
        obs.on_event(&RunEvent::Log(LogEntry::error("bad.xlsx: could not read")));
        obs.on_event(&RunEvent::Finished(RunOutcome::NoFiles));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("error bad.xlsx: could not read"));
        assert!(lines[1].ends_with("finished no spreadsheet files found"));

        let _ = std::fs::remove_file(&path);
    }
}
