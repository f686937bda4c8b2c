use std::error::Error as StdError;
use std::fmt;

use crate::error::CombineError;
use crate::types::CandidateFile;

/// Severity classification for log entries and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (file skipped, nothing lost).
    Warning,
    /// Error-level event (a file or the run failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Classify an error for reporting.
pub fn severity_for_error(e: &CombineError) -> Severity {
    match e {
        CombineError::Io(_) | CombineError::Walk(_) => Severity::Critical,
        CombineError::Excel(err) => {
            // calamine wraps I/O failures without a dedicated variant we can match on.
            if error_chain_contains_io(err) {
                Severity::Critical
            } else {
                Severity::Error
            }
        }
        CombineError::Xlsx(err) => {
            if error_chain_contains_io(err) {
                Severity::Critical
            } else {
                Severity::Error
            }
        }
        CombineError::Json(_)
        | CombineError::InvalidConfig { .. }
        | CombineError::RunInProgress
        | CombineError::OutputTooLarge { .. } => Severity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// Position of a file within a run.
#[derive(Debug, Clone)]
pub struct FileContext<'a> {
    /// Zero-based position in locator order.
    pub index: usize,
    /// Number of candidates in the run.
    pub total: usize,
    pub file: &'a CandidateFile,
}

/// How one candidate file ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Rows were retained for combination.
    Retained { rows: usize, columns: usize },
    /// The workbook has no sheet with the target name.
    SheetNotFound { sheet: String, available: Vec<String> },
    /// The sheet has no data rows.
    Empty,
    /// The workbook could not be opened or read.
    Failed { severity: Severity, cause: String },
}

impl FileOutcome {
    pub fn from_error(e: &CombineError) -> Self {
        Self::Failed {
            severity: severity_for_error(e),
            cause: e.to_string(),
        }
    }

    /// Short status shown next to the progress bar.
    pub fn status(&self) -> &'static str {
        match self {
            FileOutcome::Retained { .. } => "read",
            FileOutcome::SheetNotFound { .. } => "skipped: sheet not found",
            FileOutcome::Empty => "empty sheet",
            FileOutcome::Failed { .. } => "error: could not read",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FileOutcome::Retained { .. } => Severity::Info,
            FileOutcome::SheetNotFound { .. } | FileOutcome::Empty => Severity::Warning,
            FileOutcome::Failed { severity, .. } => *severity,
        }
    }

    /// Human-readable log line for this outcome.
    pub fn log_message(&self, ctx: &FileContext<'_>) -> String {
        let name = &ctx.file.file_name;
        let pos = ctx.index + 1;
        let total = ctx.total;
        match self {
            FileOutcome::Retained { rows, columns } => {
                format!("[{pos}/{total}] {name}: read {rows} row(s), {columns} column(s)")
            }
            FileOutcome::SheetNotFound { sheet, available } => format!(
                "[{pos}/{total}] {name}: skipped, sheet '{sheet}' not found (sheets: {})",
                available.join(", ")
            ),
            FileOutcome::Empty => format!("[{pos}/{total}] {name}: sheet has no data rows"),
            FileOutcome::Failed { cause, .. } => {
                format!("[{pos}/{total}] {name}: error, could not read: {cause}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_critical() {
        let e = CombineError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"));
        assert_eq!(severity_for_error(&e), Severity::Critical);
    }

    #[test]
    fn config_errors_are_plain_errors() {
        let e = CombineError::invalid_config("bad");
        assert_eq!(severity_for_error(&e), Severity::Error);
    }

    #[test]
    fn outcome_messages_name_the_file_and_position() {
        let file = CandidateFile::new("/in/b.xlsx");
        let ctx = FileContext {
            index: 1,
            total: 3,
            file: &file,
        };
        let outcome = FileOutcome::SheetNotFound {
            sheet: "Plan1".to_string(),
            available: vec!["Other".to_string()],
        };
        assert_eq!(
            outcome.log_message(&ctx),
            "[2/3] b.xlsx: skipped, sheet 'Plan1' not found (sheets: Other)"
        );
        assert_eq!(outcome.severity(), Severity::Warning);
        assert_eq!(outcome.status(), "skipped: sheet not found");
    }

    #[test]
    fn failed_outcome_keeps_cause() {
        let e = CombineError::invalid_config("broken");
        let outcome = FileOutcome::from_error(&e);
        assert_eq!(outcome.status(), "error: could not read");
        match outcome {
            FileOutcome::Failed { cause, .. } => assert!(cause.contains("broken")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
