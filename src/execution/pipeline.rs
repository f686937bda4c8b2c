//! The worker body: locate, extract, reconcile, combine, write.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::ingestion::{
    extract_sheet, locate_candidates, Extraction, FileContext, FileOutcome, Severity,
    ACCEPTED_EXTENSIONS,
};
use crate::output::write_combined_xlsx;
use crate::processing::{combine, tag_with_source};
use crate::types::{free_column_name, CandidateFile, SheetTable};

use super::cancel::CancellationToken;
use super::metrics::RunMetrics;
use super::observer::{percent_of, LogEntry, ProgressEvent, RunEvent, RunObserver, RunOutcome};

/// Run one combine pass synchronously on the calling thread.
///
/// Every event goes to `observer` in production order, ending with exactly one
/// [`RunEvent::Finished`]. Per-file failures become log entries; only scan and write
/// failures end the run in [`RunOutcome::Error`]. `cancel` is checked before each file and
/// once more before writing.
///
/// The caller is expected to have validated `config`.
pub fn run_combine(
    config: &RunConfig,
    cancel: &CancellationToken,
    observer: &dyn RunObserver,
    metrics: &RunMetrics,
) -> RunOutcome {
    let mut emit = Emitter::new(observer, metrics);
    metrics.begin_run();

    emit.log(LogEntry::info(format!(
        "Scanning {} ({})",
        config.directory.display(),
        if config.recursive { "including subfolders" } else { "top level only" }
    )));
    emit.progress(0, "scanning");

    let discovery = match locate_candidates(&config.directory, config.recursive) {
        Ok(d) => d,
        Err(e) => {
            let message = format!("could not scan {}: {e}", config.directory.display());
            emit.log(LogEntry::error(message.clone()));
            return emit.finish(RunOutcome::Error { message });
        }
    };
    for warning in &discovery.warnings {
        emit.log(LogEntry::warning(format!("Skipped during scan: {warning}")));
    }

    let output = canonical_target(&config.output_path);
    let files: Vec<CandidateFile> = discovery
        .files
        .into_iter()
        .filter(|f| {
            let is_output = output
                .as_deref()
                .is_some_and(|out| fs::canonicalize(&f.path).is_ok_and(|p| p == out));
            if is_output {
                emit.log(LogEntry::info(format!(
                    "Ignoring {}: it is the output file",
                    f.file_name
                )));
            }
            !is_output
        })
        .collect();

    if files.is_empty() {
        emit.log(LogEntry::info(format!(
            "No spreadsheet files ({}) found in {}",
            ACCEPTED_EXTENSIONS.join(", "),
            config.directory.display()
        )));
        return emit.finish(RunOutcome::NoFiles);
    }

    let total = files.len();
    metrics.set_files_total(total);
    emit.log(LogEntry::info(format!(
        "Found {total} file(s); reading sheet '{}'",
        config.sheet_name
    )));

    let mut retained: Vec<(SheetTable, &str)> = Vec::new();
    let mut empty_sheets: Vec<String> = Vec::new();
    for (index, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            emit.log(LogEntry::warning(format!(
                "Cancelled after {index} of {total} file(s); no output written"
            )));
            return emit.finish(RunOutcome::Cancelled {
                processed: index,
                total,
            });
        }

        let ctx = FileContext { index, total, file };
        let outcome = match extract_sheet(&file.path, &config.sheet_name) {
            Ok(Extraction::Table(table)) => {
                metrics.on_retained(table.row_count());
                let outcome = FileOutcome::Retained {
                    rows: table.row_count(),
                    columns: table.column_count() + usize::from(config.add_source_column),
                };
                retained.push((table, file.file_name.as_str()));
                outcome
            }
            Ok(Extraction::SheetNotFound { available }) => {
                metrics.on_skipped();
                FileOutcome::SheetNotFound {
                    sheet: config.sheet_name.clone(),
                    available,
                }
            }
            Ok(Extraction::Empty) => {
                metrics.on_empty();
                empty_sheets.push(file.file_name.clone());
                FileOutcome::Empty
            }
            Err(e) => {
                metrics.on_failed();
                FileOutcome::from_error(&e)
            }
        };

        // Empty sheets are reported once, in aggregate, after the loop.
        if outcome == FileOutcome::Empty {
            tracing::debug!("{}", outcome.log_message(&ctx));
        } else {
            emit.log(LogEntry::new(outcome.severity(), outcome.log_message(&ctx)));
        }
        emit.progress(
            percent_of(index + 1, total),
            format!("{}: {}", file.file_name, outcome.status()),
        );
    }

    if !empty_sheets.is_empty() {
        emit.log(LogEntry::warning(format!(
            "Sheets without data rows ({}): {}",
            empty_sheets.len(),
            empty_sheets.join(", ")
        )));
    }

    let summary = metrics.snapshot();
    emit.log(LogEntry::info(format!(
        "Summary: {} combined, {} skipped (sheet not found), {} unreadable, {} empty",
        summary.files_retained, summary.files_skipped, summary.files_failed, summary.files_empty
    )));

    if cancel.is_cancelled() {
        emit.log(LogEntry::warning("Cancelled before writing; no output written"));
        return emit.finish(RunOutcome::Cancelled {
            processed: total,
            total,
        });
    }

    let tables: Vec<SheetTable> = if config.add_source_column {
        let column = free_column_name(retained.iter().map(|(t, _)| t), &config.source_column_name);
        if column != config.source_column_name {
            emit.log(LogEntry::warning(format!(
                "Some sheets already have a '{}' column; source file names go to '{column}'",
                config.source_column_name
            )));
        }
        retained
            .iter()
            .map(|(table, file_name)| tag_with_source(table, &column, file_name))
            .collect()
    } else {
        retained.into_iter().map(|(table, _)| table).collect()
    };

    let Some(combined) = combine(tables) else {
        emit.log(LogEntry::warning("No data to combine; no output written"));
        return emit.finish_with_summary(|summary| RunOutcome::NoData { summary });
    };

    emit.progress(100, "writing output");
    match write_combined_xlsx(&combined, &config.output_path, &config.output_sheet_name) {
        Ok(()) => {
            emit.log(LogEntry::info(format!(
                "Saved {} row(s) x {} column(s) to {}",
                combined.row_count(),
                combined.column_count(),
                config.output_path.display()
            )));
            let output_path = config.output_path.clone();
            let (rows, columns) = (combined.row_count(), combined.column_count());
            emit.finish_with_summary(|summary| RunOutcome::Completed {
                output_path,
                rows,
                columns,
                summary,
            })
        }
        Err(e) => {
            let message = format!("could not write {}: {e}", config.output_path.display());
            emit.log(LogEntry::error(message.clone()));
            emit.finish(RunOutcome::Error { message })
        }
    }
}

/// Canonical form of a path that may not exist yet (its parent must).
fn canonical_target(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = fs::canonicalize(path) {
        return Some(p);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|p| p.join(name))
}

/// Sends events and keeps progress non-decreasing within a run.
struct Emitter<'a> {
    observer: &'a dyn RunObserver,
    metrics: &'a RunMetrics,
    last_percent: u8,
}

impl<'a> Emitter<'a> {
    fn new(observer: &'a dyn RunObserver, metrics: &'a RunMetrics) -> Self {
        Self {
            observer,
            metrics,
            last_percent: 0,
        }
    }

    fn progress(&mut self, percent: u8, status: impl Into<String>) {
        let percent = percent.clamp(self.last_percent, 100);
        self.last_percent = percent;
        self.observer.on_event(&RunEvent::Progress(ProgressEvent {
            percent,
            status: status.into(),
        }));
    }

    fn log(&self, entry: LogEntry) {
        match entry.severity {
            Severity::Info => tracing::info!("{}", entry.message),
            Severity::Warning => tracing::warn!("{}", entry.message),
            Severity::Error | Severity::Critical => tracing::error!("{}", entry.message),
        }
        self.observer.on_event(&RunEvent::Log(entry));
    }

    fn finish_with_summary<F>(&mut self, build: F) -> RunOutcome
    where
        F: FnOnce(super::metrics::RunMetricsSnapshot) -> RunOutcome,
    {
        self.metrics.end_run();
        let outcome = build(self.metrics.snapshot());
        self.deliver(outcome)
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.metrics.end_run();
        self.deliver(outcome)
    }

    fn deliver(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.progress(outcome.final_percent(), outcome.to_string());
        self.observer.on_event(&RunEvent::Finished(outcome.clone()));
        outcome
    }
}
