//! `sheet-stacker` combines one named sheet from every spreadsheet in a directory (optionally
//! its whole subtree) into a single `.xlsx` file.
//!
//! Files are processed one at a time in path order. Each file's sheet is read with its first
//! non-empty row as headers; files without the sheet, unreadable files and empty sheets are
//! logged and skipped without stopping the batch. The column sets of all retained sheets are
//! unioned in first-seen order, every sheet is reindexed onto that union (absent columns hold
//! [`types::Value::Missing`]), and the rows are concatenated and written out.
//!
//! ## Quick example: run synchronously
//!
//! ```no_run
//! use sheet_stacker::config::RunConfig;
//! use sheet_stacker::execution::{run_combine, CancellationToken, RunMetrics, StdErrObserver};
//!
//! # fn main() -> Result<(), sheet_stacker::CombineError> {
//! let config = RunConfig::new("reports", "reports/combined.xlsx")
//!     .with_sheet_name("Plan1")
//!     .with_recursive(true);
//! config.validate()?;
//!
//! let outcome = run_combine(
//!     &config,
//!     &CancellationToken::new(),
//!     &StdErrObserver,
//!     &RunMetrics::new(),
//! );
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```
//!
//! For a responsive front end, use [`execution::CombineController`], which runs the same
//! pipeline on a background thread and hands progress/log events back over a channel.
//!
//! ## Modules
//!
//! - [`config`]: the immutable per-run [`config::RunConfig`]
//! - [`ingestion`]: file discovery and sheet extraction
//! - [`processing`]: schema reconciliation and concatenation
//! - [`output`]: `.xlsx` writer
//! - [`execution`]: pipeline, cancellation, events and the controller
//! - [`types`]: tables and cell values
//! - [`error`]: the crate error type

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod output;
pub mod processing;
pub mod types;

pub use error::{CombineError, CombineResult};
