//! Input side of a run: finding workbooks and reading the target sheet from each.
//!
//! - [`locator`]: directory scan producing sorted [`crate::types::CandidateFile`]s
//! - [`excel`]: sheet extraction into [`crate::types::SheetTable`]s
//! - [`observability`]: per-file outcome classification and severities

pub mod excel;
pub mod locator;
pub mod observability;

pub use excel::{extract_sheet, Extraction};
pub use locator::{is_candidate_name, locate_candidates, Discovery, ACCEPTED_EXTENSIONS, LOCK_FILE_PREFIX};
pub use observability::{severity_for_error, FileContext, FileOutcome, Severity};
