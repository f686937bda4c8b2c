//! Output writers for the combined table.

pub mod xlsx;

pub use xlsx::{write_combined_xlsx, MAX_COLUMNS, MAX_ROWS};
