//! In-memory table transformations between extraction and writing.
//!
//! - [`reconcile()`]: ordered schema union plus reindexing with [`crate::types::Value::Missing`]
//! - [`combine()`]: reconciliation followed by concatenation into a [`crate::types::CombinedTable`]
//! - [`tag_with_source()`]: prepend the source file name column
//!
//! ## Example
//!
//! ```rust
//! use sheet_stacker::processing::combine;
//! use sheet_stacker::types::{SheetTable, Value};
//!
//! let a = SheetTable::new(
//!     vec!["A".to_string(), "B".to_string()],
//!     vec![vec![Value::Int64(1), Value::Int64(2)]],
//! );
//! let b = SheetTable::new(
//!     vec!["B".to_string(), "C".to_string()],
//!     vec![vec![Value::Int64(3), Value::Int64(4)]],
//! );
//!
//! let out = combine(vec![a, b]).unwrap();
//! assert_eq!(out.columns, vec!["A", "B", "C"]);
//! assert_eq!(out.rows[1][0], Value::Missing);
//! ```

pub mod combine;
pub mod reconcile;

pub use combine::{combine, tag_with_source};
pub use reconcile::{reconcile, union_columns};
