//! Core data model: cell values, per-file tables and the combined table.
//!
//! Tables are value objects. Tagging and reindexing return new tables instead of
//! mutating the input, so a half-processed file never leaves a table in a mixed shape.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The source cell existed but was empty.
    Null,
    /// The source table had no such column at all (filled in by reconciliation).
    Missing,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Spreadsheet date-time as a serial day number (1900 date system).
    DateTime(f64),
}

impl Value {
    /// Returns `true` for both empty cells and the missing-column sentinel.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Null | Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Missing => f.write_str("<missing>"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
            Value::DateTime(v) => write!(f, "{v}"),
        }
    }
}

/// A spreadsheet file eligible for extraction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidateFile {
    /// Full path as produced by the directory walk.
    pub path: PathBuf,
    /// Base name (`report.xlsx`), used for log lines and the source column.
    pub file_name: String,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Tabular data read from one sheet: ordered column names plus row-major values.
///
/// Every row has exactly `columns.len()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl SheetTable {
    /// Create a table from columns and rows.
    ///
    /// # Panics
    ///
    /// Panics if any row length differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        for (idx, row) in rows.iter().enumerate() {
            assert!(
                row.len() == width,
                "row {idx} has {} values but table has {width} columns",
                row.len()
            );
        }
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns a new table with a leading column holding `value` on every row.
    ///
    /// The column is called `name`, or `name.1`, `name.2`, ... if `name` is already taken.
    /// Existing columns are kept as they are.
    pub fn with_leading_column(&self, name: &str, value: Value) -> Self {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(free_column_name(std::iter::once(self), name));
        columns.extend(self.columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = Vec::with_capacity(columns.len());
                out.push(value.clone());
                out.extend(row.iter().cloned());
                out
            })
            .collect();

        Self { columns, rows }
    }

    /// Returns a new table laid out on `columns`, filling absent columns with [`Value::Missing`].
    ///
    /// Columns of `self` that are not listed in `columns` are dropped.
    pub fn reindex(&self, columns: &[String]) -> Self {
        let projection: Vec<Option<usize>> = columns.iter().map(|c| self.index_of(c)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|src| match src {
                        Some(idx) => row[*idx].clone(),
                        None => Value::Missing,
                    })
                    .collect()
            })
            .collect();

        Self {
            columns: columns.to_vec(),
            rows,
        }
    }
}

/// `preferred` if no table has a column by that name, else the first free `preferred.<n>`.
pub fn free_column_name<'a, I>(tables: I, preferred: &str) -> String
where
    I: IntoIterator<Item = &'a SheetTable>,
{
    let taken: HashSet<&str> = tables
        .into_iter()
        .flat_map(|t| t.columns.iter().map(String::as_str))
        .collect();
    if !taken.contains(preferred) {
        return preferred.to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{preferred}.{n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// The single reconciled and concatenated table written to the output file.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedTable {
    /// Union of all input columns, in first-seen order.
    pub columns: Vec<String>,
    /// All rows, in file order then original row order.
    pub rows: Vec<Vec<Value>>,
    /// Number of source tables that contributed rows.
    pub source_tables: usize,
}

impl CombinedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
