use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::error::CombineResult;
use crate::types::{SheetTable, Value};

/// What one workbook yielded for the target sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The sheet was read and has at least one data row.
    Table(SheetTable),
    /// The workbook has no sheet with the requested name.
    SheetNotFound {
        /// Sheet names present in the workbook, in workbook order.
        available: Vec<String>,
    },
    /// The sheet exists but has no data rows below its header.
    Empty,
}

/// Read `sheet_name` from the workbook at `path`.
///
/// Behavior:
/// - Sheet names are listed first; a missing sheet is reported, not treated as a failure
/// - Detects the first non-empty row as the header row
/// - Empty header cells become `Unnamed: <index>`; repeated names get `.1`, `.2`, ... suffixes
/// - Rows where every cell is empty are dropped
///
/// Errors are returned only when the workbook or sheet cannot be read at all.
pub fn extract_sheet(path: impl AsRef<Path>, sheet_name: &str) -> CombineResult<Extraction> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let available = workbook.sheet_names().to_vec();
    if !available.iter().any(|s| s == sheet_name) {
        tracing::debug!(path = %path.display(), sheet = sheet_name, ?available, "sheet not found");
        return Ok(Extraction::SheetNotFound { available });
    }

    let range = workbook.worksheet_range(sheet_name)?;
    Ok(match table_from_range(&range) {
        Some(table) if !table.is_empty() => Extraction::Table(table),
        _ => Extraction::Empty,
    })
}

/// Build a table from a sheet range using its first non-empty row as headers.
///
/// Returns `None` when the range has no non-empty row at all.
pub(crate) fn table_from_range(range: &Range<Data>) -> Option<SheetTable> {
    let mut rows_iter = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let header_row = rows_iter.next()?;
    let columns = normalize_headers(header_row.iter().map(cell_to_header_string));
    let width = columns.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for row in rows_iter {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut out_row: Vec<Value> = Vec::with_capacity(width);
        for idx in 0..width {
            out_row.push(convert_cell(row.get(idx).unwrap_or(&Data::Empty)));
        }
        rows.push(out_row);
    }

    Some(SheetTable::new(columns, rows))
}

/// Fill blank header names and de-duplicate repeated ones.
fn normalize_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let raw: Vec<String> = raw
        .enumerate()
        .map(|(idx, name)| {
            if name.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            }
        })
        .collect();

    let mut seen: HashSet<String> = raw.iter().cloned().collect();
    let mut used: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        if used.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let mut n = 1usize;
        let renamed = loop {
            let candidate = format!("{name}.{n}");
            if !seen.contains(&candidate) && !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        seen.insert(renamed.clone());
        used.insert(renamed.clone());
        out.push(renamed);
    }
    out
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
        Data::Empty => String::new(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => Value::Utf8(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        normalize_headers(names.iter().map(|s| s.to_string()))
    }

    #[test]
    fn blank_headers_get_positional_names() {
        assert_eq!(headers(&["a", "", " "]), vec!["a", "Unnamed: 1", "Unnamed: 2"]);
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        assert_eq!(headers(&["a", "a", "b", "a"]), vec!["a", "a.1", "b", "a.2"]);
    }

    #[test]
    fn suffix_skips_names_already_taken() {
        assert_eq!(headers(&["a", "a", "a.1"]), vec!["a", "a.2", "a.1"]);
    }

    #[test]
    fn table_from_range_skips_leading_and_blank_rows() {
        let mut range: Range<Data> = Range::new((0, 0), (4, 1));
        range.set_value((1, 0), Data::String("id".to_string()));
        range.set_value((1, 1), Data::String("name".to_string()));
        range.set_value((2, 0), Data::Float(1.0));
        range.set_value((2, 1), Data::String("Ada".to_string()));
        range.set_value((4, 0), Data::Int(2));

        let t = table_from_range(&range).unwrap();
        assert_eq!(t.columns, vec!["id", "name"]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows[0], vec![Value::Float64(1.0), Value::Utf8("Ada".to_string())]);
        assert_eq!(t.rows[1], vec![Value::Int64(2), Value::Null]);
    }

    #[test]
    fn header_only_range_has_no_rows() {
        let mut range: Range<Data> = Range::new((0, 0), (0, 1));
        range.set_value((0, 0), Data::String("a".to_string()));
        range.set_value((0, 1), Data::String("b".to_string()));

        let t = table_from_range(&range).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.column_count(), 2);
    }

    #[test]
    fn blank_range_has_no_table() {
        let range: Range<Data> = Range::empty();
        assert!(table_from_range(&range).is_none());
    }
}
