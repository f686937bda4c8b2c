//! `.xlsx` output for a [`CombinedTable`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};

use crate::error::{CombineError, CombineResult};
use crate::types::{CombinedTable, Value};

/// Rows per worksheet, header included.
pub const MAX_ROWS: usize = 1_048_576;
/// Columns per worksheet.
pub const MAX_COLUMNS: usize = 16_384;

const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Write `table` to `path` as a single-sheet workbook.
///
/// The header row holds the column names; no index column is written. Blank cells
/// ([`Value::Null`] and [`Value::Missing`]) are left empty. Parent directories are created.
///
/// The workbook is saved to a sibling temporary file first and renamed over `path` only after
/// the save succeeded, so a failed write never leaves a truncated file at `path`.
pub fn write_combined_xlsx(
    table: &CombinedTable,
    path: impl AsRef<Path>,
    sheet_name: &str,
) -> CombineResult<()> {
    let path = path.as_ref();
    if table.row_count() + 1 > MAX_ROWS || table.column_count() > MAX_COLUMNS {
        return Err(CombineError::OutputTooLarge {
            rows: table.row_count(),
            columns: table.column_count(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;
    fill_worksheet(worksheet, table)?;

    let tmp = temp_sibling(path);
    if let Err(e) = workbook.save(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::info!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "combined workbook written"
    );
    Ok(())
}

fn fill_worksheet(ws: &mut Worksheet, table: &CombinedTable) -> CombineResult<()> {
    let header = Format::new().set_bold();
    let date_time = Format::new().set_num_format(DATE_TIME_FORMAT);

    // Bounds were checked against MAX_ROWS / MAX_COLUMNS, so the casts below cannot truncate.
    for (c, name) in table.columns.iter().enumerate() {
        ws.write_string_with_format(0, c as ColNum, name, &header)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as RowNum;
        for (c, value) in row.iter().enumerate() {
            let c = c as ColNum;
            match value {
                Value::Null | Value::Missing => {}
                Value::Int64(v) => {
                    ws.write_number(r, c, *v as f64)?;
                }
                Value::Float64(v) if v.is_finite() => {
                    ws.write_number(r, c, *v)?;
                }
                Value::Float64(_) => {}
                Value::Bool(v) => {
                    ws.write_boolean(r, c, *v)?;
                }
                Value::Utf8(s) => {
                    ws.write_string(r, c, s)?;
                }
                Value::DateTime(v) => {
                    ws.write_number_with_format(r, c, *v, &date_time)?;
                }
            }
        }
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "combined.xlsx".to_string());
    path.with_file_name(format!(".{name}.{}.{nanos}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};

    fn tmp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("sheet-stacker-writer-{nanos}"))
            .join("nested")
            .join(format!("{name}.xlsx"))
    }

    fn sample() -> CombinedTable {
        CombinedTable {
            columns: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            rows: vec![
                vec![Value::Int64(1), Value::Utf8("x".to_string()), Value::Missing],
                vec![Value::Missing, Value::Bool(true), Value::Float64(2.5)],
            ],
            source_tables: 2,
        }
    }

    #[test]
    fn writes_header_and_rows_creating_parents() {
        let path = tmp_path("out");
        write_combined_xlsx(&sample(), &path, "Sheet1").unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names().to_vec(), vec!["Sheet1".to_string()]);
        let range = wb.worksheet_range("Sheet1").unwrap();
        assert_eq!(range.get_size(), (3, 3));
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("A".to_string())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
        assert_eq!(range.get_value((1, 2)), Some(&Data::Empty));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Bool(true)));
        assert_eq!(range.get_value((2, 2)), Some(&Data::Float(2.5)));

        let dir = path.parent().unwrap().to_path_buf();
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn oversized_table_is_rejected_before_touching_disk() {
        let path = tmp_path("too-wide");
        let table = CombinedTable {
            columns: (0..MAX_COLUMNS + 1).map(|i| format!("c{i}")).collect(),
            rows: Vec::new(),
            source_tables: 1,
        };
        let err = write_combined_xlsx(&table, &path, "Sheet1").unwrap_err();
        assert!(matches!(err, CombineError::OutputTooLarge { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn temp_sibling_stays_in_target_directory() {
        let tmp = temp_sibling(Path::new("/out/dir/result.xlsx"));
        assert_eq!(tmp.parent(), Some(Path::new("/out/dir")));
        assert!(tmp.to_string_lossy().ends_with(".tmp"));
    }
}
