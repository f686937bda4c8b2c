//! Source tagging and concatenation into a [`CombinedTable`].

use crate::types::{CombinedTable, SheetTable, Value};

use super::reconcile::reconcile;

/// Prepend a column named `column` holding `file_name` on every row.
pub fn tag_with_source(table: &SheetTable, column: &str, file_name: &str) -> SheetTable {
    table.with_leading_column(column, Value::Utf8(file_name.to_string()))
}

/// Reconcile `tables` and concatenate them in order.
///
/// Returns `None` when there is nothing to combine. Rows keep file order, then original row
/// order; nothing is sorted or de-duplicated.
pub fn combine(tables: Vec<SheetTable>) -> Option<CombinedTable> {
    if tables.is_empty() {
        return None;
    }

    let (columns, reconciled) = reconcile(&tables);
    drop(tables);

    let total_rows = reconciled.iter().map(|t| t.row_count()).sum();
    let source_tables = reconciled.len();
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(total_rows);
    for table in reconciled {
        rows.extend(table.rows);
    }

    Some(CombinedTable {
        columns,
        rows,
        source_tables,
    })
}
