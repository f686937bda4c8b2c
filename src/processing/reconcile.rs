//! Schema union and reindexing across [`crate::types::SheetTable`]s.

use std::collections::HashSet;

use crate::types::SheetTable;

/// Ordered union of all column names: each name appears once, at the position it was first seen.
pub fn union_columns<'a, I>(tables: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a SheetTable>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for table in tables {
        for col in &table.columns {
            if seen.insert(col.as_str()) {
                out.push(col.clone());
            }
        }
    }
    out
}

/// Reindex every table onto the union of all columns.
///
/// Returns the union and the reindexed tables (same order, same row counts). Columns a table
/// lacked are filled with [`crate::types::Value::Missing`]. Reconciling the output again is a no-op.
pub fn reconcile(tables: &[SheetTable]) -> (Vec<String>, Vec<SheetTable>) {
    let columns = union_columns(tables);
    let reindexed = tables
        .iter()
        .map(|t| {
            if t.columns == columns {
                t.clone()
            } else {
                t.reindex(&columns)
            }
        })
        .collect();
    (columns, reindexed)
}
