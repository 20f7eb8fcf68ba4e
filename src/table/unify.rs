// src/table/unify.rs
use super::Table;

/// Column every consolidated table carries, even when no input has it.
pub const TAG_COLUMN: &str = "TAG";

/// Union of both column sets plus `TAG`: `a`'s columns in order, then the
/// columns only `b` has, then `TAG` if neither had it.
pub fn unified_columns(a: &Table, b: &Table) -> Vec<String> {
    let mut columns: Vec<String> = a.columns().to_vec();
    for c in b.columns() {
        if !a.has_column(c) {
            columns.push(c.clone());
        }
    }
    if !columns.iter().any(|c| c == TAG_COLUMN) {
        columns.push(TAG_COLUMN.to_string());
    }
    columns
}

/// Reindex both tables onto their unified column set. Every column of either
/// input survives in both outputs, filled with `Value::Empty` where absent.
pub fn unify(a: &Table, b: &Table) -> (Table, Table) {
    let columns = unified_columns(a, b);
    (a.project(&columns), b.project(&columns))
}
