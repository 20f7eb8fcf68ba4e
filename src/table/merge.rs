// src/table/merge.rs
use tracing::debug;

use super::unify::{unify, TAG_COLUMN};
use super::{Table, TableError};

/// Columns of the consolidated spreadsheet, in output order.
pub const FIXED_COLUMNS: [&str; 11] = [
    "Loja (ID)",
    "Loja (Nome)",
    "Cliente (ID)",
    "Cliente (Nome)",
    "Cliente (Telefone)",
    "Data da Venda",
    "Valor",
    "Recorrências",
    "Pontos",
    "Atendente",
    TAG_COLUMN,
];

/// Base table for a period with no usable consolidated file yet.
pub fn fresh_base() -> Table {
    Table::from_rows([TAG_COLUMN], Vec::new()).unwrap_or_default()
}

/// Append `incoming` below `existing` and project onto `FIXED_COLUMNS`.
///
/// Pure append: rows are never deduplicated, so a report delivered twice
/// shows up twice.
pub fn merge(existing: Table, incoming: Vec<Table>) -> Result<Table, TableError> {
    if incoming.is_empty() {
        return Ok(existing.project(&FIXED_COLUMNS));
    }

    let combined = Table::concat(incoming);
    let (mut base, combined) = unify(&existing, &combined);
    let added = combined.len();
    base.append(combined)?;

    debug!(
        existing = existing.len(),
        added,
        total = base.len(),
        "merged exports"
    );
    Ok(base.project(&FIXED_COLUMNS))
}
