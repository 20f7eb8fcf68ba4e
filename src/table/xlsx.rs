// src/table/xlsx.rs
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::{debug, instrument};

use super::{Table, TableError, Value};

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Read the first worksheet of an `.xlsx` file. The first row is the header.
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_table(path: impl AsRef<Path>) -> Result<Table, TableError> {
    let mut workbook: Xlsx<_> = open_workbook(path.as_ref())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableError::Invalid("workbook has no worksheets".into()))??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };

    let mut table = Table::with_columns(header_names(header))?;
    for row in rows {
        table.push_row(row.iter().map(cell_to_value).collect())?;
    }

    debug!(rows = table.len(), "read spreadsheet");
    Ok(table)
}

/// Column names for a header row. Blank cells become `Unnamed: <i>` and
/// repeats get `.1`, `.2`, ... so stray edits to the sheet never stop it
/// loading; the fixed projection drops those columns later.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, cell) in header.iter().enumerate() {
        let base = match cell_to_value(cell) {
            Value::Empty => format!("Unnamed: {}", i),
            other => other.to_string(),
        };
        let mut name = base.clone();
        let mut n = 0;
        while names.contains(&name) {
            n += 1;
            name = format!("{}.{}", base, n);
        }
        names.push(name);
    }
    names
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Value::DateTime(naive),
            None => Value::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
    }
}

/// Write `table` to a single-sheet `.xlsx` file: header row, then one row per
/// record. `Value::Empty` becomes a blank cell.
#[instrument(level = "debug", skip(table, path), fields(path = %path.as_ref().display()))]
pub fn write_table(table: &Table, path: impl AsRef<Path>) -> Result<(), TableError> {
    let mut workbook = Workbook::new();
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let sheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        sheet.write_string(0, col_index(col)?, name)?;
    }

    for (r, row) in table.rows().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| TableError::Invalid(format!("row {} out of range", r + 1)))?;
        for (col, value) in row.iter().enumerate() {
            let c = col_index(col)?;
            match value {
                Value::Empty => {}
                Value::Text(s) => {
                    sheet.write_string(r, c, s)?;
                }
                Value::Number(n) => {
                    sheet.write_number(r, c, *n)?;
                }
                Value::DateTime(dt) => {
                    sheet.write_datetime_with_format(r, c, dt, &datetime_format)?;
                }
            }
        }
    }

    workbook.save(path.as_ref())?;
    debug!(rows = table.len(), "wrote spreadsheet");
    Ok(())
}

fn col_index(col: usize) -> Result<u16, TableError> {
    u16::try_from(col).map_err(|_| TableError::Invalid(format!("column {} out of range", col)))
}
