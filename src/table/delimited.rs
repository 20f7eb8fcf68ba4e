// src/table/delimited.rs
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

use super::{Table, TableError, Value};

const UTF8_BOM: char = '\u{feff}';

/// Parse a comma-separated export. The first record is the header; every
/// following record must have the same number of fields.
pub fn parse_csv(data: &[u8]) -> Result<Table, TableError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .flexible(false)
        .from_reader(Cursor::new(data));

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches(UTF8_BOM).to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    if headers.is_empty() {
        return Err(TableError::NoHeader);
    }

    let mut table = Table::with_columns(headers)?;
    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(Value::infer).collect())?;
    }

    debug!(
        columns = table.columns().len(),
        rows = table.len(),
        "parsed csv export"
    );
    Ok(table)
}
