// src/table/mod.rs
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;

pub mod delimited;
pub mod merge;
pub mod unify;
pub mod xlsx;

pub use merge::{fresh_base, merge, FIXED_COLUMNS};
pub use unify::{unify, TAG_COLUMN};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no header record")]
    NoHeader,
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("column sets differ: {left:?} vs {right:?}")]
    SchemaMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },
    #[error("spreadsheet read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),
    #[error("spreadsheet write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("{0}")]
    Invalid(String),
}

/// A single cell. `Empty` is the missing-value marker.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Infer a value from a raw text field.
    ///
    /// Numbers keep their textual form when a leading zero is significant
    /// (e.g. `"0042"`), so identifiers and phone numbers survive the round trip.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        if looks_numeric(trimmed) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return Value::Number(n);
                }
            }
        }
        Value::Text(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

fn looks_numeric(s: &str) -> bool {
    let digits = s.trim_start_matches(['-', '+']);
    let Some(first) = digits.chars().next() else {
        return false;
    };
    if !(first.is_ascii_digit() || first == '.') {
        return false;
    }
    // "0123" is an identifier, "0.5" and "0" are numbers
    !(first == '0' && digits.len() > 1 && !digits[1..].starts_with('.'))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Rows × named columns. Column names are unique; every row holds exactly
/// one value per column, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given columns.
    pub fn with_columns<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(TableError::DuplicateColumn(c.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a table from columns and rows, checking every row's width.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::with_columns(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RaggedRow {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.position(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.position(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append the rows of `other` below ours. Both tables must carry the same
    /// column set; column order may differ and values are aligned by name.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        let same_set = self.columns.len() == other.columns.len()
            && other.columns.iter().all(|c| self.has_column(c));
        if !same_set {
            return Err(TableError::SchemaMismatch {
                left: self.columns.clone(),
                right: other.columns,
            });
        }

        if self.columns == other.columns {
            self.rows.extend(other.rows);
            return Ok(());
        }

        let mapping: Vec<usize> = self
            .columns
            .iter()
            .filter_map(|c| other.position(c))
            .collect();
        self.rows.extend(other.rows.into_iter().map(|mut row| {
            mapping
                .iter()
                .map(|&i| std::mem::take(&mut row[i]))
                .collect::<Vec<_>>()
        }));
        Ok(())
    }

    /// Reindex onto `columns`: present columns are copied, absent ones are
    /// filled with `Value::Empty`, and anything not listed is dropped.
    /// Repeated names in `columns` are kept once.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> Table {
        let mut seen = HashSet::with_capacity(columns.len());
        let target: Vec<String> = columns
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| seen.insert(*c))
            .map(str::to_string)
            .collect();
        let sources: Vec<Option<usize>> = target.iter().map(|c| self.position(c)).collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .map(|src| src.map(|i| row[i].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();

        Table {
            columns: target,
            rows,
        }
    }

    /// Stack tables in order. The result carries the union of their columns
    /// in first-seen order; rows keep their original order.
    pub fn concat<I>(tables: I) -> Table
    where
        I: IntoIterator<Item = Table>,
    {
        let tables: Vec<Table> = tables.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        for t in &tables {
            for c in &t.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut out = Table {
            columns,
            rows: Vec::with_capacity(tables.iter().map(Table::len).sum()),
        };
        for t in tables {
            let aligned = t.project(&out.columns);
            out.rows.extend(aligned.rows);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(cols: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::from_rows(cols.iter().copied(), rows).unwrap()
    }

    #[test]
    fn test_infer_values() {
        assert_eq!(Value::infer(""), Value::Empty);
        assert_eq!(Value::infer("  "), Value::Empty);
        assert_eq!(Value::infer("12.5"), Value::Number(12.5));
        assert_eq!(Value::infer("-3"), Value::Number(-3.0));
        assert_eq!(Value::infer("0"), Value::Number(0.0));
        assert_eq!(Value::infer("0.25"), Value::Number(0.25));
        assert_eq!(Value::infer("0042"), Value::Text("0042".into()));
        assert_eq!(Value::infer("inf"), Value::Text("inf".into()));
        assert_eq!(Value::infer("NaN"), Value::Text("NaN".into()));
        assert_eq!(Value::infer("1.234,56"), Value::Text("1.234,56".into()));
        assert_eq!(Value::infer("Loja Centro"), Value::Text("Loja Centro".into()));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Table::with_columns(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(c) if c == "A"));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::with_columns(["A", "B"]).unwrap();
        let err = table.push_row(vec![Value::from(1.0)]).unwrap_err();
        assert!(matches!(
            err,
            TableError::RaggedRow {
                found: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_project_reorders_fills_and_drops() {
        let table = t(
            &["A", "B", "C"],
            vec![vec!["a1".into(), "b1".into(), "c1".into()]],
        );
        let p = table.project(&["C", "X", "A"]);
        assert_eq!(p.columns(), ["C", "X", "A"]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get(0, "C"), Some(&Value::from("c1")));
        assert_eq!(p.get(0, "X"), Some(&Value::Empty));
        assert_eq!(p.get(0, "A"), Some(&Value::from("a1")));
        assert!(!p.has_column("B"));
    }

    #[test]
    fn test_project_is_idempotent_on_matching_schema() {
        let table = t(
            &["A", "B"],
            vec![
                vec!["a1".into(), Value::Empty],
                vec!["a2".into(), 3.0.into()],
            ],
        );
        assert_eq!(table.project(&["A", "B"]), table);
    }

    #[test]
    fn test_append_aligns_by_name() {
        let mut left = t(&["A", "B"], vec![vec!["a1".into(), "b1".into()]]);
        let right = t(&["B", "A"], vec![vec!["b2".into(), "a2".into()]]);
        left.append(right).unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(left.get(1, "A"), Some(&Value::from("a2")));
        assert_eq!(left.get(1, "B"), Some(&Value::from("b2")));
    }

    #[test]
    fn test_append_rejects_different_column_sets() {
        let mut left = t(&["A"], vec![]);
        let right = t(&["B"], vec![]);
        assert!(matches!(
            left.append(right),
            Err(TableError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_preserves_order_and_counts() {
        let first = t(&["A"], vec![vec!["1".into()], vec!["2".into()]]);
        let second = t(&["B", "A"], vec![vec!["x".into(), "3".into()]]);
        let all = Table::concat(vec![first, second]);

        assert_eq!(all.columns(), ["A", "B"]);
        assert_eq!(all.len(), 3);
        let a: Vec<String> = all.column("A").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(a, ["1", "2", "3"]);
        assert_eq!(all.get(0, "B"), Some(&Value::Empty));
        assert_eq!(all.get(2, "B"), Some(&Value::from("x")));
    }

    #[test]
    fn test_concat_of_nothing_is_empty() {
        let all = Table::concat(Vec::new());
        assert!(all.columns().is_empty());
        assert!(all.is_empty());
    }
}
