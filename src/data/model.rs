use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::{MergeError, MergeResult};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a table
// ---------------------------------------------------------------------------

/// Tokens read as null, the `.` of ANNOVAR plus the NA strings pandas
/// recognises by default.
pub const NA_TOKENS: [&str; 19] = [
    ".", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A dynamically-typed cell mirroring the dtypes pandas infers for a TSV column.
///
/// Numbers carry the token they were read from, so a cell is written back
/// exactly as it appeared (`00452` stays `00452`, `1.10` stays `1.10`).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64, String),
    Float(f64, String),
    Null,
}

impl fmt::Display for CellValue {
    /// Renders the value the way it is written to a TSV field; null is an
    /// empty field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text().unwrap_or(""))
    }
}

impl CellValue {
    pub fn int(i: i64) -> Self {
        CellValue::Integer(i, i.to_string())
    }

    pub fn float(v: f64) -> Self {
        CellValue::Float(v, v.to_string())
    }

    /// Guess the type of a raw text field. Empty fields and [`NA_TOKENS`]
    /// are null.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() || NA_TOKENS.contains(&s) {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i, s.to_string());
        }
        if let Ok(f) = s.parse::<f64>() {
            // "inf" and "infinity" parse as floats but are identifiers here
            if f.is_finite() {
                return CellValue::Float(f, s.to_string());
            }
        }
        CellValue::String(s.to_string())
    }

    /// Convert a JSON scalar (as found in a filter specification).
    pub fn from_json(val: &JsonValue) -> Self {
        match val {
            JsonValue::String(s) => CellValue::String(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Integer(i, n.to_string())
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f, n.to_string())
                } else {
                    CellValue::String(n.to_string())
                }
            }
            JsonValue::Bool(b) => CellValue::String(b.to_string()),
            JsonValue::Null => CellValue::Null,
            other => CellValue::String(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell. Text is never coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v, _) => Some(*v),
            CellValue::Integer(i, _) => Some(*i as f64),
            _ => None,
        }
    }

    /// The cell as written in its source. Null has no text.
    pub fn text(&self) -> Option<&str> {
        match self {
            CellValue::String(s) | CellValue::Integer(_, s) | CellValue::Float(_, s) => Some(s),
            CellValue::Null => None,
        }
    }

    /// Normalized text used for join keys, so that `5`, `5.0` and `"5"`
    /// compare equal. Null has no key.
    pub fn key_text(&self) -> Option<String> {
        match self {
            CellValue::Integer(i, _) => Some(i.to_string()),
            CellValue::Float(v, _) => Some(v.to_string()),
            CellValue::String(s) => Some(s.clone()),
            CellValue::Null => None,
        }
    }

    /// Equality with numeric coercion: numbers compare by value, everything
    /// else by key text. Null matches nothing, not even null.
    pub fn matches(&self, other: &CellValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.key_text(), other.key_text()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Record – a borrowed view of one row
// ---------------------------------------------------------------------------

/// One row of a [`RecordSet`] together with the schema it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [CellValue],
}

impl<'a> Record<'a> {
    /// Cell for `column`, or `None` when the schema has no such column.
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.cells[i])
    }

    pub fn cells(&self) -> &'a [CellValue] {
        self.cells
    }
}

// ---------------------------------------------------------------------------
// RecordSet – ordered rows sharing one schema
// ---------------------------------------------------------------------------

/// An in-memory table. Every row holds exactly one cell per schema column,
/// in schema order; missing values are [`CellValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RecordSet {
    /// Build a table from a header and rows, rejecting ragged rows and
    /// repeated column names.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> MergeResult<Self> {
        check_unique(&columns)?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(MergeError::SchemaMismatch {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(RecordSet { columns, rows })
    }

    /// A zero-row table with the given schema.
    pub fn empty(columns: Vec<String>) -> MergeResult<Self> {
        Self::new(columns, Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> MergeResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MergeError::UnknownColumn(name.to_string()))
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    pub fn cell(&self, row: usize, column: &str) -> MergeResult<&CellValue> {
        let idx = self.column_index(column)?;
        let cells = self.rows.get(row).ok_or(MergeError::RowOutOfRange {
            row,
            len: self.rows.len(),
        })?;
        Ok(&cells[idx])
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> MergeResult<Vec<&CellValue>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Rename columns. Pairs whose source column is absent are ignored.
    pub fn rename(mut self, pairs: &[(&str, &str)]) -> MergeResult<Self> {
        for (from, to) in pairs {
            if let Some(i) = self.columns.iter().position(|c| c == from) {
                self.columns[i] = (*to).to_string();
            }
        }
        check_unique(&self.columns)?;
        Ok(self)
    }

    /// Project onto `names`, in the requested order.
    pub fn select(&self, names: &[&str]) -> MergeResult<Self> {
        let idx: Vec<usize> = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<MergeResult<_>>()?;
        let columns = names.iter().map(|n| n.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| idx.iter().map(|&i| r[i].clone()).collect())
            .collect();
        RecordSet::new(columns, rows)
    }

    /// Keep rows for which `keep` returns true, preserving order.
    pub fn retain<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(Record<'_>) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|cells| keep(Record { columns, cells }));
        self
    }

    /// Set `name` to `value` on every row, appending the column if needed.
    pub fn with_constant(self, name: &str, value: CellValue) -> Self {
        self.with_computed(name, |_| value.clone())
    }

    /// Set `name` to a per-row computed value, appending the column if needed.
    /// An existing column is overwritten in place.
    pub fn with_computed<F>(mut self, name: &str, mut compute: F) -> Self
    where
        F: FnMut(Record<'_>) -> CellValue,
    {
        let existing = self.columns.iter().position(|c| c == name);
        let values: Vec<CellValue> = self.records().map(&mut compute).collect();
        match existing {
            Some(i) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[i] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        self
    }

    pub fn drop_column(mut self, name: &str) -> MergeResult<Self> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(self)
    }

    /// Append a row, checking its width against the schema.
    pub fn push(&mut self, row: Vec<CellValue>) -> MergeResult<()> {
        if row.len() != self.columns.len() {
            return Err(MergeError::SchemaMismatch {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }
}

fn check_unique(columns: &[String]) -> MergeResult<()> {
    for (i, col) in columns.iter().enumerate() {
        if columns[..i].contains(col) {
            return Err(MergeError::DuplicateColumn(col.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RecordSet {
        RecordSet::new(
            vec!["Chrom".into(), "Position".into(), "Gene".into()],
            vec![
                vec![
                    CellValue::String("chr9".into()),
                    CellValue::int(21971111),
                    CellValue::String("CDKN2A".into()),
                ],
                vec![
                    CellValue::String("chr7".into()),
                    CellValue::int(55241707),
                    CellValue::Null,
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_guesses_types() {
        assert_eq!(CellValue::parse("."), CellValue::Null);
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("42"), CellValue::int(42));
        assert_eq!(CellValue::parse("0.25"), CellValue::float(0.25));
        assert_eq!(CellValue::parse("NA"), CellValue::Null);
        assert_eq!(CellValue::parse("nan"), CellValue::Null);
        assert_eq!(CellValue::parse("null"), CellValue::Null);
        assert_eq!(CellValue::parse("inf"), CellValue::String("inf".into()));
        assert_eq!(
            CellValue::parse("c.100A>G"),
            CellValue::String("c.100A>G".into())
        );
    }

    #[test]
    fn test_parse_keeps_numeric_text() {
        let id = CellValue::parse("00452");
        assert_eq!(id.as_f64(), Some(452.0));
        assert_eq!(id.to_string(), "00452");
        assert_eq!(CellValue::parse("1.10").to_string(), "1.10");
        assert_eq!(CellValue::parse("24.0").text(), Some("24.0"));
        assert_eq!(CellValue::Null.text(), None);
    }

    #[test]
    fn test_matches_coerces_numbers() {
        assert!(CellValue::int(5).matches(&CellValue::float(5.0)));
        assert!(CellValue::int(5).matches(&CellValue::String("5".into())));
        assert!(CellValue::parse("5.0").matches(&CellValue::String("5".into())));
        assert!(!CellValue::Null.matches(&CellValue::Null));
        assert_eq!(CellValue::float(100.0).to_string(), "100");
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let err = RecordSet::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::int(1)]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            MergeError::SchemaMismatch {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let err = RecordSet::empty(vec!["a".into(), "a".into()]).unwrap_err();
        assert_eq!(err, MergeError::DuplicateColumn("a".into()));
    }

    #[test]
    fn test_select_orders_and_rejects_unknown() {
        let t = table();
        let s = t.select(&["Gene", "Chrom"]).unwrap();
        assert_eq!(s.columns(), &["Gene".to_string(), "Chrom".to_string()]);
        assert_eq!(s.rows()[0][1], CellValue::String("chr9".into()));

        assert_eq!(
            t.select(&["Missing"]).unwrap_err(),
            MergeError::UnknownColumn("Missing".into())
        );
    }

    #[test]
    fn test_rename_ignores_absent_columns() {
        let t = table().rename(&[("Chrom", "Chr"), ("Nope", "Other")]).unwrap();
        assert!(t.has_column("Chr"));
        assert!(!t.has_column("Other"));
        assert!(table().rename(&[("Chrom", "Gene")]).is_err());
    }

    #[test]
    fn test_with_constant_appends_then_overwrites() {
        let t = table().with_constant("Barcode", CellValue::String("IonXpress_008".into()));
        assert_eq!(t.columns().last().unwrap(), "Barcode");
        let t = t.with_constant("Gene", CellValue::String("TP53".into()));
        assert_eq!(t.columns().len(), 4);
        assert_eq!(t.cell(1, "Gene").unwrap(), &CellValue::String("TP53".into()));
    }

    #[test]
    fn test_cell_rejects_out_of_range_row() {
        assert_eq!(
            table().cell(2, "Gene").unwrap_err(),
            MergeError::RowOutOfRange { row: 2, len: 2 }
        );
        assert_eq!(
            table().cell(0, "Nope").unwrap_err(),
            MergeError::UnknownColumn("Nope".into())
        );
    }

    #[test]
    fn test_retain_and_drop_column() {
        let t = table()
            .retain(|r| !r.get("Gene").unwrap().is_null())
            .drop_column("Position")
            .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.columns(), &["Chrom".to_string(), "Gene".to_string()]);
    }
}
