use log::warn;

use super::model::{CellValue, RecordSet};
use crate::error::MergeResult;

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A row whose composite field could not be split as expected. The row is
/// still present in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitDegraded {
    /// Index of the row in the input table.
    pub row: usize,
    pub column: String,
    pub reason: String,
}

/// The transformed table together with the rows that degraded on the way.
#[derive(Debug, Clone)]
pub struct Split {
    pub records: RecordSet,
    pub diagnostics: Vec<SplitDegraded>,
}

impl Split {
    /// Log every diagnostic and keep only the table.
    pub fn into_logged(self) -> RecordSet {
        for d in &self.diagnostics {
            warn!("Row {} of column '{}' not split: {}", d.row, d.column, d.reason);
        }
        self.records
    }
}

// ---------------------------------------------------------------------------
// Expand to rows
// ---------------------------------------------------------------------------

/// Split `column` on `delimiter` and emit one row per item; the column is
/// renamed to `new_name`.
///
/// Null, empty and non-text values are passed through as a single row with a
/// diagnostic, so the output has `sum(max(1, items))` rows.
pub fn expand_to_rows(
    records: RecordSet,
    column: &str,
    delimiter: char,
    new_name: &str,
) -> MergeResult<Split> {
    let idx = records.column_index(column)?;
    let mut out = RecordSet::empty(records.columns().to_vec())?.rename(&[(column, new_name)])?;
    let mut diagnostics = Vec::new();

    for (row_no, row) in records.rows().iter().enumerate() {
        let items: Vec<&str> = match &row[idx] {
            CellValue::String(s) if !s.is_empty() => s.split(delimiter).collect(),
            other => {
                diagnostics.push(SplitDegraded {
                    row: row_no,
                    column: column.to_string(),
                    reason: degraded_reason(other),
                });
                out.push(row.clone())?;
                continue;
            }
        };

        for item in items {
            let mut new_row = row.clone();
            new_row[idx] = text_cell(item);
            out.push(new_row)?;
        }
    }

    Ok(Split {
        records: out,
        diagnostics,
    })
}

// ---------------------------------------------------------------------------
// Expand to columns
// ---------------------------------------------------------------------------

/// Split `column` on `delimiter` into `targets.len()` new columns appended at
/// the end of the schema.
///
/// Part `i` always lands in `targets[i]`; the last target keeps any text past
/// the last expected delimiter. Targets without a part are null-filled.
pub fn expand_to_columns(
    records: RecordSet,
    column: &str,
    delimiter: char,
    targets: &[&str],
    delete_source: bool,
) -> MergeResult<Split> {
    let idx = records.column_index(column)?;
    let k = targets.len();
    let mut diagnostics = Vec::new();

    let mut columns = records.columns().to_vec();
    columns.extend(targets.iter().map(|t| t.to_string()));
    let mut out = RecordSet::empty(columns)?;

    for (row_no, row) in records.rows().iter().enumerate() {
        let mut parts: Vec<CellValue> = match &row[idx] {
            CellValue::String(s) => s.splitn(k, delimiter).map(text_cell).collect(),
            _ => Vec::new(),
        };

        if parts.len() < k {
            let reason = match &row[idx] {
                CellValue::String(_) => {
                    format!("expected {k} '{delimiter}'-separated parts, found {}", parts.len())
                }
                other => degraded_reason(other),
            };
            diagnostics.push(SplitDegraded {
                row: row_no,
                column: column.to_string(),
                reason,
            });
            parts.resize(k, CellValue::Null);
        }

        let mut new_row = row.clone();
        new_row.extend(parts);
        out.push(new_row)?;
    }

    let out = if delete_source {
        out.drop_column(column)?
    } else {
        out
    };

    Ok(Split {
        records: out,
        diagnostics,
    })
}

fn text_cell(s: &str) -> CellValue {
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(s.to_string())
    }
}

fn degraded_reason(value: &CellValue) -> String {
    match value {
        CellValue::Null => "value is missing".to_string(),
        CellValue::String(_) => "value is empty".to_string(),
        other => format!("value '{other}' is not text"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGETS: [&str; 5] = ["Gene.AA", "Transcript", "Exon", "Coding", "Amino Acid Change"];

    fn bundles(values: Vec<CellValue>) -> RecordSet {
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| vec![CellValue::int(i as i64), v])
            .collect();
        RecordSet::new(vec!["id".into(), "AAChange.refGene".into()], rows).unwrap()
    }

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    #[test]
    fn test_expand_to_rows_duplicates_per_item() {
        let input = bundles(vec![
            s("EGFR:NM_005228:exon19:c.2235_2249del:p.E746_A750del,EGFR:NM_001346897:exon18:c.2100_2114del:p.E701_A705del"),
            s("KRAS:NM_004985:exon2:c.35G>A:p.G12D"),
        ]);
        let split = expand_to_rows(input, "AAChange.refGene", ',', "AAChange").unwrap();

        assert!(split.diagnostics.is_empty());
        assert_eq!(split.records.len(), 3);
        assert_eq!(split.records.columns()[1], "AAChange");
        assert_eq!(split.records.rows()[0][0], CellValue::int(0));
        assert_eq!(split.records.rows()[1][0], CellValue::int(0));
        assert_eq!(
            split.records.rows()[1][1],
            s("EGFR:NM_001346897:exon18:c.2100_2114del:p.E701_A705del")
        );
    }

    #[test]
    fn test_expand_to_rows_passes_through_unsplittable() {
        let input = bundles(vec![CellValue::Null, CellValue::int(7), s("A:B")]);
        let source_len = input.len();
        let split = expand_to_rows(input, "AAChange.refGene", ',', "AAChange").unwrap();

        // every value yields one item, so the counts are equal
        assert_eq!(split.records.len(), source_len);
        assert_eq!(split.diagnostics.len(), 2);
        assert_eq!(split.diagnostics[0].row, 0);
        assert_eq!(split.diagnostics[1].row, 1);
        assert_eq!(split.records.rows()[1][1], CellValue::int(7));
        assert!(split.records.has_column("AAChange"));
    }

    #[test]
    fn test_expand_to_rows_unknown_column() {
        let input = bundles(vec![s("x")]);
        assert!(expand_to_rows(input, "nope", ',', "AAChange").is_err());
    }

    #[test]
    fn test_expand_to_columns_maps_parts_in_order() {
        let input = bundles(vec![s("GENE1:NM_001:3:c.100A>G:p.K33R")]);
        let split = expand_to_columns(input, "AAChange.refGene", ':', &TARGETS, true).unwrap();
        let t = split.records;

        assert!(split.diagnostics.is_empty());
        assert!(!t.has_column("AAChange.refGene"));
        assert_eq!(t.columns().len(), 1 + TARGETS.len());
        assert_eq!(t.cell(0, "Gene.AA").unwrap(), &s("GENE1"));
        assert_eq!(t.cell(0, "Transcript").unwrap(), &s("NM_001"));
        assert_eq!(t.cell(0, "Exon").unwrap(), &s("3"));
        assert_eq!(t.cell(0, "Coding").unwrap(), &s("c.100A>G"));
        assert_eq!(t.cell(0, "Amino Acid Change").unwrap(), &s("p.K33R"));
    }

    #[test]
    fn test_expand_to_columns_null_fills_short_values() {
        let input = bundles(vec![s("GENE1:NM_001"), CellValue::Null, s("UNKNOWN")]);
        let split = expand_to_columns(input, "AAChange.refGene", ':', &TARGETS, false).unwrap();
        let t = &split.records;

        assert_eq!(t.len(), 3);
        assert_eq!(split.diagnostics.len(), 3);
        assert_eq!(t.cell(0, "Transcript").unwrap(), &s("NM_001"));
        assert_eq!(t.cell(0, "Exon").unwrap(), &CellValue::Null);
        assert_eq!(t.cell(1, "Gene.AA").unwrap(), &CellValue::Null);
        assert_eq!(t.cell(2, "Gene.AA").unwrap(), &s("UNKNOWN"));
        assert_eq!(t.cell(2, "Amino Acid Change").unwrap(), &CellValue::Null);
        for row in t.rows() {
            assert_eq!(row.len(), 2 + TARGETS.len());
        }
    }

    #[test]
    fn test_expand_to_columns_keeps_overflow_in_last_target() {
        let input = bundles(vec![s("a:b:c")]);
        let split = expand_to_columns(input, "AAChange.refGene", ':', &["x", "y"], true).unwrap();
        assert_eq!(split.records.cell(0, "y").unwrap(), &s("b:c"));
    }
}
