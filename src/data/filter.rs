use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{CellValue, Record, RecordSet};
use crate::error::MergeResult;

// ---------------------------------------------------------------------------
// Filter specification: the document form
// ---------------------------------------------------------------------------

/// Quality criteria as written in `filter_criteria.json`.
///
/// ```json
/// {
///   "include":      { "Func.refGene": ["exonic", "splicing"] },
///   "exclude":      { "ExonicFunc.refGene": ["synonymous SNV"] },
///   "less_than":    { "Strand Bias": 0.8 },
///   "greater_than": { "Coverage": 250, "Quality": 10 },
///   "less_or_null": { "1000g2015aug_all": 0.01 }
/// }
/// ```
///
/// Missing groups are empty. A row survives only if it passes every single
/// predicate of every group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub include: BTreeMap<String, Vec<JsonValue>>,
    pub exclude: BTreeMap<String, Vec<JsonValue>>,
    pub less_than: BTreeMap<String, f64>,
    pub greater_than: BTreeMap<String, f64>,
    pub less_or_null: BTreeMap<String, f64>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// Flatten the five groups into individual predicates.
    pub fn predicates(&self) -> Vec<Predicate> {
        let values = |vals: &Vec<JsonValue>| -> Vec<CellValue> {
            vals.iter().map(CellValue::from_json).collect()
        };

        let mut out = Vec::new();
        for (col, vals) in &self.include {
            out.push(Predicate::new(col, Test::OneOf(values(vals))));
        }
        for (col, vals) in &self.exclude {
            out.push(Predicate::new(col, Test::NoneOf(values(vals))));
        }
        for (col, &t) in &self.less_than {
            out.push(Predicate::new(col, Test::LessThan(t)));
        }
        for (col, &t) in &self.greater_than {
            out.push(Predicate::new(col, Test::GreaterThan(t)));
        }
        for (col, &t) in &self.less_or_null {
            out.push(Predicate::new(col, Test::LessOrNull(t)));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// The comparison applied to one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Cell equals one of the values. Null never does.
    OneOf(Vec<CellValue>),
    /// Cell equals none of the values. Null passes.
    NoneOf(Vec<CellValue>),
    /// Numeric `<`; null or text fails.
    LessThan(f64),
    /// Numeric `>`; null or text fails.
    GreaterThan(f64),
    /// Null passes, otherwise numeric `<`.
    LessOrNull(f64),
}

impl Test {
    pub fn passes(&self, cell: &CellValue) -> bool {
        match self {
            Test::OneOf(vals) => vals.iter().any(|v| cell.matches(v)),
            Test::NoneOf(vals) => !vals.iter().any(|v| cell.matches(v)),
            Test::LessThan(t) => cell.as_f64().is_some_and(|v| v < *t),
            Test::GreaterThan(t) => cell.as_f64().is_some_and(|v| v > *t),
            Test::LessOrNull(t) => cell.is_null() || cell.as_f64().is_some_and(|v| v < *t),
        }
    }
}

/// A single (column, test) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub test: Test,
}

impl Predicate {
    pub fn new(column: &str, test: Test) -> Self {
        Predicate {
            column: column.to_string(),
            test,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Keep the rows of `records` that pass every predicate in `spec`.
///
/// An empty spec returns the input unchanged and a zero-row input returns a
/// zero-row output. A predicate on a column the table lacks is an error.
pub fn apply(records: RecordSet, spec: &FilterSpec) -> MergeResult<RecordSet> {
    if records.is_empty() {
        return Ok(records);
    }

    let compiled: Vec<(usize, Test)> = spec
        .predicates()
        .into_iter()
        .map(|p| -> MergeResult<(usize, Test)> {
            Ok((records.column_index(&p.column)?, p.test))
        })
        .collect::<MergeResult<_>>()?;

    Ok(records.retain(|rec| passes_all(&rec, &compiled)))
}

fn passes_all(rec: &Record<'_>, compiled: &[(usize, Test)]) -> bool {
    let cells = rec.cells();
    compiled.iter().all(|(i, test)| test.passes(&cells[*i]))
}
