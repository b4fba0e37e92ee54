use std::collections::BTreeSet;

use crate::data::model::{CellValue, RecordSet};
use crate::error::MergeResult;

pub const REVIEW_COLUMN: &str = "Review";

/// Clinical review label attached to each reported variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Review {
    UnknownSignificance,
    KnownSignificance,
}

impl Review {
    pub fn label(self) -> &'static str {
        match self {
            Review::UnknownSignificance => "Unknown Significance",
            Review::KnownSignificance => "Known Significance",
        }
    }
}

/// Write the `Review` column: known significance when the gene in
/// `gene_column` is actionable, unknown otherwise.
pub fn classify(
    records: RecordSet,
    gene_column: &str,
    actionable: &BTreeSet<String>,
) -> MergeResult<RecordSet> {
    let idx = records.column_index(gene_column)?;
    Ok(records.with_computed(REVIEW_COLUMN, |rec| {
        let known = rec.cells()[idx]
            .text()
            .is_some_and(|gene| actionable.contains(gene));
        let review = if known {
            Review::KnownSignificance
        } else {
            Review::UnknownSignificance
        };
        CellValue::String(review.label().to_string())
    }))
}
