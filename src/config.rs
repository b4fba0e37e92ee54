use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::cli::Args;
use crate::data::filter::FilterSpec;
use crate::data::loader::{find_vcf_timestamp, read_filter_spec, read_list, read_tsv};
use crate::data::model::RecordSet;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything the merge needs besides the three tables. Built once per run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Barcode of the sample; the query file's directory name.
    pub barcode: String,
    pub analysis_id: String,
    /// `fileUTCtime` of the source VCF, when present.
    pub date: Option<String>,
    pub canonical_transcripts: BTreeSet<String>,
    pub panel_genes: BTreeSet<String>,
    pub actionable_genes: BTreeSet<String>,
    pub filter: FilterSpec,
}

impl PipelineConfig {
    pub fn load(args: &Args) -> Result<Self> {
        let barcode = barcode_from_query_path(&args.query)?;

        let date = find_vcf_timestamp(&args.vcf)?;
        if date.is_none() {
            warn!(
                "No fileUTCtime header in {}; Date will be empty",
                args.vcf.display()
            );
        }

        let config = PipelineConfig {
            barcode,
            analysis_id: args.analysis_id.clone(),
            date,
            canonical_transcripts: read_list(&args.transcripts)?,
            panel_genes: read_list(&args.panel)?,
            actionable_genes: read_list(&args.actionable)?,
            filter: read_filter_spec(&args.filter_criteria)?,
        };

        info!(
            "Sample {}: {} canonical transcripts, {} panel genes, {} actionable genes, {} filter predicates",
            config.barcode,
            config.canonical_transcripts.len(),
            config.panel_genes.len(),
            config.actionable_genes.len(),
            config.filter.predicates().len()
        );

        Ok(config)
    }
}

/// The barcode is the name of the directory holding the query table,
/// e.g. `.../IonXpress_008/IonXpress_008_query.tsv`.
pub fn barcode_from_query_path(query: &Path) -> Result<String> {
    query
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .with_context(|| format!("cannot derive a barcode from {}", query.display()))
}

// ---------------------------------------------------------------------------
// Input tables
// ---------------------------------------------------------------------------

/// The three per-sample input tables.
#[derive(Debug, Clone)]
pub struct SampleTables {
    pub barcodes: RecordSet,
    pub query: RecordSet,
    pub annotation: RecordSet,
}

impl SampleTables {
    pub fn load(args: &Args) -> Result<Self> {
        let tables = SampleTables {
            barcodes: read_tsv(&args.barcodes)?,
            query: read_tsv(&args.query)?,
            annotation: read_tsv(&args.annotation)?,
        };
        info!(
            "Loaded {} query rows and {} annotation rows",
            tables.query.len(),
            tables.annotation.len()
        );
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_from_query_path() {
        let path = Path::new("/data/run1/IonXpress_008/IonXpress_008_query.tsv");
        assert_eq!(barcode_from_query_path(path).unwrap(), "IonXpress_008");
        assert!(barcode_from_query_path(Path::new("query.tsv")).is_err());
    }
}
