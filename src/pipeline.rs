//! Per-sample merge of variant calls and their annotations.
//!
//! The step order is fixed; each step consumes the previous step's table:
//!
//! 1. resolve provenance from the barcode table (fatal on a miss)
//! 2. rename annotation columns to the query table's names
//! 3. inner join on the variant key
//! 4. one row per transcript effect in the annotation bundle
//! 5. bundle → Gene.AA, Transcript, Exon, Coding, Amino Acid Change
//! 6. canonical transcripts only (fatal if one slips through)
//! 7. stamp provenance columns
//! 8. panel genes only
//! 9. review classification
//! 10. snapshot the full table
//! 11. quality filter (skipped on an empty table)
//! 12. summary projection
//!
//! All three reports are built in memory before anything is written, so a
//! fatal error never leaves partial output behind.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::classify::classify;
use crate::cli::Args;
use crate::config::{PipelineConfig, SampleTables};
use crate::data::filter;
use crate::data::join::{count_unmatched, inner_join, VARIANT_KEY};
use crate::data::loader::write_tsv;
use crate::data::model::{CellValue, RecordSet};
use crate::data::split::{expand_to_columns, expand_to_rows};
use crate::error::{MergeError, MergeResult};

/// Annotation table columns renamed onto the query table's naming.
pub const ANNOTATION_RENAMES: [(&str, &str); 5] = [
    ("Chr", "Chrom"),
    ("Start", "Position"),
    ("Ref", "Ref"),
    ("Alt", "Variant"),
    ("Gene.refGene", "Gene"),
];

pub const BUNDLE_COLUMN: &str = "AAChange.refGene";
pub const EFFECT_COLUMN: &str = "AAChange";
pub const EFFECT_FIELDS: [&str; 5] = ["Gene.AA", "Transcript", "Exon", "Coding", "Amino Acid Change"];

pub const SUMMARY_COLUMNS: [&str; 19] = [
    "Chrom",
    "Position",
    "Ref",
    "Variant",
    "Gene",
    "Quality",
    "Coverage",
    "Allele Coverage",
    "Strand Bias",
    "Coding",
    "Amino Acid Change",
    "Transcript",
    "Frequency",
    "Sample Name",
    "Barcode",
    "Run Name",
    "Review",
    "Analysis ID",
    "Date",
];

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Identifying metadata stamped on every row of a sample's reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub barcode: String,
    pub sample_name: CellValue,
    pub run_name: CellValue,
    pub analysis_id: String,
    pub date: Option<String>,
}

impl Provenance {
    /// Look `config.barcode` up in the barcode table; the first match wins.
    pub fn resolve(barcodes: &RecordSet, config: &PipelineConfig) -> MergeResult<Self> {
        let barcode_idx = barcodes.column_index("Barcode")?;
        let sample_idx = barcodes.column_index("Sample Name")?;
        let run_idx = barcodes.column_index("Run Name")?;

        let row = barcodes
            .rows()
            .iter()
            .find(|r| r[barcode_idx].text() == Some(config.barcode.as_str()))
            .ok_or_else(|| MergeError::ProvenanceNotFound(config.barcode.clone()))?;

        Ok(Provenance {
            barcode: config.barcode.clone(),
            sample_name: row[sample_idx].clone(),
            run_name: row[run_idx].clone(),
            analysis_id: config.analysis_id.clone(),
            date: config.date.clone(),
        })
    }

    fn stamp(&self, records: RecordSet) -> RecordSet {
        let text = |s: &str| CellValue::String(s.to_string());
        records
            .with_constant("Barcode", text(&self.barcode))
            .with_constant("Sample Name", self.sample_name.clone())
            .with_constant("Run Name", self.run_name.clone())
            .with_constant("Analysis ID", text(&self.analysis_id))
            .with_constant(
                "Date",
                self.date.as_deref().map_or(CellValue::Null, text),
            )
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// The three derived tables of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Reports {
    /// All merged columns, before the quality filter.
    pub full: RecordSet,
    /// All merged columns, quality-filtered rows.
    pub filtered: RecordSet,
    /// Summary columns of the filtered rows.
    pub summary: RecordSet,
}

/// Run steps 1–12 for one sample.
pub fn merge(tables: SampleTables, config: &PipelineConfig) -> MergeResult<Reports> {
    let provenance = Provenance::resolve(&tables.barcodes, config)?;
    info!(
        "Barcode {} is sample {} of run {}",
        provenance.barcode, provenance.sample_name, provenance.run_name
    );

    let annotation = tables.annotation.rename(&ANNOTATION_RENAMES)?;
    let merged = inner_join(&annotation, &tables.query, &VARIANT_KEY)?;
    info!(
        "Joined {} annotation rows with {} query rows into {} rows",
        annotation.len(),
        tables.query.len(),
        merged.len()
    );
    let unmatched = count_unmatched(&tables.query, &merged, &VARIANT_KEY)?;
    if unmatched > 0 {
        warn!("{unmatched} query variants had no matching annotation");
    }

    let merged = expand_to_rows(merged, BUNDLE_COLUMN, ',', EFFECT_COLUMN)?.into_logged();
    let merged = expand_to_columns(merged, EFFECT_COLUMN, ':', &EFFECT_FIELDS, true)?.into_logged();
    info!("{} transcript effects after splitting annotations", merged.len());

    let merged = keep_member(merged, "Transcript", &config.canonical_transcripts)?;
    check_canonical(&merged, &config.canonical_transcripts)?;
    info!("{} rows on canonical transcripts", merged.len());

    let merged = provenance.stamp(merged);

    let merged = keep_member(merged, "Gene", &config.panel_genes)?;
    info!("{} rows on panel genes", merged.len());

    let full = classify(merged, "Gene", &config.actionable_genes)?;

    let filtered = if full.is_empty() {
        warn!("Table has no rows and will not be filtered");
        full.clone()
    } else {
        filter::apply(full.clone(), &config.filter)?
    };
    info!("{} of {} rows pass the quality filter", filtered.len(), full.len());

    let summary = filtered.select(&SUMMARY_COLUMNS)?;

    Ok(Reports {
        full,
        filtered,
        summary,
    })
}

/// Keep rows whose `column` value is in `allowed`.
fn keep_member(records: RecordSet, column: &str, allowed: &BTreeSet<String>) -> MergeResult<RecordSet> {
    let idx = records.column_index(column)?;
    Ok(records.retain(|rec| {
        rec.cells()[idx]
            .text()
            .is_some_and(|v| allowed.contains(v))
    }))
}

fn check_canonical(records: &RecordSet, canonical: &BTreeSet<String>) -> MergeResult<()> {
    for value in records.column_values("Transcript")? {
        let transcript = value.to_string();
        if !canonical.contains(&transcript) {
            return Err(MergeError::ConsistencyViolation(transcript));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Where the reports of one sample were written.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub filtered: PathBuf,
    pub full: PathBuf,
}

impl ReportPaths {
    pub fn new(outdir: &Path, barcode: &str) -> Self {
        ReportPaths {
            summary: outdir.join(format!("{barcode}_summary.tsv")),
            filtered: outdir.join(format!("{barcode}_filtered.tsv")),
            full: outdir.join(format!("{barcode}_full_table.tsv")),
        }
    }
}

pub fn write_reports(reports: &Reports, paths: &ReportPaths) -> Result<()> {
    write_tsv(&paths.summary, &reports.summary)?;
    info!("Summary table (filtered rows & columns) saved to {}", paths.summary.display());

    write_tsv(&paths.filtered, &reports.filtered)?;
    info!("Filtered table (rows only) saved to {}", paths.filtered.display());

    write_tsv(&paths.full, &reports.full)?;
    info!("Full table saved to {}", paths.full.display());
    Ok(())
}

/// Load the inputs named by `args`, merge them, and write the three reports.
pub fn run(args: &Args) -> Result<ReportPaths> {
    let config = PipelineConfig::load(args)?;
    let tables = SampleTables::load(args)?;

    let reports = merge(tables, &config)?;

    let paths = ReportPaths::new(&args.output_dir(), &config.barcode);
    write_reports(&reports, &paths)?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_tsv;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    fn tables(bundle: &str) -> SampleTables {
        let barcodes = "Barcode\tSample Name\tRun Name\nIonXpress_007\tPatientB\tRun1\nIonXpress_008\tPatientA\tRun1\n";
        let query = "Chrom\tPosition\tRef\tVariant\tQuality\tCoverage\tAllele Coverage\tStrand Bias\tFrequency\n\
                     chr9\t21971111\tG\tA\t300.5\t1200\tG=600,A=600\t0.5\t50.0\n";
        let annotation = format!(
            "Chr\tStart\tEnd\tRef\tAlt\tFunc.refGene\tGene.refGene\tAAChange.refGene\n\
             chr9\t21971111\t21971111\tG\tA\texonic\tGENE1\t{bundle}\n"
        );
        SampleTables {
            barcodes: parse_tsv(barcodes.as_bytes()).unwrap(),
            query: parse_tsv(query.as_bytes()).unwrap(),
            annotation: parse_tsv(annotation.as_bytes()).unwrap(),
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            barcode: "IonXpress_008".into(),
            analysis_id: "NS16-1".into(),
            date: Some("2016-09-23T16:46:51".into()),
            canonical_transcripts: set(&["NM_001"]),
            panel_genes: set(&["GENE1"]),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_single_variant() {
        let reports = merge(tables("GENE1:NM_001:3:c.100A>G:p.K33R"), &config()).unwrap();
        let full = &reports.full;

        assert_eq!(full.len(), 1);
        assert_eq!(full.cell(0, "Gene").unwrap(), &s("GENE1"));
        assert_eq!(full.cell(0, "Transcript").unwrap(), &s("NM_001"));
        assert_eq!(full.cell(0, "Review").unwrap(), &s("Unknown Significance"));
        assert_eq!(full.cell(0, "Sample Name").unwrap(), &s("PatientA"));
        assert_eq!(full.cell(0, "Date").unwrap(), &s("2016-09-23T16:46:51"));
        assert!(!full.has_column(BUNDLE_COLUMN));
        assert!(!full.has_column(EFFECT_COLUMN));

        assert_eq!(reports.filtered, reports.full);
        assert_eq!(reports.summary.columns().len(), SUMMARY_COLUMNS.len());
        assert_eq!(reports.summary.cell(0, "Coding").unwrap(), &s("c.100A>G"));
    }

    #[test]
    fn test_merge_keeps_only_canonical_effects() {
        let reports = merge(
            tables("GENE1:NM_002:2:c.10A>G:p.K4R,GENE1:NM_001:3:c.100A>G:p.K33R"),
            &config(),
        )
        .unwrap();
        assert_eq!(reports.full.len(), 1);
        assert_eq!(reports.full.cell(0, "Exon").unwrap(), &s("3"));
    }

    #[test]
    fn test_merge_actionable_gene_is_known() {
        let mut cfg = config();
        cfg.actionable_genes = set(&["GENE1"]);
        let reports = merge(tables("GENE1:NM_001:3:c.100A>G:p.K33R"), &cfg).unwrap();
        assert_eq!(reports.full.cell(0, "Review").unwrap(), &s("Known Significance"));
    }

    #[test]
    fn test_merge_non_canonical_leaves_empty_reports() {
        let mut cfg = config();
        cfg.canonical_transcripts = set(&["NM_999"]);
        cfg.filter = serde_json::from_str(r#"{"greater_than": {"Coverage": 100}}"#).unwrap();
        let reports = merge(tables("GENE1:NM_001:3:c.100A>G:p.K33R"), &cfg).unwrap();

        assert!(reports.full.is_empty());
        assert!(reports.filtered.is_empty());
        assert!(reports.summary.is_empty());
        assert_eq!(reports.summary.columns().len(), SUMMARY_COLUMNS.len());
    }

    #[test]
    fn test_merge_unknown_barcode_is_fatal() {
        let mut cfg = config();
        cfg.barcode = "IonXpress_099".into();
        assert_eq!(
            merge(tables("GENE1:NM_001:3:c.100A>G:p.K33R"), &cfg).unwrap_err(),
            MergeError::ProvenanceNotFound("IonXpress_099".into())
        );
    }

    #[test]
    fn test_merge_applies_quality_filter() {
        let mut cfg = config();
        cfg.filter = serde_json::from_str(r#"{"greater_than": {"Coverage": 5000}}"#).unwrap();
        let reports = merge(tables("GENE1:NM_001:3:c.100A>G:p.K33R"), &cfg).unwrap();
        assert_eq!(reports.full.len(), 1);
        assert!(reports.filtered.is_empty());
        assert!(reports.summary.is_empty());
    }

    #[test]
    fn test_check_canonical_flags_strays() {
        let t = RecordSet::new(vec!["Transcript".into()], vec![vec![s("NM_777")]]).unwrap();
        assert_eq!(
            check_canonical(&t, &set(&["NM_001"])).unwrap_err(),
            MergeError::ConsistencyViolation("NM_777".into())
        );
    }

    #[test]
    fn test_report_paths() {
        let paths = ReportPaths::new(Path::new("/out"), "IonXpress_008");
        assert_eq!(paths.full, PathBuf::from("/out/IonXpress_008_full_table.tsv"));
        assert_eq!(paths.summary, PathBuf::from("/out/IonXpress_008_summary.tsv"));
    }
}
