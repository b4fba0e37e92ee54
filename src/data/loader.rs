use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::filter::FilterSpec;
use super::model::{CellValue, RecordSet};

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Load a tab-delimited table with a header row. `.` and empty fields are null.
pub fn read_tsv(path: &Path) -> Result<RecordSet> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_tsv(file).with_context(|| format!("reading table {}", path.display()))
}

/// Parse tab-delimited text. Rows whose width differs from the header are
/// rejected rather than padded.
pub fn parse_tsv<R: Read>(input: R) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("reading TSV header")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("TSV row {row_no}"))?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }

    Ok(RecordSet::new(headers, rows)?)
}

/// Write `records` as tab-delimited text, header first, columns in schema order.
pub fn write_tsv(path: &Path, records: &RecordSet) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_tsv_to(file, records).with_context(|| format!("writing {}", path.display()))
}

pub fn write_tsv_to<W: Write>(output: W, records: &RecordSet) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(output);

    writer.write_record(records.columns())?;
    for row in records.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Identifier lists, filter criteria, VCF header
// ---------------------------------------------------------------------------

/// One identifier per line; whitespace trimmed, blank lines skipped.
pub fn read_list(path: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_list(BufReader::new(file)).with_context(|| format!("reading list {}", path.display()))
}

pub fn parse_list<R: BufRead>(input: R) -> Result<BTreeSet<String>> {
    let mut entries = BTreeSet::new();
    for line in input.lines() {
        let line = line?;
        let entry = line.trim();
        if !entry.is_empty() {
            entries.insert(entry.to_string());
        }
    }
    Ok(entries)
}

pub fn read_filter_spec(path: &Path) -> Result<FilterSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filter criteria {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing filter criteria {}", path.display()))
}

/// Find the `##fileUTCtime=...` header of a VCF file and return its value.
pub fn find_vcf_timestamp(path: &Path) -> Result<Option<String>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_vcf_timestamp(BufReader::new(file))
}

pub fn parse_vcf_timestamp<R: BufRead>(input: R) -> Result<Option<String>> {
    for line in input.lines() {
        let line = line.context("reading VCF")?;
        if line.contains("fileUTCtime") {
            return Ok(line.trim().split('=').nth(1).map(|v| v.to_string()));
        }
    }
    Ok(None)
}
