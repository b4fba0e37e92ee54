//! Write a synthetic sample run for trying out `variant-merge`.
//!
//! ```text
//! generate_sample [OUTDIR]
//!
//! OUTDIR/
//!   sample_barcode_IDs.tsv
//!   canonical_transcripts.txt  panel_genes.txt  actionable_genes.txt
//!   filter_criteria.json
//!   IonXpress_008/
//!     IonXpress_008_query.tsv
//!     IonXpress_008.hg19_multianno.txt
//!     IonXpress_008.vcf
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use variant_merge::data::filter::FilterSpec;
use variant_merge::data::loader::write_tsv;
use variant_merge::data::model::{CellValue, RecordSet};

const BARCODE: &str = "IonXpress_008";

#[derive(Parser, Debug)]
#[command(version, about = "Write a synthetic sample run for variant-merge", long_about = None)]
struct Args {
    #[arg(
        value_name = "OUTDIR",
        default_value = "sample_run",
        help = "Directory to write the run into; created if missing"
    )]
    outdir: PathBuf,
}

/// (chrom, position, ref, alt, gene, canonical transcript, exon, coding, protein)
const VARIANTS: [(&str, i64, &str, &str, &str, &str, &str, &str, &str); 6] = [
    ("chr7", 55259515, "T", "G", "EGFR", "NM_005228", "exon21", "c.T2573G", "p.L858R"),
    ("chr12", 25398284, "C", "T", "KRAS", "NM_004985", "exon2", "c.G35A", "p.G12D"),
    ("chr7", 140453136, "A", "T", "BRAF", "NM_004333", "exon15", "c.T1799A", "p.V600E"),
    ("chr17", 7577120, "C", "T", "TP53", "NM_000546", "exon8", "c.G818A", "p.R273H"),
    ("chr9", 21971111, "G", "A", "CDKN2A", "NM_000077", "exon2", "c.C358T", "p.R120W"),
    ("chr3", 178936091, "G", "A", "PIK3CA", "NM_006218", "exon10", "c.G1633A", "p.E545K"),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_f64() * (hi - lo) as f64) as i64
    }
}

fn text(s: &str) -> CellValue {
    CellValue::String(s.to_string())
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn round2(v: f64) -> CellValue {
    CellValue::float((v * 100.0).round() / 100.0)
}

fn query_table(rng: &mut SimpleRng) -> Result<RecordSet> {
    let mut table = RecordSet::empty(columns(&[
        "Chrom",
        "Position",
        "Ref",
        "Variant",
        "Allele Call",
        "Frequency",
        "Quality",
        "Coverage",
        "Allele Coverage",
        "Strand Bias",
    ]))?;

    for (chrom, pos, r, alt, ..) in VARIANTS {
        let coverage = rng.range(80, 2500);
        let alt_reads = rng.range(coverage / 20, coverage / 2);
        table.push(vec![
            text(chrom),
            CellValue::int(pos),
            text(r),
            text(alt),
            text("Heterozygous"),
            round2(100.0 * alt_reads as f64 / coverage as f64),
            round2(20.0 + rng.next_f64() * 1500.0),
            CellValue::int(coverage),
            text(&format!("{r}={},{alt}={alt_reads}", coverage - alt_reads)),
            round2(0.5 + rng.next_f64() * 0.45),
        ])?;
    }
    Ok(table)
}

fn annotation_table(rng: &mut SimpleRng) -> Result<RecordSet> {
    let mut table = RecordSet::empty(columns(&[
        "Chr",
        "Start",
        "End",
        "Ref",
        "Alt",
        "Func.refGene",
        "Gene.refGene",
        "GeneDetail.refGene",
        "ExonicFunc.refGene",
        "AAChange.refGene",
        "cosmic68",
        "1000g2015aug_all",
    ]))?;

    for (i, (chrom, pos, r, alt, gene, tx, exon, coding, protein)) in VARIANTS.into_iter().enumerate() {
        // every other variant also hits a non-canonical isoform
        let mut bundle = format!("{gene}:{tx}:{exon}:{coding}:{protein}");
        if i % 2 == 0 {
            let alt_tx = format!("NM_{:06}", 100000 + rng.range(0, 899999));
            bundle = format!("{gene}:{alt_tx}:{exon}:{coding}:{protein},{bundle}");
        }
        let population = if rng.next_f64() < 0.5 {
            CellValue::Null
        } else {
            round2(rng.next_f64() * 0.05)
        };
        table.push(vec![
            text(chrom),
            CellValue::int(pos),
            CellValue::int(pos),
            text(r),
            text(alt),
            text("exonic"),
            text(gene),
            CellValue::Null,
            text("nonsynonymous SNV"),
            text(&bundle),
            text(&format!("ID=COSM{}", rng.range(400, 99999))),
            population,
        ])?;
    }

    // annotated but never called
    table.push(vec![
        text("chr1"),
        CellValue::int(115256529),
        CellValue::int(115256529),
        text("T"),
        text("C"),
        text("exonic"),
        text("NRAS"),
        CellValue::Null,
        text("nonsynonymous SNV"),
        text("NRAS:NM_002524:exon3:c.A182G:p.Q61R"),
        CellValue::Null,
        CellValue::Null,
    ])?;
    Ok(table)
}

fn barcode_table() -> Result<RecordSet> {
    let mut table = RecordSet::empty(columns(&["Barcode", "Sample Name", "Run Name"]))?;
    for (barcode, sample) in [("IonXpress_007", "PatientB"), (BARCODE, "PatientA")] {
        table.push(vec![text(barcode), text(sample), text("Auto_user_SN2-1-Run1")])?;
    }
    Ok(table)
}

fn filter_criteria() -> Result<String> {
    let spec: FilterSpec = serde_json::from_str(
        r#"{
            "include": {"Func.refGene": ["exonic", "splicing"]},
            "exclude": {"ExonicFunc.refGene": ["synonymous SNV"]},
            "less_than": {},
            "greater_than": {"Coverage": 250, "Quality": 10},
            "less_or_null": {"1000g2015aug_all": 0.01}
        }"#,
    )?;
    Ok(serde_json::to_string_pretty(&spec)?)
}

fn write_lines(path: &Path, lines: impl IntoIterator<Item = String>) -> Result<()> {
    let body: String = lines.into_iter().map(|l| l + "\n").collect();
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Args { outdir } = Args::parse();
    let sample_dir = outdir.join(BARCODE);
    fs::create_dir_all(&sample_dir).with_context(|| format!("creating {}", sample_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    write_tsv(&outdir.join("sample_barcode_IDs.tsv"), &barcode_table()?)?;
    write_tsv(&sample_dir.join(format!("{BARCODE}_query.tsv")), &query_table(&mut rng)?)?;
    write_tsv(
        &sample_dir.join(format!("{BARCODE}.hg19_multianno.txt")),
        &annotation_table(&mut rng)?,
    )?;

    write_lines(
        &outdir.join("canonical_transcripts.txt"),
        VARIANTS.iter().map(|v| v.5.to_string()).chain(["NM_002524".to_string()]),
    )?;
    write_lines(
        &outdir.join("panel_genes.txt"),
        VARIANTS.iter().map(|v| v.4.to_string()),
    )?;
    write_lines(
        &outdir.join("actionable_genes.txt"),
        ["EGFR", "KRAS", "BRAF"].map(String::from),
    )?;
    fs::write(outdir.join("filter_criteria.json"), filter_criteria()?)?;
    write_lines(
        &sample_dir.join(format!("{BARCODE}.vcf")),
        [
            "##fileformat=VCFv4.1".to_string(),
            "##fileUTCtime=2016-09-23T16:46:51".to_string(),
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO".to_string(),
        ],
    )?;

    info!("Wrote sample run for {BARCODE} to {}", outdir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_outdir_defaults_to_sample_run() {
        let args = Args::try_parse_from(["generate_sample"]).unwrap();
        assert_eq!(args.outdir, PathBuf::from("sample_run"));
    }

    #[test]
    fn test_outdir_is_positional() {
        let args = Args::try_parse_from(["generate_sample", "/tmp/run7"]).unwrap();
        assert_eq!(args.outdir, PathBuf::from("/tmp/run7"));
    }

    #[test]
    fn test_help_is_not_a_directory() {
        let err = Args::try_parse_from(["generate_sample", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
