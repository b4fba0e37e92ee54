use std::path::PathBuf;

use clap::Parser;

use crate::error::CliError;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Merge variant calls with ANNOVAR annotations for one sample", long_about = None)]
pub struct Args {
    #[arg(
        short = 'b',
        long = "barcodes",
        required = true,
        value_name = "PATH",
        help = "Path to the run's sample barcode table (Barcode, Sample Name, Run Name)"
    )]
    pub barcodes: PathBuf,

    #[arg(
        short = 'q',
        long = "query",
        required = true,
        value_name = "PATH",
        help = "Path to the variant query table; its parent directory names the barcode"
    )]
    pub query: PathBuf,

    #[arg(
        short = 'a',
        long = "annotation",
        required = true,
        value_name = "PATH",
        help = "Path to the ANNOVAR multianno table"
    )]
    pub annotation: PathBuf,

    #[arg(
        short = 't',
        long = "transcripts",
        required = true,
        value_name = "PATH",
        help = "Canonical transcript list, one ID per line"
    )]
    pub transcripts: PathBuf,

    #[arg(
        short = 'p',
        long = "panel",
        required = true,
        value_name = "PATH",
        help = "Panel gene list, one symbol per line"
    )]
    pub panel: PathBuf,

    #[arg(
        short = 'k',
        long = "actionable",
        required = true,
        value_name = "PATH",
        help = "Actionable gene list, one symbol per line"
    )]
    pub actionable: PathBuf,

    #[arg(
        short = 'i',
        long = "analysis-id",
        required = true,
        value_name = "ID",
        help = "Analysis ID stamped on every row"
    )]
    pub analysis_id: String,

    #[arg(
        short = 'v',
        long = "vcf",
        required = true,
        value_name = "PATH",
        help = "Original VCF file; its fileUTCtime header becomes the Date column"
    )]
    pub vcf: PathBuf,

    #[arg(
        short = 'f',
        long = "filter-criteria",
        value_name = "PATH",
        default_value = "filter_criteria.json",
        help = "JSON quality filter criteria"
    )]
    pub filter_criteria: PathBuf,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "PATH",
        help = "Output directory [default: the annotation file's directory]"
    )]
    pub outdir: Option<PathBuf>,
}

impl Args {
    /// Reject missing input files before anything is loaded.
    pub fn check(&self) -> Result<(), CliError> {
        for path in [
            &self.barcodes,
            &self.query,
            &self.annotation,
            &self.transcripts,
            &self.panel,
            &self.actionable,
            &self.vcf,
            &self.filter_criteria,
        ] {
            validate(path)?;
        }

        if let Some(outdir) = &self.outdir {
            if !outdir.is_dir() {
                return Err(CliError::InvalidInput(format!(
                    "{:?} is not a directory",
                    outdir
                )));
            }
        }

        Ok(())
    }

    /// Where the three reports go.
    pub fn output_dir(&self) -> PathBuf {
        match &self.outdir {
            Some(dir) => dir.clone(),
            None => self
                .annotation
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default(),
        }
    }
}

fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    Ok(())
}
