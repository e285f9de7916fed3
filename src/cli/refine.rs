use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use regex::Regex;
use simple_error::{SimpleResult, bail, map_err_with};

use super::utils::{check_optional_filename, check_required_filename};
use crate::sample_tables::SampleTables;

#[derive(Args)]
pub struct RefineSettings {
    /// Directory for all refinement output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Input SV VCF file, with per-sample GT, CN and AB format fields (required). Input with a
    /// '.gz' extension is read as gzip/bgzip compressed.
    ///
    #[arg(long = "vcf", value_name = "FILE")]
    pub vcf_filename: String,

    /// Tab-delimited file assigning each sample to a batch label. Samples are clustered
    /// separately within each batch. Samples not listed are clustered together.
    ///
    #[arg(long = "batch", value_name = "FILE")]
    pub batch_filename: Option<String>,

    /// File listing samples to exclude from clustering, one sample name per line. Excluded
    /// samples are written with a missing refined genotype.
    ///
    #[arg(long = "exclude", value_name = "FILE")]
    pub exclude_filename: Option<String>,

    /// Tab-delimited file giving the sex code of each sample (1 = male, 2 = female). Copy number
    /// of male samples on the sex chromosomes is doubled before clustering.
    ///
    #[arg(long = "sample-sex", value_name = "FILE")]
    pub sample_sex_filename: Option<String>,

    /// Records with allele frequency below this value are not refined
    #[arg(hide = true, long, default_value_t = 0.01)]
    pub min_allele_frequency: f64,

    /// Regex used to select the sex chromosomes for male copy number scaling
    #[arg(long, value_name = "REGEX", default_value = r"(?i)^(chr)?[xy]$")]
    pub sex_chrom_regex: String,

    /// Skip canonicalization of input file paths
    #[arg(hide = true, long)]
    pub disable_path_canonicalization: bool,
}

fn to_utf8_path(filename: Option<&String>) -> Option<&Utf8Path> {
    filename.map(|x| Utf8Path::new(x.as_str()))
}

impl RefineSettings {
    /// Load all sample tables named in the settings
    pub fn get_sample_tables(&self) -> SimpleResult<SampleTables> {
        SampleTables::from_paths(
            to_utf8_path(self.batch_filename.as_ref()),
            to_utf8_path(self.exclude_filename.as_ref()),
            to_utf8_path(self.sample_sex_filename.as_ref()),
        )
    }
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_refine_settings(settings: RefineSettings) -> SimpleResult<RefineSettings> {
    fn canonicalize_string_path(s: &str) -> SimpleResult<String> {
        let path = map_err_with!(
            Utf8PathBuf::from(s).canonicalize_utf8(),
            "Unable to canonicalize path: '{s}'"
        )?;
        Ok(path.to_string())
    }

    let mut settings = settings;

    check_required_filename(&settings.vcf_filename, "input VCF")?;
    check_optional_filename(settings.batch_filename.as_ref(), "batch")?;
    check_optional_filename(settings.exclude_filename.as_ref(), "sample exclusion")?;
    check_optional_filename(settings.sample_sex_filename.as_ref(), "sample sex")?;

    if !(0.0..=1.0).contains(&settings.min_allele_frequency) {
        bail!(
            "--min-allele-frequency must be in [0,1], found: {}",
            settings.min_allele_frequency
        );
    }

    // Check that regex is valid
    let _ = map_err_with!(
        Regex::new(&settings.sex_chrom_regex),
        "Invalid regex for --sex-chrom-regex"
    )?;

    // Check all sample table content before any output is created
    let _ = settings.get_sample_tables()?;

    if !settings.disable_path_canonicalization {
        settings.vcf_filename = canonicalize_string_path(&settings.vcf_filename)?;
    }

    Ok(settings)
}
