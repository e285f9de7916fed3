//! Per-sample clustering features extracted from each SV record
//!

use simple_error::{SimpleResult, bail};

use crate::genotype_class::GenotypeClass;

/// Batch label given to every sample without an explicit batch assignment
pub const UNBATCHED_LABEL: &str = "None";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SvType {
    Deletion,
    MobileElementInsertion,
    Duplication,
    Other(String),
}

impl SvType {
    pub fn from_label(label: &str) -> Self {
        match label {
            "DEL" => SvType::Deletion,
            "MEI" => SvType::MobileElementInsertion,
            "DUP" => SvType::Duplication,
            _ => SvType::Other(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SvType::Deletion => "DEL",
            SvType::MobileElementInsertion => "MEI",
            SvType::Duplication => "DUP",
            SvType::Other(x) => x.as_str(),
        }
    }

    /// True for the SV types admitted to genotype refinement
    ///
    /// Duplications are excluded here because their allelic structure is often too complex for
    /// this clustering model, inversions and breakends are likewise unclear.
    ///
    pub fn is_refinement_candidate(&self) -> bool {
        matches!(self, SvType::Deletion | SvType::MobileElementInsertion)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialGenotype {
    HomRef,
    Het,
    HomAlt,
    Missing,
}

impl InitialGenotype {
    /// Parse a diploid biallelic VCF genotype, phased or unphased
    ///
    /// Any other genotype value is treated as missing.
    ///
    pub fn from_vcf_genotype(gt: &str) -> Self {
        let alleles = gt.split(['/', '|']).collect::<Vec<_>>();
        match alleles.as_slice() {
            ["0", "0"] => InitialGenotype::HomRef,
            ["0", "1"] | ["1", "0"] => InitialGenotype::Het,
            ["1", "1"] => InitialGenotype::HomAlt,
            _ => InitialGenotype::Missing,
        }
    }

    pub fn class(&self) -> Option<GenotypeClass> {
        match self {
            InitialGenotype::HomRef => Some(GenotypeClass::HomRef),
            InitialGenotype::Het => Some(GenotypeClass::Het),
            InitialGenotype::HomAlt => Some(GenotypeClass::HomAlt),
            InitialGenotype::Missing => None,
        }
    }
}

/// The two continuous per-sample clustering signals
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalPair {
    pub copy_number: f64,
    pub allele_balance: f64,
}

impl SignalPair {
    /// Signal in (allele_balance, copy_number) order, matching the prior parameter layout
    pub fn as_vector(&self) -> [f64; 2] {
        [self.allele_balance, self.copy_number]
    }
}

#[derive(Clone, Debug)]
pub struct FeatureRecord {
    pub variant_id: String,
    pub sample_name: String,
    pub sv_type: SvType,
    pub allele_frequency: f64,

    /// Raw genotype string from the input record
    pub genotype_label: String,
    pub initial_genotype: InitialGenotype,

    /// None if allele balance is missing for this sample
    pub signal: Option<SignalPair>,
    pub batch_label: String,
}

fn is_missing_value(value: &str) -> bool {
    value.is_empty() || value == "."
}

fn parse_signal_value(value: &str, label: &str, sample_name: &str) -> SimpleResult<f64> {
    match value.parse::<f64>() {
        Ok(x) => Ok(x),
        Err(_) => {
            bail!("Can't parse {label} value '{value}' for sample '{sample_name}'");
        }
    }
}

/// Build the clustering signal for one sample from raw CN and AB format values
///
/// A missing allele balance means the sample is not clustered, so copy number is not parsed
/// in this case.
///
/// # Arguments
/// * `copy_number_scale` - Factor applied to the parsed copy number, used to normalize haploid
///   sex chromosome regions to the diploid scale
///
pub fn parse_signal_pair(
    copy_number: &str,
    allele_balance: &str,
    copy_number_scale: f64,
    sample_name: &str,
) -> SimpleResult<Option<SignalPair>> {
    if is_missing_value(allele_balance) {
        return Ok(None);
    }
    let allele_balance = parse_signal_value(allele_balance, "AB", sample_name)?;
    let copy_number = parse_signal_value(copy_number, "CN", sample_name)? * copy_number_scale;
    Ok(Some(SignalPair {
        copy_number,
        allele_balance,
    }))
}
