//! Build the per-sample clustering features of one VCF record
//!

use regex::Regex;
use simple_error::{SimpleResult, try_with};

use crate::features::{FeatureRecord, InitialGenotype, SvType, parse_signal_pair};
use crate::sample_tables::SampleTables;
use crate::vcf_utils::{VCF_MISSING_VALUE, VcfRecord};

/// Copy number scale applied to male samples on the sex chromosomes
const MALE_SEX_CHROM_COPY_NUMBER_SCALE: f64 = 2.0;

/// Settings used to convert VCF records into clustering features
pub struct FeatureSettings {
    pub sex_chrom_regex: Regex,
}

/// Get a feature record for every non-excluded sample of the VCF record
///
/// Records are returned in VCF sample column order.
///
pub fn get_variant_feature_records(
    settings: &FeatureSettings,
    tables: &SampleTables,
    sample_names: &[String],
    record: &VcfRecord,
    sv_type: &SvType,
    allele_frequency: f64,
) -> SimpleResult<Vec<FeatureRecord>> {
    let variant_id = record.variant_id();
    let is_sex_chrom = settings.sex_chrom_regex.is_match(record.chrom());
    let format_table = record.format_table();

    let mut feature_records = Vec::new();
    for (sample_index, sample_name) in sample_names.iter().enumerate() {
        if tables.excluded.contains(sample_name) {
            continue;
        }

        let copy_number_scale = if is_sex_chrom && tables.sex.is_male(sample_name) {
            MALE_SEX_CHROM_COPY_NUMBER_SCALE
        } else {
            1.0
        };

        let get_value =
            |key: &str| format_table.get(sample_index, key).unwrap_or(VCF_MISSING_VALUE);

        let signal = try_with!(
            parse_signal_pair(
                get_value("CN"),
                get_value("AB"),
                copy_number_scale,
                sample_name
            ),
            "Invalid clustering signal in variant '{variant_id}'"
        );

        let genotype_label = get_value("GT").to_string();
        feature_records.push(FeatureRecord {
            variant_id: variant_id.clone(),
            sample_name: sample_name.clone(),
            sv_type: sv_type.clone(),
            allele_frequency,
            initial_genotype: InitialGenotype::from_vcf_genotype(&genotype_label),
            genotype_label,
            signal,
            batch_label: tables.batches.batch_label(sample_name).to_string(),
        });
    }
    Ok(feature_records)
}
