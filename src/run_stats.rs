//! Track stats for the whole refinement run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use thousands::Separable;
use unwrap::unwrap;

pub const RUN_STATS_FILENAME: &str = "run_stats.json";

#[derive(Clone, Default, Debug, Deserialize, PartialEq, Serialize)]
pub struct RefineRunStats {
    pub total_vcf_record_count: usize,
    pub refined_vcf_record_count: usize,

    /// Records passed through because their SV type is not refined
    pub non_candidate_sv_type_record_count: usize,

    /// Records passed through because allele frequency is missing or below the minimum
    pub low_allele_frequency_record_count: usize,

    /// Total count of sample genotypes updated by refinement
    pub refined_sample_count: usize,

    /// Total count of sample genotypes set to missing in refined records, because the sample was
    /// excluded or had no allele balance value
    pub unclassified_sample_count: usize,

    pub total_refinement_time_secs: f64,
}

impl RefineRunStats {
    pub fn log_summary(&self) {
        info!(
            "Refined {} of {} VCF records",
            self.refined_vcf_record_count.separate_with_commas(),
            self.total_vcf_record_count.separate_with_commas()
        );
        info!(
            "Records passed through by SV type: {}, by allele frequency: {}",
            self.non_candidate_sv_type_record_count.separate_with_commas(),
            self.low_allele_frequency_record_count.separate_with_commas()
        );
        info!(
            "Sample genotypes refined: {}, set to missing: {}",
            self.refined_sample_count.separate_with_commas(),
            self.unclassified_sample_count.separate_with_commas()
        );
    }
}

/// Write run_stats structure out in json format
pub fn write_refine_run_stats(output_dir: &Utf8Path, run_stats: &RefineRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stats_json() {
        let stats = RefineRunStats {
            total_vcf_record_count: 10,
            refined_vcf_record_count: 4,
            total_refinement_time_secs: 1.5,
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"refined_vcf_record_count\":4"));
        let stats2: RefineRunStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, stats2);
    }
}
