//! Refine genotypes over a whole VCF stream
//!

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use log::{debug, info};
use regex::Regex;
use simple_error::{SimpleResult, bail, map_err_with, try_with};
use unwrap::unwrap;

use crate::cli::{RefineSettings, SharedSettings};
use crate::diagnostic_output::{DiagnosticTableWriter, get_diagnostic_table_writer};
use crate::features::SvType;
use crate::refine::{refine_variant, refinement_model_for_sv_type};
use crate::run_stats::{RefineRunStats, write_refine_run_stats};
use crate::sample_features::{FeatureSettings, get_variant_feature_records};
use crate::sample_tables::SampleTables;
use crate::vcf_utils::{
    VCF_MISSING_VALUE, VcfHeaderEditor, VcfRecord, get_info_column, get_info_value,
};

pub const REFINED_VCF_FILENAME: &str = "refined.vcf";

/// Refined GT value given to samples which were not clustered
const UNCLASSIFIED_GENOTYPE: &str = "./.";

/// Refined GQ value given to samples which were not clustered
const UNCLASSIFIED_QUALITY: &str = "0";

pub struct RefinementSettings {
    pub min_allele_frequency: f64,
    pub features: FeatureSettings,
}

/// Settings and shared state needed to refine each record of one VCF stream
pub struct VcfRefiner<'a> {
    pub settings: &'a RefinementSettings,
    pub tables: &'a SampleTables,
    pub worker_pool: &'a rayon::ThreadPool,
}

enum RecordDisposition {
    NonCandidateSvType,
    LowAlleleFrequency,
    Refined(String),
}

fn format_quality(quality: f64, precision: usize) -> String {
    if quality.is_finite() {
        format!("{quality:.precision$}")
    } else {
        VCF_MISSING_VALUE.to_string()
    }
}

/// Get allele frequency from the INFO AF field, using the first value if there is more than one
///
fn get_allele_frequency(info: &str) -> Option<f64> {
    let af = get_info_value(info, "AF")?;
    af.split(',').next()?.parse::<f64>().ok()
}

impl VcfRefiner<'_> {
    fn refine_record<D: Write>(
        &self,
        line: &str,
        sample_names: &[String],
        diagnostics: &mut DiagnosticTableWriter<D>,
        stats: &mut RefineRunStats,
    ) -> SimpleResult<RecordDisposition> {
        // Passthrough records are gated on the INFO column alone
        let Some(info) = get_info_column(line) else {
            return Ok(RecordDisposition::NonCandidateSvType);
        };
        let sv_type = match get_info_value(info, "SVTYPE") {
            Some(x) => SvType::from_label(x),
            None => return Ok(RecordDisposition::NonCandidateSvType),
        };
        if !sv_type.is_refinement_candidate() {
            return Ok(RecordDisposition::NonCandidateSvType);
        }
        let Some(model) = refinement_model_for_sv_type(&sv_type) else {
            return Ok(RecordDisposition::NonCandidateSvType);
        };

        let allele_frequency = match get_allele_frequency(info) {
            Some(x) if x >= self.settings.min_allele_frequency => x,
            _ => return Ok(RecordDisposition::LowAlleleFrequency),
        };

        let mut record = VcfRecord::from_line(line, sample_names.len())?;

        let feature_records = get_variant_feature_records(
            &self.settings.features,
            self.tables,
            sample_names,
            &record,
            &sv_type,
            allele_frequency,
        )?;

        let refinement = refine_variant(self.worker_pool, model, &feature_records);
        debug!(
            "Refining variant {} AF {allele_frequency}: {} clustered samples in {} batches",
            record.variant_id(),
            refinement.clustered_sample_count(),
            refinement.batches.len()
        );
        diagnostics.write_variant(&refinement)?;

        if let Some(summary) = refinement.annotation_summary() {
            record.set_info_value("MEDGQR", &format_quality(summary.median_quality, 2));
            record.set_info_value("Q10GQR", &format_quality(summary.p10_quality, 2));
        }

        let sample_calls = refinement.sample_calls();
        let format_table = record.format_table_mut();
        for (sample_index, sample_name) in sample_names.iter().enumerate() {
            let original_genotype = format_table
                .get(sample_index, "GT")
                .unwrap_or(VCF_MISSING_VALUE)
                .to_string();
            let original_quality = format_table
                .get(sample_index, "GQ")
                .unwrap_or(VCF_MISSING_VALUE)
                .to_string();
            format_table.set(sample_index, "GTO", original_genotype);
            format_table.set(sample_index, "GQO", original_quality);

            let (genotype, quality) = match sample_calls.get(sample_name.as_str()) {
                Some(call) => {
                    stats.refined_sample_count += 1;
                    (
                        call.genotype.vcf_genotype().to_string(),
                        format_quality(call.quality, 0),
                    )
                }
                None => {
                    stats.unclassified_sample_count += 1;
                    (
                        UNCLASSIFIED_GENOTYPE.to_string(),
                        UNCLASSIFIED_QUALITY.to_string(),
                    )
                }
            };
            format_table.set(sample_index, "GT", genotype);
            format_table.set(sample_index, "GQ", quality);
        }

        Ok(RecordDisposition::Refined(record.to_line()))
    }

    /// Refine every eligible record from a VCF text stream
    ///
    /// Records which are not refined are written back out unchanged. Every output line is written
    /// with a single call, so the output is always a sequence of complete lines.
    ///
    pub fn refine_vcf_stream<R: BufRead, W: Write, D: Write>(
        &self,
        mut reader: R,
        writer: &mut W,
        diagnostics: &mut DiagnosticTableWriter<D>,
    ) -> SimpleResult<RefineRunStats> {
        let mut stats = RefineRunStats::default();
        let mut header = VcfHeaderEditor::default();
        let mut is_header = true;
        let mut line = String::new();
        let mut line_number = 0;
        loop {
            line.clear();
            let byte_count = try_with!(
                reader.read_line(&mut line),
                "Failed to read input VCF line {}",
                line_number + 1
            );
            if byte_count == 0 {
                break;
            }
            line_number += 1;

            if is_header {
                if line.starts_with("##") {
                    header.add_meta_line(&line);
                    try_with!(writer.write_all(line.as_bytes()), "Failed to write VCF header");
                } else if line.starts_with("#CHROM") {
                    header.set_column_header_line(&line)?;
                    let header_tail = header.get_added_header_lines() + &line;
                    try_with!(
                        writer.write_all(header_tail.as_bytes()),
                        "Failed to write VCF header"
                    );
                    is_header = false;
                } else {
                    bail!("Input VCF line {line_number} is not a valid header line");
                }
                continue;
            }

            if line.trim().is_empty() {
                try_with!(writer.write_all(line.as_bytes()), "Failed to write VCF record");
                continue;
            }

            stats.total_vcf_record_count += 1;
            let disposition = try_with!(
                self.refine_record(&line, header.sample_names(), diagnostics, &mut stats),
                "Failed to refine input VCF line {line_number}"
            );
            let output_line = match &disposition {
                RecordDisposition::NonCandidateSvType => {
                    stats.non_candidate_sv_type_record_count += 1;
                    &line
                }
                RecordDisposition::LowAlleleFrequency => {
                    stats.low_allele_frequency_record_count += 1;
                    &line
                }
                RecordDisposition::Refined(x) => {
                    stats.refined_vcf_record_count += 1;
                    x
                }
            };
            try_with!(
                writer.write_all(output_line.as_bytes()),
                "Failed to write VCF record"
            );
        }

        if is_header {
            bail!("Input VCF is missing the '#CHROM' column header line");
        }
        try_with!(writer.flush(), "Failed to flush VCF output");
        diagnostics.flush()?;
        Ok(stats)
    }
}

/// Open a VCF file for text reading, decompressing it if the filename ends in '.gz'
///
fn get_vcf_reader(filename: &Utf8Path) -> SimpleResult<Box<dyn BufRead>> {
    let f = try_with!(File::open(filename), "Unable to open input VCF file: '{filename}'");
    let reader: Box<dyn BufRead> = if filename.as_str().ends_with(".gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

pub fn run_genotype_refinement(
    shared_settings: &SharedSettings,
    settings: &RefineSettings,
) -> SimpleResult<()> {
    let start = std::time::Instant::now();

    let tables = settings.get_sample_tables()?;
    info!(
        "Loaded {} sample batch labels, {} excluded samples",
        tables.batches.batch_count(),
        tables.excluded.len()
    );

    let sex_chrom_regex = map_err_with!(
        Regex::new(&settings.sex_chrom_regex),
        "Invalid regex for --sex-chrom-regex"
    )?;
    let refinement_settings = RefinementSettings {
        min_allele_frequency: settings.min_allele_frequency,
        features: FeatureSettings { sex_chrom_regex },
    };

    let worker_pool = try_with!(
        rayon::ThreadPoolBuilder::new()
            .num_threads(shared_settings.thread_count)
            .build(),
        "Unable to create worker thread pool"
    );

    let refiner = VcfRefiner {
        settings: &refinement_settings,
        tables: &tables,
        worker_pool: &worker_pool,
    };

    let vcf_filename = Utf8Path::new(&settings.vcf_filename);
    info!("Reading input VCF file: '{vcf_filename}'");
    let reader = get_vcf_reader(vcf_filename)?;

    let output_filename = settings.output_dir.join(REFINED_VCF_FILENAME);
    info!("Writing refined VCF to file: '{output_filename}'");
    let output_file = unwrap!(
        File::create(&output_filename),
        "Unable to create refined VCF file: '{output_filename}'"
    );
    let mut writer = BufWriter::new(output_file);
    let mut diagnostics = get_diagnostic_table_writer(&settings.output_dir);

    let mut stats = refiner.refine_vcf_stream(reader, &mut writer, &mut diagnostics)?;
    stats.total_refinement_time_secs = start.elapsed().as_secs_f64();

    stats.log_summary();
    write_refine_run_stats(&settings.output_dir, &stats);
    Ok(())
}
