//! Per-sample refinement diagnostics table
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use simple_error::{SimpleResult, try_with};
use unwrap::unwrap;

use crate::genotype_class::GenotypeClass;
use crate::refine::{BatchRefinement, VariantRefinement};

pub const DIAGNOSTIC_TABLE_FILENAME: &str = "refine_diagnostics.csv";

#[derive(Serialize)]
struct DiagnosticRow<'a> {
    batch: &'a str,
    variant_id: &'a str,
    sample: &'a str,
    sv_type: &'a str,
    allele_frequency: f64,
    initial_genotype: &'a str,
    copy_number: f64,
    allele_balance: f64,
    initial_class: Option<u8>,
    boundary_adjusted: bool,
    pass1_input_class: Option<u8>,
    pass1_lld_hom_ref: f64,
    pass1_lld_het: f64,
    pass1_lld_hom_alt: f64,
    pass1_class: u8,
    pass1_gq: f64,
    pass1_median_gq: f64,
    pass1_q10_gq: f64,
    pass2_input_class: u8,
    pass2_lld_hom_ref: f64,
    pass2_lld_het: f64,
    pass2_lld_hom_alt: f64,
    pass2_class: u8,
    pass2_gq: f64,
    pass2_median_gq: f64,
    pass2_q10_gq: f64,
    refined_genotype: &'static str,
}

fn get_batch_rows<'a>(batch: &'a BatchRefinement) -> impl Iterator<Item = DiagnosticRow<'a>> {
    let pass1 = &batch.pass1.pass;
    let pass2 = &batch.pass2.pass;
    let boundary_adjusted = batch.pass1.boundary_adjusted.boundaries.is_some();
    batch
        .group
        .members
        .iter()
        .enumerate()
        .map(move |(member_index, member)| {
            let record = member.record;
            let c1 = &pass1.result.members[member_index];
            let c2 = &pass2.result.members[member_index];
            DiagnosticRow {
                batch: batch.group.label,
                variant_id: &record.variant_id,
                sample: &record.sample_name,
                sv_type: record.sv_type.label(),
                allele_frequency: record.allele_frequency,
                initial_genotype: &record.genotype_label,
                copy_number: member.signal.copy_number,
                allele_balance: member.signal.allele_balance,
                initial_class: member.initial_class.map(|x| x.code()),
                boundary_adjusted,
                pass1_input_class: pass1.input_classes[member_index].map(|x| x.code()),
                pass1_lld_hom_ref: c1.ln_densities[GenotypeClass::HomRef.index()],
                pass1_lld_het: c1.ln_densities[GenotypeClass::Het.index()],
                pass1_lld_hom_alt: c1.ln_densities[GenotypeClass::HomAlt.index()],
                pass1_class: c1.class.code(),
                pass1_gq: c1.quality,
                pass1_median_gq: pass1.result.summary.median_quality,
                pass1_q10_gq: pass1.result.summary.p10_quality,
                pass2_input_class: batch.corrected.classes[member_index].code(),
                pass2_lld_hom_ref: c2.ln_densities[GenotypeClass::HomRef.index()],
                pass2_lld_het: c2.ln_densities[GenotypeClass::Het.index()],
                pass2_lld_hom_alt: c2.ln_densities[GenotypeClass::HomAlt.index()],
                pass2_class: c2.class.code(),
                pass2_gq: c2.quality,
                pass2_median_gq: pass2.result.summary.median_quality,
                pass2_q10_gq: pass2.result.summary.p10_quality,
                refined_genotype: c2.class.vcf_genotype(),
            }
        })
}

/// Appends one block of rows per refined variant to the diagnostics table
///
/// The column header is written with the first non-empty block only.
///
pub struct DiagnosticTableWriter<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> DiagnosticTableWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    /// Write all rows for one variant
    ///
    /// Rows are serialized to memory first, so that each variant's block is added to the output
    /// with a single write.
    ///
    pub fn write_variant(&mut self, refinement: &VariantRefinement) -> SimpleResult<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(!self.header_written)
            .from_writer(Vec::new());
        let mut row_count = 0;
        for batch in refinement.batches.iter() {
            for row in get_batch_rows(batch) {
                try_with!(
                    csv_writer.serialize(row),
                    "Failed to serialize refinement diagnostics row"
                );
                row_count += 1;
            }
        }
        if row_count == 0 {
            return Ok(());
        }

        let buffer = try_with!(
            csv_writer.into_inner().map_err(|x| x.into_error()),
            "Failed to serialize refinement diagnostics"
        );
        try_with!(
            self.writer.write_all(&buffer),
            "Failed to write refinement diagnostics"
        );
        self.header_written = true;
        Ok(())
    }

    pub fn flush(&mut self) -> SimpleResult<()> {
        try_with!(self.writer.flush(), "Failed to flush refinement diagnostics");
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Create the diagnostics table file in the output directory
///
pub fn get_diagnostic_table_writer(output_dir: &Utf8Path) -> DiagnosticTableWriter<BufWriter<File>> {
    let filename = output_dir.join(DIAGNOSTIC_TABLE_FILENAME);
    info!("Writing refinement diagnostics to file: '{filename}'");
    let f = unwrap!(
        File::create(&filename),
        "Unable to create refinement diagnostics file: '{filename}'"
    );
    DiagnosticTableWriter::new(BufWriter::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::test_utils::{get_separated_deletion_records, get_test_record};
    use crate::refine::{RefinementModel, refine_variant};

    fn get_test_pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_diagnostic_table_header_once() {
        let records = get_separated_deletion_records("cohort_a");
        let pool = get_test_pool();
        let refinement = refine_variant(&pool, RefinementModel::Deletion, &records);

        let mut writer = DiagnosticTableWriter::new(Vec::new());
        writer.write_variant(&refinement).unwrap();
        writer.write_variant(&refinement).unwrap();
        let output = String::from_utf8(writer.into_inner()).unwrap();

        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 1 + 2 * records.len());
        assert!(lines[0].starts_with("batch,variant_id,sample,sv_type,allele_frequency,"));
        assert!(lines[0].ends_with(",pass2_median_gq,pass2_q10_gq,refined_genotype"));
        assert_eq!(
            lines.iter().filter(|x| x.starts_with("batch,")).count(),
            1
        );

        let fields = lines[1].split(',').collect::<Vec<_>>();
        assert_eq!(fields.len(), 27);
        assert_eq!(fields[0], "cohort_a");
        assert_eq!(fields[2], "cohort_a_s0_0");
        assert_eq!(fields[3], "DEL");
        assert_eq!(fields[8], "1");
        assert_eq!(fields[26], "0/0");
    }

    #[test]
    fn test_unclassified_variant_writes_nothing() {
        let records = vec![get_test_record("s1", "None", "0/1", 1.0, None)];
        let pool = get_test_pool();
        let refinement = refine_variant(&pool, RefinementModel::Deletion, &records);

        let mut writer = DiagnosticTableWriter::new(Vec::new());
        writer.write_variant(&refinement).unwrap();
        assert!(!writer.header_written);

        let records = get_separated_deletion_records("b");
        let refinement = refine_variant(&pool, RefinementModel::Deletion, &records);
        writer.write_variant(&refinement).unwrap();
        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert!(output.starts_with("batch,"));
    }
}
