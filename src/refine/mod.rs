mod batch_partition;
mod boundary_diagnostic;
mod classifier;
mod controller;
mod estimator;
mod priors;

use std::collections::HashMap;

use rayon::prelude::*;

use crate::features::FeatureRecord;
use crate::genotype_class::GenotypeClass;

use self::batch_partition::partition_into_batch_groups;
pub use self::classifier::BatchQualitySummary;
pub use self::controller::{BatchRefinement, RefinementModel, refinement_model_for_sv_type};
use self::controller::refine_batch_group;

/// Authoritative refinement output for one sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefinedCall {
    pub genotype: GenotypeClass,
    pub quality: f64,
}

/// Refinement results from every batch group of one variant
pub struct VariantRefinement<'a> {
    /// Batch results in batch label order
    pub batches: Vec<BatchRefinement<'a>>,
}

impl<'a> VariantRefinement<'a> {
    /// Variant-level quality annotation, taken from the first batch group
    pub fn annotation_summary(&self) -> Option<BatchQualitySummary> {
        self.batches
            .first()
            .map(|x| x.pass2.pass.result.summary)
    }

    /// Map from sample name to the final genotype call for every clustered sample
    pub fn sample_calls(&self) -> HashMap<&'a str, RefinedCall> {
        let mut calls = HashMap::new();
        for batch in self.batches.iter() {
            for (member, c) in batch
                .group
                .members
                .iter()
                .zip(batch.pass2.pass.result.members.iter())
            {
                calls.insert(
                    member.record.sample_name.as_str(),
                    RefinedCall {
                        genotype: c.class,
                        quality: c.quality,
                    },
                );
            }
        }
        calls
    }

    pub fn clustered_sample_count(&self) -> usize {
        self.batches.iter().map(|x| x.group.members.len()).sum()
    }
}

/// Refine the genotypes of one variant
///
/// Each batch group is refined independently on the given worker pool.
///
pub fn refine_variant<'a>(
    worker_pool: &rayon::ThreadPool,
    model: RefinementModel,
    records: &'a [FeatureRecord],
) -> VariantRefinement<'a> {
    let groups = partition_into_batch_groups(records);
    let batches = worker_pool.install(|| {
        groups
            .into_par_iter()
            .map(|group| refine_batch_group(model, group))
            .collect::<Vec<_>>()
    });
    VariantRefinement { batches }
}

#[cfg(test)]
pub(crate) use self::batch_partition::test_utils;
