//! Two-pass genotype refinement of a single batch group
//!
//! Each refinement stage produces a new value from the previous one:
//! `BoundaryAdjusted -> Pass1Result -> CorrectedClasses -> Pass2Result`
//!

use log::debug;
use strum::EnumCount;

use super::batch_partition::{BatchGroup, BatchMember};
use super::boundary_diagnostic::{BoundaryAdjusted, get_boundary_adjusted_classes};
use super::classifier::{ClassificationResult, classify_batch_group};
use super::estimator::{ClassParameters, estimate_class_parameters};
use super::priors::{PriorTable, deletion_prior_table, duplication_prior_table};
use crate::features::{SignalPair, SvType};
use crate::genotype_class::GenotypeClass;

/// Minimum allele balance for a pass-1 hom-ref call to be moved to het
const CORRECTION_MIN_ALLELE_BALANCE: f64 = 0.1;

/// Deletion hom-ref calls with copy number below this value are candidates for het correction
const DELETION_CORRECTION_MAX_COPY_NUMBER: f64 = 1.5;

/// Duplication hom-ref calls with copy number above this value are candidates for het correction
const DUPLICATION_CORRECTION_MIN_COPY_NUMBER: f64 = 2.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefinementModel {
    Deletion,
    Duplication,
}

/// Select the refinement model for an SV type
///
/// Note that duplications have a model here, but are not admitted to refinement by
/// [`SvType::is_refinement_candidate`].
///
pub fn refinement_model_for_sv_type(sv_type: &SvType) -> Option<RefinementModel> {
    match sv_type {
        SvType::Deletion | SvType::MobileElementInsertion => Some(RefinementModel::Deletion),
        SvType::Duplication => Some(RefinementModel::Duplication),
        SvType::Other(_) => None,
    }
}

impl RefinementModel {
    pub fn prior_table(&self) -> PriorTable {
        match self {
            RefinementModel::Deletion => deletion_prior_table(),
            RefinementModel::Duplication => duplication_prior_table(),
        }
    }

    /// Get the pass-2 input class from a pass-1 call
    ///
    /// Only hom-ref calls can be changed, and these can only be changed to het. This counters the
    /// tendency of the pass-1 model to under-call hets with low allele balance and ambiguous copy
    /// number.
    ///
    pub fn correct_class(&self, class: GenotypeClass, signal: &SignalPair) -> GenotypeClass {
        if class != GenotypeClass::HomRef || signal.allele_balance <= CORRECTION_MIN_ALLELE_BALANCE
        {
            return class;
        }
        let is_het_copy_number = match self {
            RefinementModel::Deletion => signal.copy_number < DELETION_CORRECTION_MAX_COPY_NUMBER,
            RefinementModel::Duplication => {
                signal.copy_number > DUPLICATION_CORRECTION_MIN_COPY_NUMBER
            }
        };
        if is_het_copy_number {
            GenotypeClass::Het
        } else {
            class
        }
    }
}

/// Estimator and classifier output for one pass over a batch group
#[derive(Clone, Debug)]
pub struct ClassificationPass {
    /// Estimator input class for each member
    pub input_classes: Vec<Option<GenotypeClass>>,
    pub parameters: [ClassParameters; GenotypeClass::COUNT],
    pub result: ClassificationResult,
}

impl ClassificationPass {
    pub fn output_classes(&self) -> Vec<GenotypeClass> {
        self.result.members.iter().map(|x| x.class).collect()
    }
}

pub fn run_classification_pass(
    members: &[BatchMember],
    input_classes: Vec<Option<GenotypeClass>>,
    prior: &PriorTable,
) -> ClassificationPass {
    let parameters = estimate_class_parameters(members, &input_classes, prior);
    let result = classify_batch_group(members, &parameters);
    ClassificationPass {
        input_classes,
        parameters,
        result,
    }
}

#[derive(Clone, Debug)]
pub struct Pass1Result {
    pub boundary_adjusted: BoundaryAdjusted,
    pub pass: ClassificationPass,
}

#[derive(Clone, Debug)]
pub struct CorrectedClasses {
    pub classes: Vec<GenotypeClass>,
}

#[derive(Clone, Debug)]
pub struct Pass2Result {
    pub pass: ClassificationPass,
}

/// Get pass-1 input classes
///
/// The boundary diagnostic is only used for the deletion model, the duplication model starts from
/// the initial genotype classes directly.
///
pub fn get_pass1_input_classes(model: RefinementModel, members: &[BatchMember]) -> BoundaryAdjusted {
    match model {
        RefinementModel::Deletion => get_boundary_adjusted_classes(members),
        RefinementModel::Duplication => BoundaryAdjusted {
            fit: None,
            boundaries: None,
            classes: members.iter().map(|x| x.initial_class).collect(),
        },
    }
}

pub fn run_pass1(
    boundary_adjusted: BoundaryAdjusted,
    members: &[BatchMember],
    prior: &PriorTable,
) -> Pass1Result {
    let pass = run_classification_pass(members, boundary_adjusted.classes.clone(), prior);
    Pass1Result {
        boundary_adjusted,
        pass,
    }
}

pub fn correct_pass1_classes(
    model: RefinementModel,
    members: &[BatchMember],
    pass1: &Pass1Result,
) -> CorrectedClasses {
    let classes = members
        .iter()
        .zip(pass1.pass.result.members.iter())
        .map(|(member, c)| model.correct_class(c.class, &member.signal))
        .collect();
    CorrectedClasses { classes }
}

pub fn run_pass2(
    corrected: &CorrectedClasses,
    members: &[BatchMember],
    prior: &PriorTable,
) -> Pass2Result {
    let input_classes = corrected.classes.iter().map(|x| Some(*x)).collect();
    Pass2Result {
        pass: run_classification_pass(members, input_classes, prior),
    }
}

/// All refinement stages for one batch group
#[derive(Clone, Debug)]
pub struct BatchRefinement<'a> {
    pub group: BatchGroup<'a>,
    pub pass1: Pass1Result,
    pub corrected: CorrectedClasses,
    pub pass2: Pass2Result,
}

/// Run both refinement passes over one batch group
///
/// The pass-2 genotype and quality values are the authoritative refinement output.
///
pub fn refine_batch_group(model: RefinementModel, group: BatchGroup) -> BatchRefinement {
    let prior = model.prior_table();
    let members = &group.members;

    let boundary_adjusted = get_pass1_input_classes(model, members);
    if let (Some(fit), Some(b)) = (&boundary_adjusted.fit, &boundary_adjusted.boundaries) {
        debug!(
            "Batch '{}': allele balance boundaries adjusted to {:.3},{:.3} from CN~AB fit with slope {:.3} R2 {:.3}",
            group.label, b.lower, b.upper, fit.slope, fit.r_squared
        );
    }

    let pass1 = run_pass1(boundary_adjusted, members, &prior);
    let corrected = correct_pass1_classes(model, members, &pass1);
    let pass2 = run_pass2(&corrected, members, &prior);

    debug!(
        "Batch '{}': {} samples with class counts {:?}, median GQ {:.2}, q10 GQ {:.2}",
        group.label,
        members.len(),
        pass2.pass.parameters.each_ref().map(|x| x.sample_count),
        pass2.pass.result.summary.median_quality,
        pass2.pass.result.summary.p10_quality
    );

    BatchRefinement {
        group,
        pass1,
        corrected,
        pass2,
    }
}
