use statrs::statistics::Statistics;

use super::batch_partition::BatchMember;
use crate::genotype_class::GenotypeClass;

/// Ordinary least squares fit of copy number on allele balance
#[derive(Clone, Copy, Debug)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
}

impl LinearFit {
    /// Allele balance at which the fitted copy number reaches zero
    pub fn x_intercept(&self) -> f64 {
        -self.intercept / self.slope
    }
}

/// Class boundaries on the allele balance axis, after scaling by the fit x-intercept
#[derive(Clone, Copy, Debug)]
pub struct AlleleBalanceBoundaries {
    pub lower: f64,
    pub upper: f64,
}

impl AlleleBalanceBoundaries {
    /// Classes cover the allele balance range (-1, 1], values outside this range are unclassified
    pub fn classify(&self, allele_balance: f64) -> Option<GenotypeClass> {
        if !(allele_balance > MIN_ALLELE_BALANCE && allele_balance <= MAX_ALLELE_BALANCE) {
            None
        } else if allele_balance <= self.lower {
            Some(GenotypeClass::HomRef)
        } else if allele_balance <= self.upper {
            Some(GenotypeClass::Het)
        } else {
            Some(GenotypeClass::HomAlt)
        }
    }
}

/// Pass-1 input classes for one batch group
#[derive(Clone, Debug)]
pub struct BoundaryAdjusted {
    pub fit: Option<LinearFit>,

    /// Set only when the initial classes were replaced by allele balance re-bucketing
    pub boundaries: Option<AlleleBalanceBoundaries>,

    /// One entry per batch member
    pub classes: Vec<Option<GenotypeClass>>,
}

const MIN_ALLELE_BALANCE: f64 = -1.0;
const MAX_ALLELE_BALANCE: f64 = 1.0;
const MIN_R_SQUARED: f64 = 0.5;
const MAX_SLOPE: f64 = -0.5;
const DEFAULT_LOWER_BOUNDARY: f64 = 0.2;
const DEFAULT_UPPER_BOUNDARY: f64 = 0.7;

pub fn fit_copy_number_on_allele_balance(members: &[BatchMember]) -> Option<LinearFit> {
    if members.len() < 2 {
        return None;
    }
    let ab = members
        .iter()
        .map(|x| x.signal.allele_balance)
        .collect::<Vec<_>>();
    let cn = members
        .iter()
        .map(|x| x.signal.copy_number)
        .collect::<Vec<_>>();

    let ab_var = ab.iter().variance();
    let cn_var = cn.iter().variance();
    if !(ab_var > 0.0 && cn_var > 0.0) {
        return None;
    }
    let cov = ab.iter().covariance(cn.iter());

    let slope = cov / ab_var;
    let intercept = cn.iter().mean() - slope * ab.iter().mean();
    let r_squared = (cov * cov) / (ab_var * cn_var);
    Some(LinearFit {
        intercept,
        slope,
        r_squared,
    })
}

/// Midpoint between the highest allele balance of the lower class and the lowest allele balance of
/// the upper class
fn get_class_midpoint(
    members: &[BatchMember],
    lower_class: GenotypeClass,
    upper_class: GenotypeClass,
) -> Option<f64> {
    let class_ab = |class| {
        members
            .iter()
            .filter(move |x| x.initial_class == Some(class))
            .map(|x| x.signal.allele_balance)
    };
    let lower_max = class_ab(lower_class).reduce(f64::max)?;
    let upper_min = class_ab(upper_class).reduce(f64::min)?;
    Some(0.5 * (lower_max + upper_min))
}

/// Find adjusted allele balance class boundaries when the batch signals indicate allele balance is
/// compressed toward zero
///
/// Returns None if the signals do not have the expected strong negative correlation, or if the
/// copy number fit does not reach zero below an allele balance of 1.
///
fn get_adjusted_boundaries(
    members: &[BatchMember],
    fit: &LinearFit,
) -> Option<AlleleBalanceBoundaries> {
    if !(fit.r_squared > MIN_R_SQUARED && fit.slope < MAX_SLOPE) {
        return None;
    }

    let x_intercept = fit.x_intercept();
    if !(x_intercept > 0.0 && x_intercept < 1.0) {
        return None;
    }

    let lower = get_class_midpoint(members, GenotypeClass::HomRef, GenotypeClass::Het)
        .unwrap_or(DEFAULT_LOWER_BOUNDARY);
    let upper = get_class_midpoint(members, GenotypeClass::Het, GenotypeClass::HomAlt)
        .unwrap_or(DEFAULT_UPPER_BOUNDARY);

    Some(AlleleBalanceBoundaries {
        lower: lower * x_intercept,
        upper: upper * x_intercept,
    })
}

/// Derive the pass-1 classes of a batch group
///
/// The initial genotype classes are used unless the boundary diagnostic finds a shifted allele
/// balance scale, in which case every member is re-bucketed on allele balance alone.
///
pub fn get_boundary_adjusted_classes(members: &[BatchMember]) -> BoundaryAdjusted {
    let fit = fit_copy_number_on_allele_balance(members);
    let boundaries = fit
        .as_ref()
        .and_then(|fit| get_adjusted_boundaries(members, fit));

    let classes = match &boundaries {
        Some(b) => members
            .iter()
            .map(|x| b.classify(x.signal.allele_balance))
            .collect(),
        None => members.iter().map(|x| x.initial_class).collect(),
    };

    BoundaryAdjusted {
        fit,
        boundaries,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRecord;
    use crate::refine::batch_partition::partition_into_batch_groups;
    use crate::refine::batch_partition::test_utils::{
        get_separated_deletion_records, get_test_record,
    };

    #[test]
    fn test_linear_fit() {
        let records = vec![
            get_test_record("s1", "None", "0/0", 2.0, Some(0.0)),
            get_test_record("s2", "None", "0/1", 1.0, Some(0.5)),
            get_test_record("s3", "None", "1/1", 0.0, Some(1.0)),
        ];
        let groups = partition_into_batch_groups(&records);
        let fit = fit_copy_number_on_allele_balance(&groups[0].members).unwrap();
        approx::assert_ulps_eq!(fit.slope, -2.0, max_ulps = 4);
        approx::assert_ulps_eq!(fit.intercept, 2.0, max_ulps = 4);
        approx::assert_ulps_eq!(fit.r_squared, 1.0, max_ulps = 4);
        approx::assert_ulps_eq!(fit.x_intercept(), 1.0, max_ulps = 4);
    }

    #[test]
    fn test_degenerate_linear_fit() {
        let records = vec![
            get_test_record("s1", "None", "0/0", 2.0, Some(0.1)),
            get_test_record("s2", "None", "0/0", 2.0, Some(0.2)),
        ];
        let groups = partition_into_batch_groups(&records);
        assert!(fit_copy_number_on_allele_balance(&groups[0].members).is_none());

        let records = vec![get_test_record("s1", "None", "0/0", 2.0, Some(0.1))];
        let groups = partition_into_batch_groups(&records);
        assert!(fit_copy_number_on_allele_balance(&groups[0].members).is_none());
    }

    #[test]
    fn test_uncorrelated_signals_keep_initial_classes() {
        let data = [
            ("0/0", 2.0, 0.01),
            ("0/0", 1.9, 0.03),
            ("0/0", 2.1, 0.02),
            ("0/0", 2.05, 0.05),
            ("./.", 2.0, 0.5),
        ];
        let records = data
            .iter()
            .enumerate()
            .map(|(index, (gt, cn, ab))| {
                get_test_record(&format!("s{index}"), "None", gt, *cn, Some(*ab))
            })
            .collect::<Vec<_>>();
        let groups = partition_into_batch_groups(&records);
        let members = &groups[0].members;
        let adjusted = get_boundary_adjusted_classes(members);

        assert!(adjusted.fit.unwrap().r_squared < 0.5);
        assert!(adjusted.boundaries.is_none());
        for (member, class) in members.iter().zip(adjusted.classes.iter()) {
            assert_eq!(member.initial_class, *class);
        }
        assert_eq!(adjusted.classes[4], None);
    }

    #[test]
    fn test_separated_clusters_keep_classes() {
        let records = get_separated_deletion_records("None");
        let groups = partition_into_batch_groups(&records);
        let members = &groups[0].members;
        let adjusted = get_boundary_adjusted_classes(members);

        // The hom-ref allele balance offset puts the x-intercept just below 1, re-bucketing
        // should still recover the initial classes
        let x_int = adjusted.fit.unwrap().x_intercept();
        assert!(x_int > 0.9 && x_int < 1.0, "x_int {x_int}");
        assert!(adjusted.boundaries.is_some());
        for (member, class) in members.iter().zip(adjusted.classes.iter()) {
            assert_eq!(member.initial_class, *class);
        }
    }

    /// Build a deletion batch where allele balance is compressed to half the expected scale, so
    /// that the initial caller labeled both het and hom-alt samples as het
    fn get_compressed_records() -> Vec<FeatureRecord> {
        let data = [
            ("0/0", 2.0, 0.00),
            ("0/0", 2.1, 0.02),
            ("0/0", 1.9, 0.04),
            ("0/1", 1.0, 0.24),
            ("0/1", 1.1, 0.25),
            ("./.", 1.0, 0.26),
            ("0/1", 0.0, 0.47),
            ("0/1", 0.1, 0.48),
        ];
        data.iter()
            .enumerate()
            .map(|(index, (gt, cn, ab))| {
                get_test_record(&format!("s{index}"), "None", gt, *cn, Some(*ab))
            })
            .collect()
    }

    #[test]
    fn test_adjusted_classes() {
        let records = get_compressed_records();
        let groups = partition_into_batch_groups(&records);
        let members = &groups[0].members;
        let adjusted = get_boundary_adjusted_classes(members);

        let fit = adjusted.fit.unwrap();
        assert!(fit.r_squared > 0.99);
        approx::assert_abs_diff_eq!(fit.slope, -4.2671, epsilon = 1e-3);
        let x_int = fit.x_intercept();
        approx::assert_abs_diff_eq!(x_int, 0.4895, epsilon = 1e-3);

        // No initial hom-alt calls, so the upper boundary starts from its default
        let b = adjusted.boundaries.unwrap();
        approx::assert_ulps_eq!(b.lower, 0.5 * (0.04 + 0.24) * x_int, max_ulps = 4);
        approx::assert_ulps_eq!(b.upper, 0.7 * x_int, max_ulps = 4);

        use GenotypeClass::*;
        let expected = [HomRef, HomRef, HomRef, Het, Het, Het, HomAlt, HomAlt];
        let observed = adjusted
            .classes
            .iter()
            .map(|x| x.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(observed, expected);
    }

    #[test]
    fn test_out_of_range_allele_balance_is_unclassified() {
        let b = AlleleBalanceBoundaries {
            lower: 0.1,
            upper: 0.35,
        };
        assert_eq!(b.classify(0.0), Some(GenotypeClass::HomRef));
        assert_eq!(b.classify(0.35), Some(GenotypeClass::Het));
        assert_eq!(b.classify(1.0), Some(GenotypeClass::HomAlt));
        assert_eq!(b.classify(1.02), None);
        assert_eq!(b.classify(-1.0), None);

        let mut records = get_compressed_records();
        records.push(get_test_record("s_high", "None", "1/1", 0.0, Some(1.05)));
        let groups = partition_into_batch_groups(&records);
        let adjusted = get_boundary_adjusted_classes(&groups[0].members);
        assert!(adjusted.boundaries.is_some());
        assert_eq!(adjusted.classes[0], Some(GenotypeClass::HomRef));
        assert_eq!(adjusted.classes[8], None);
    }

    #[test]
    fn test_boundary_defaults() {
        // No het or hom-alt initial calls, so both default boundaries are used
        let records = vec![
            get_test_record("s1", "None", "0/0", 2.0, Some(0.0)),
            get_test_record("s2", "None", "0/0", 1.0, Some(0.25)),
            get_test_record("s3", "None", "0/0", 0.0, Some(0.5)),
        ];
        let groups = partition_into_batch_groups(&records);
        let adjusted = get_boundary_adjusted_classes(&groups[0].members);
        let b = adjusted.boundaries.unwrap();
        approx::assert_ulps_eq!(b.lower, 0.2 * 0.5, max_ulps = 4);
        approx::assert_ulps_eq!(b.upper, 0.7 * 0.5, max_ulps = 4);

        use GenotypeClass::*;
        assert_eq!(
            adjusted.classes,
            vec![Some(HomRef), Some(Het), Some(HomAlt)]
        );
    }
}
