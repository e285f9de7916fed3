use strum::EnumCount;

use super::batch_partition::BatchMember;
use super::estimator::ClassParameters;
use super::priors::{Mat2, Vec2};
use crate::genotype_class::GenotypeClass;
use crate::stats_utils::{arg_max, median, quantile};

/// Quantile of the batch quality distribution reported as the low-quality summary
const LOW_QUALITY_QUANTILE: f64 = 0.1;

/// Log density of a bivariate normal distribution
///
/// Returns negative infinity if the covariance matrix is not positive definite.
///
pub fn bivariate_normal_ln_pdf(x: &Vec2, mean: &Vec2, cov: &Mat2) -> f64 {
    let det = cov[0][0] * cov[1][1] - cov[0][1] * cov[1][0];
    if !(cov[0][0] > 0.0 && det > 0.0) {
        return f64::NEG_INFINITY;
    }
    let d0 = x[0] - mean[0];
    let d1 = x[1] - mean[1];

    // Mahalanobis distance using the closed form 2x2 inverse
    let mahalanobis =
        (cov[1][1] * d0 * d0 - (cov[0][1] + cov[1][0]) * d0 * d1 + cov[0][0] * d1 * d1) / det;

    -0.5 * (mahalanobis + det.ln()) - (2.0 * std::f64::consts::PI).ln()
}

#[derive(Clone, Debug)]
pub struct MemberClassification {
    pub ln_densities: [f64; GenotypeClass::COUNT],
    pub class: GenotypeClass,

    /// Margin of the assigned class ln-density over the median class ln-density
    pub quality: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BatchQualitySummary {
    pub median_quality: f64,
    pub p10_quality: f64,
}

#[derive(Clone, Debug)]
pub struct ClassificationResult {
    /// One entry per batch member
    pub members: Vec<MemberClassification>,
    pub summary: BatchQualitySummary,
}

/// Assign the most likely class given all per-class ln-densities
///
/// Exact ties resolve to the lower class.
///
pub fn classify_ln_densities(ln_densities: [f64; GenotypeClass::COUNT]) -> MemberClassification {
    let max_index = arg_max(&ln_densities).expect("three classes");
    let class = GenotypeClass::from_repr(max_index).expect("three classes");
    let quality = ln_densities[max_index] - median(&ln_densities).unwrap_or(f64::NAN);
    MemberClassification {
        ln_densities,
        class,
        quality,
    }
}

pub fn get_batch_quality_summary(members: &[MemberClassification]) -> BatchQualitySummary {
    let qualities = members.iter().map(|x| x.quality).collect::<Vec<_>>();
    BatchQualitySummary {
        median_quality: median(&qualities).unwrap_or(f64::NAN),
        p10_quality: quantile(&qualities, LOW_QUALITY_QUANTILE).unwrap_or(f64::NAN),
    }
}

/// Classify every member of a batch group under the given class parameters
///
pub fn classify_batch_group(
    members: &[BatchMember],
    parameters: &[ClassParameters; GenotypeClass::COUNT],
) -> ClassificationResult {
    let members = members
        .iter()
        .map(|member| {
            let x = member.signal.as_vector();
            let ln_densities =
                parameters.each_ref().map(|p| bivariate_normal_ln_pdf(&x, &p.mean, &p.covariance));
            classify_ln_densities(ln_densities)
        })
        .collect::<Vec<_>>();
    let summary = get_batch_quality_summary(&members);
    ClassificationResult { members, summary }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bivariate_normal_ln_pdf() {
        // Standard normal at the origin
        let identity = [[1.0, 0.0], [0.0, 1.0]];
        let v = bivariate_normal_ln_pdf(&[0.0, 0.0], &[0.0, 0.0], &identity);
        approx::assert_ulps_eq!(v, -(2.0 * std::f64::consts::PI).ln(), max_ulps = 4);

        let v = bivariate_normal_ln_pdf(&[1.0, 2.0], &[0.0, 0.0], &identity);
        approx::assert_ulps_eq!(
            v,
            -2.5 - (2.0 * std::f64::consts::PI).ln(),
            max_ulps = 4
        );

        // Correlated case, compared against an independently computed value
        let cov = [[0.013, -0.0196], [-0.0196, 0.4626]];
        let v = bivariate_normal_ln_pdf(&[0.5, 1.0], &[0.46, 1.1], &cov);
        approx::assert_abs_diff_eq!(v, 0.6886203, epsilon = 1e-6);
    }

    #[test]
    fn test_non_positive_definite_covariance() {
        let cov = [[1.0, 1.0], [1.0, 1.0]];
        let v = bivariate_normal_ln_pdf(&[0.0, 0.0], &[0.0, 0.0], &cov);
        assert_eq!(v, f64::NEG_INFINITY);
    }

    #[test]
    fn test_classify_ln_densities() {
        let c = classify_ln_densities([-3.0, -1.0, -2.0]);
        assert_eq!(c.class, GenotypeClass::Het);
        approx::assert_ulps_eq!(c.quality, 1.0);

        // Exact three-way tie goes to hom-ref with zero quality
        let c = classify_ln_densities([-1.0, -1.0, -1.0]);
        assert_eq!(c.class, GenotypeClass::HomRef);
        approx::assert_ulps_eq!(c.quality, 0.0);

        let c = classify_ln_densities([-5.0, -1.0, -1.0]);
        assert_eq!(c.class, GenotypeClass::Het);
        approx::assert_ulps_eq!(c.quality, 0.0);
    }

    #[test]
    fn test_quality_is_non_negative() {
        let cases = [
            [0.5, -2.0, 7.0],
            [-100.0, -100.5, -99.0],
            [3.0, 3.0, -1.0],
            [f64::NEG_INFINITY, -1.0, -2.0],
        ];
        for ln_densities in cases {
            let c = classify_ln_densities(ln_densities);
            assert!(c.quality >= 0.0);
        }
    }

    #[test]
    fn test_batch_quality_summary() {
        let members = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|q| MemberClassification {
                ln_densities: [0.0; 3],
                class: GenotypeClass::HomRef,
                quality: *q,
            })
            .collect::<Vec<_>>();
        let summary = get_batch_quality_summary(&members);
        approx::assert_ulps_eq!(summary.median_quality, 3.0);
        approx::assert_ulps_eq!(summary.p10_quality, 1.4, max_ulps = 4);
    }
}
