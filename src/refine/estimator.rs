use statrs::statistics::Statistics;
use strum::EnumCount;

use super::batch_partition::BatchMember;
use super::priors::{Mat2, PriorTable, Vec2};
use crate::genotype_class::{ALL_GENOTYPE_CLASSES, GenotypeClass};

/// Class sample count at or below which the prior covariance is used without modification
const MAX_PRIOR_ONLY_COVARIANCE_COUNT: usize = 2;

/// Posterior-like Gaussian parameters for one genotype class
#[derive(Clone, Debug, PartialEq)]
pub struct ClassParameters {
    pub mean: Vec2,
    pub covariance: Mat2,

    /// Number of batch members assigned to this class in the estimator input
    pub sample_count: usize,
}

/// Sample mean and unbiased sample covariance of a set of signal vectors
///
/// Covariance is None for fewer than two observations
///
fn get_sample_moments(ab: &[f64], cn: &[f64]) -> (Vec2, Option<Mat2>) {
    let mean = [ab.iter().mean(), cn.iter().mean()];
    let covariance = if ab.len() < 2 {
        None
    } else {
        let ab_cn = ab.iter().covariance(cn.iter());
        Some([
            [ab.iter().variance(), ab_cn],
            [ab_cn, cn.iter().variance()],
        ])
    };
    (mean, covariance)
}

fn get_class_parameters(
    class: GenotypeClass,
    members: &[BatchMember],
    classes: &[Option<GenotypeClass>],
    prior: &PriorTable,
) -> ClassParameters {
    let (ab, cn): (Vec<f64>, Vec<f64>) = members
        .iter()
        .zip(classes.iter())
        .filter(|(_, c)| **c == Some(class))
        .map(|(x, _)| (x.signal.allele_balance, x.signal.copy_number))
        .unzip();

    let n = ab.len();
    let prior_mean = prior.class_mean(class);
    let prior_cov = prior.class_covariance(class);
    if n == 0 {
        return ClassParameters {
            mean: *prior_mean,
            covariance: *prior_cov,
            sample_count: 0,
        };
    }

    let (sample_mean, sample_cov) = get_sample_moments(&ab, &cn);
    let nf = n as f64;
    let l0 = prior.pseudo_count;

    let mut mean = [0.0; 2];
    for i in 0..2 {
        mean[i] = (l0 * prior_mean[i] + nf * sample_mean[i]) / (l0 + nf);
    }

    let covariance = match sample_cov {
        Some(sample_cov) if n > MAX_PRIOR_ONLY_COVARIANCE_COUNT => {
            let delta = [
                sample_mean[0] - prior_mean[0],
                sample_mean[1] - prior_mean[1],
            ];
            let shift_weight = l0 * nf / (l0 + nf);
            let mut cov = [[0.0; 2]; 2];
            for i in 0..2 {
                for j in 0..2 {
                    cov[i][j] =
                        sample_cov[i][j] + shift_weight * delta[i] * delta[j] + prior_cov[i][j];
                }
            }
            cov
        }
        _ => *prior_cov,
    };

    ClassParameters {
        mean,
        covariance,
        sample_count: n,
    }
}

/// Estimate Gaussian parameters for every genotype class in one batch group
///
/// Each class's parameters shrink the observed class mean and covariance toward the prior. Empty
/// classes inherit the prior mean and covariance, and sparse classes inherit the prior covariance.
///
/// # Arguments
/// * `classes` - Estimator input class for each member in `members`. Members without a class do not
///   contribute to any class estimate.
///
pub fn estimate_class_parameters(
    members: &[BatchMember],
    classes: &[Option<GenotypeClass>],
    prior: &PriorTable,
) -> [ClassParameters; GenotypeClass::COUNT] {
    assert_eq!(members.len(), classes.len());
    ALL_GENOTYPE_CLASSES.map(|class| get_class_parameters(class, members, classes, prior))
}
