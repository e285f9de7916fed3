use strum::EnumCount;

use crate::genotype_class::GenotypeClass;

/// 2-vector in (allele_balance, copy_number) order
pub type Vec2 = [f64; 2];

/// Symmetric 2x2 matrix in (allele_balance, copy_number) order
pub type Mat2 = [[f64; 2]; 2];

/// Fixed per-class prior parameters
///
/// `pseudo_count` sets the weight of the prior mean against the observed class sample count, it
/// is shared by all classes.
///
#[derive(Clone, Debug)]
pub struct PriorTable {
    pub mean: [Vec2; GenotypeClass::COUNT],
    pub covariance: [Mat2; GenotypeClass::COUNT],
    pub pseudo_count: f64,
}

impl PriorTable {
    pub fn class_mean(&self, class: GenotypeClass) -> &Vec2 {
        &self.mean[class.index()]
    }

    pub fn class_covariance(&self, class: GenotypeClass) -> &Mat2 {
        &self.covariance[class.index()]
    }
}

const SHARED_PRIOR_COVARIANCE: [Mat2; GenotypeClass::COUNT] = [
    [[0.00128, -0.00075], [-0.00075, 1.1367]],
    [[0.013, -0.0196], [-0.0196, 0.4626]],
    [[0.0046, -0.0112], [-0.0112, 0.07556]],
];

/// Priors tuned for deletion and mobile element insertion genotypes
pub fn deletion_prior_table() -> PriorTable {
    PriorTable {
        mean: [[0.03, 2.0], [0.46, 1.1], [0.94, 0.1]],
        covariance: SHARED_PRIOR_COVARIANCE,
        pseudo_count: 1.0,
    }
}

/// Priors tuned for duplication genotypes
pub fn duplication_prior_table() -> PriorTable {
    PriorTable {
        mean: [[0.03, 2.0], [0.27, 3.0], [0.45, 4.0]],
        covariance: SHARED_PRIOR_COVARIANCE,
        pseudo_count: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_covariance_is_positive_definite() {
        for table in [deletion_prior_table(), duplication_prior_table()] {
            for cov in table.covariance.iter() {
                assert!(cov[0][0] > 0.0);
                assert_eq!(cov[0][1], cov[1][0]);
                assert!(cov[0][0] * cov[1][1] - cov[0][1] * cov[1][0] > 0.0);
            }
        }
    }

    #[test]
    fn test_prior_lookup() {
        let table = deletion_prior_table();
        assert_eq!(table.class_mean(GenotypeClass::HomAlt), &[0.94, 0.1]);
        let table = duplication_prior_table();
        assert_eq!(table.class_mean(GenotypeClass::Het), &[0.27, 3.0]);
        assert_eq!(
            table.class_covariance(GenotypeClass::HomRef),
            &SHARED_PRIOR_COVARIANCE[0]
        );
    }
}
