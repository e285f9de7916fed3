use num::{Float, NumCast};

fn sorted_finite<F: Float>(values: &[F]) -> Vec<F> {
    let mut x = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect::<Vec<_>>();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap());
    x
}

/// Linear interpolation between the closest order statistics of the sorted input
///
fn interpolated_quantile<F: Float>(sorted: &[F], q: f64) -> Option<F> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac: F = NumCast::from(pos - lo as f64).unwrap();
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Quantile of the input values, linearly interpolated between order statistics
///
/// NaN values are skipped. Returns None if no values remain.
///
pub fn quantile<F: Float>(values: &[F], q: f64) -> Option<F> {
    interpolated_quantile(&sorted_finite(values), q)
}

/// Median of the input values, using the mean of the two central values for even-sized input
///
/// NaN values are skipped. Returns None if no values remain.
///
pub fn median<F: Float>(values: &[F]) -> Option<F> {
    quantile(values, 0.5)
}

/// Index of the maximum value, with ties resolved to the lowest index
///
pub fn arg_max<F: Float>(values: &[F]) -> Option<usize> {
    let mut max_index = None;
    let mut max_value = F::neg_infinity();
    for (index, value) in values.iter().enumerate() {
        if max_index.is_none() || *value > max_value {
            max_index = Some(index);
            max_value = *value;
        }
    }
    max_index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median::<f64>(&[]), None);
        approx::assert_ulps_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        approx::assert_ulps_eq!(median(&[4.0, 1.0, 2.0, 3.0]).unwrap(), 2.5);
        approx::assert_ulps_eq!(median(&[f64::NAN, 1.0, 5.0]).unwrap(), 3.0);
        assert_eq!(
            median(&[f64::NEG_INFINITY, -1.0, f64::NEG_INFINITY]),
            Some(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_quantile() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0];
        approx::assert_ulps_eq!(quantile(&x, 0.1).unwrap(), 2.0);

        let x = [10.0f64, 0.0, 20.0, 30.0];
        // pos = 0.3, interpolate between 0 and 10
        approx::assert_ulps_eq!(quantile(&x, 0.1).unwrap(), 3.0, max_ulps = 4);

        approx::assert_ulps_eq!(quantile(&[7.0], 0.1).unwrap(), 7.0);
    }

    #[test]
    fn test_arg_max() {
        assert_eq!(arg_max::<f64>(&[]), None);
        assert_eq!(arg_max(&[1.0, 3.0, 2.0]), Some(1));
        assert_eq!(arg_max(&[2.0, 2.0, 2.0]), Some(0));
        assert_eq!(arg_max(&[1.0, 2.0, 2.0]), Some(1));
        assert_eq!(arg_max(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), Some(0));
    }
}
