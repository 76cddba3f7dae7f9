use crate::constants::HESSIAN_EPS;
use crate::errors::GrowerError;

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), GrowerError> {
    validate_float_parameter(value, 0.0, f64::MAX, parameter)
}

/// Check `min <= value <= max`, NaN and infinities are always rejected.
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), GrowerError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(GrowerError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_usize_parameter(value: usize, min: usize, max: usize, parameter: &str) -> Result<(), GrowerError> {
    if value < min || max < value {
        let ex_msg = format!("integer within range {} and {}", min, max);
        Err(GrowerError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Calculate the weight of a given node, given the sum
/// of the gradients, and the hessians in a node.
/// Shrinkage is applied by the caller.
#[inline]
pub fn weight(gradient_sum: f64, hessian_sum: f64, l2_regularization: f64) -> f64 {
    -gradient_sum / (hessian_sum + l2_regularization + HESSIAN_EPS)
}

/// Calculate the gain given the gradient and hessian of the node.
/// No -0.5 multiplier, gains are only ranked and compared to thresholds.
#[inline]
pub fn gain(gradient_sum: f64, hessian_sum: f64, l2_regularization: f64) -> f64 {
    (gradient_sum * gradient_sum) / (hessian_sum + l2_regularization + HESSIAN_EPS)
}

/// Gain of splitting a parent into a left and right node.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn split_gain(
    left_gradient: f64,
    left_hessian: f64,
    right_gradient: f64,
    right_hessian: f64,
    gradient_sum: f64,
    hessian_sum: f64,
    l2_regularization: f64,
) -> f64 {
    gain(left_gradient, left_hessian, l2_regularization) + gain(right_gradient, right_hessian, l2_regularization)
        - gain(gradient_sum, hessian_sum, l2_regularization)
}

/// Partition an index in place around a split bin, so all of the
/// rows with a binned value less than or equal to `split_bin` come
/// first, and all other rows after them.
///
/// * `index` - The index values to pivot.
/// * `feature` - The binned feature to pivot the index by.
/// * `split_bin` - The last bin sent to the left.
///
/// Returns the number of rows sent to the left.
#[inline]
pub fn pivot_on_split(index: &mut [usize], feature: &[u16], split_bin: u16) -> usize {
    let mut left = 0;
    let mut right = index.len();
    while left < right {
        if feature[index[left]] <= split_bin {
            left += 1;
        } else {
            right -= 1;
            index.swap(left, right);
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::Rng;
    use rand::SeedableRng;

    #[test]
    fn test_validate_float_parameter() {
        assert!(validate_positive_float_parameter(0.0, "l2").is_ok());
        assert!(validate_positive_float_parameter(-0.1, "l2").is_err());
        assert!(validate_positive_float_parameter(f64::NAN, "l2").is_err());
        assert!(validate_positive_float_parameter(f64::INFINITY, "l2").is_err());
        assert!(validate_float_parameter(1.0, 0.5, 1.0, "shrinkage").is_ok());
        assert!(validate_usize_parameter(1, 2, 10, "max_leaf_nodes").is_err());
        assert!(validate_usize_parameter(2, 2, 10, "max_leaf_nodes").is_ok());
    }

    #[test]
    fn test_weight_and_gain() {
        assert_relative_eq!(weight(-10.0, 10.0, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(weight(4.0, 3.0, 1.0), -1.0, epsilon = 1e-12);
        assert_relative_eq!(gain(-10.0, 10.0, 0.0), 10.0, epsilon = 1e-12);
        // Degenerate hessians do not blow up.
        assert!(weight(0.0, 0.0, 0.0).is_finite());
        assert!(gain(0.0, 0.0, 0.0).is_finite());
        // A pure node has nothing to gain.
        assert_eq!(split_gain(-4.0, 4.0, -6.0, 6.0, -10.0, 10.0, 0.0), 0.0);
        assert!(split_gain(-4.0, 4.0, 6.0, 6.0, 2.0, 10.0, 0.0) > 0.0);
    }

    #[test]
    fn test_pivot() {
        fn pivot_assert(f: &[u16], idx: &[usize], split_i: usize, split_bin: u16) {
            if idx[..split_i].is_empty() {
                assert!(idx[split_i..].iter().all(|i| f[*i] > split_bin));
            } else if idx[split_i..].is_empty() {
                assert!(idx[..split_i].iter().all(|i| f[*i] <= split_bin));
            } else {
                assert!(idx[..split_i].iter().all(|i| f[*i] <= split_bin));
                assert!(idx[split_i..].iter().all(|i| f[*i] > split_bin));
            }
        }

        let mut idx = vec![2, 6, 9, 5, 8, 13, 11, 7];
        let f = vec![15, 10, 10, 11, 3, 18, 0, 9, 3, 5, 2, 6, 13, 19, 14];
        let split_i = pivot_on_split(&mut idx, &f, 10);
        pivot_assert(&f, &idx, split_i, 10);
        assert_eq!(split_i, 6);

        // Everything goes left.
        let mut idx = vec![2, 6, 9, 5];
        let split_i = pivot_on_split(&mut idx, &f, 100);
        assert_eq!(split_i, 4);

        // Only the zero bin goes left.
        let mut idx = vec![2, 6, 9, 5];
        let split_i = pivot_on_split(&mut idx, &f, 0);
        pivot_assert(&f, &idx, split_i, 0);
        assert_eq!(split_i, 1);

        let mut idx: Vec<usize> = Vec::new();
        assert_eq!(pivot_on_split(&mut idx, &f, 3), 0);

        // Randomized, the index keeps the same set of rows.
        let mut rng = StdRng::seed_from_u64(0);
        let f: Vec<u16> = (0..1000).map(|_| rng.gen_range(0..50)).collect();
        let mut idx: Vec<usize> = (0..1000).collect();
        idx.shuffle(&mut rng);
        let split_i = pivot_on_split(&mut idx, &f, 24);
        pivot_assert(&f, &idx, split_i, 24);
        let mut sorted = idx.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..1000).collect::<Vec<_>>());
    }
}
