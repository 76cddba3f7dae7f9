//! Histogram
//!
//! Histogram calculations for finding optimal splits.
//! Histograms store aggregated gradient and hessian statistics for each bin
//! of each feature, for the samples of a single node.
use crate::bin::Bin;
use crate::constants::MIN_PARALLEL_SAMPLES;
use crate::data::{Hessians, Matrix};
use rayon::{prelude::*, ThreadPool};

/// Histogram of a single feature, indexed by bin.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHistogram {
    /// The histogram data (bins).
    pub data: Vec<Bin>,
}

impl FeatureHistogram {
    /// Create an empty histogram with `n_bins` bins.
    pub fn empty(n_bins: usize) -> Self {
        FeatureHistogram {
            data: vec![Bin::empty(); n_bins],
        }
    }

    /// Reset the histogram, and accumulate the samples in `index` into it.
    ///
    /// # Arguments
    /// * `feature`: The binned values of this feature, for every row.
    /// * `grad`: The full gradient array (absolute indexing via `index`).
    /// * `hess`: The hessian source (absolute indexing via `index`).
    /// * `index`: The rows belonging to the node.
    ///
    /// Every value of `feature` referenced by `index` must be a valid bin.
    pub fn update(&mut self, feature: &[u16], grad: &[f32], hess: Hessians, index: &[usize]) {
        self.data.iter_mut().for_each(|b| *b = Bin::empty());
        if hess.is_constant() {
            for &i in index {
                self.data[usize::from(feature[i])].add_gradient(grad[i]);
            }
            // Any row gives the shared value.
            let h = f64::from(hess.get(0));
            self.data
                .iter_mut()
                .for_each(|b| b.sum_hessians = h * f64::from(b.count));
        } else {
            for &i in index {
                self.data[usize::from(feature[i])].add(grad[i], hess.get(i));
            }
        }
    }

    /// Build a sibling histogram as `parent - child`.
    pub fn from_parent_child(parent: &FeatureHistogram, child: &FeatureHistogram) -> Self {
        FeatureHistogram {
            data: parent
                .data
                .iter()
                .zip(child.data.iter())
                .map(|(p, c)| Bin::from_parent_child(p, c))
                .collect(),
        }
    }

    /// Totals across all bins.
    pub fn total(&self) -> Bin {
        self.data.iter().fold(Bin::empty(), |mut acc, b| {
            acc.sum_gradients += b.sum_gradients;
            acc.sum_hessians += b.sum_hessians;
            acc.count += b.count;
            acc
        })
    }
}

/// Histograms of every feature, for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHistogram {
    /// One histogram per feature.
    pub data: Vec<FeatureHistogram>,
}

impl NodeHistogram {
    /// Create empty histograms, feature `j` gets `n_bins_per_feature[j]` bins.
    pub fn empty(n_bins_per_feature: &[usize]) -> Self {
        NodeHistogram {
            data: n_bins_per_feature.iter().map(|n| FeatureHistogram::empty(*n)).collect(),
        }
    }

    /// Build a sibling node's histograms, as `parent - child`.
    pub fn from_parent_child(parent: &NodeHistogram, child: &NodeHistogram) -> Self {
        NodeHistogram {
            data: parent
                .data
                .iter()
                .zip(child.data.iter())
                .map(|(p, c)| FeatureHistogram::from_parent_child(p, c))
                .collect(),
        }
    }
}

/// Update the histogram with new data.
///
/// Features are accumulated in parallel on `pool` when the node is large
/// enough for the work to pay off. Every feature histogram is written by a
/// single worker, so no merge is needed.
pub fn update_histogram(
    hist: &mut NodeHistogram,
    data: &Matrix<u16>,
    grad: &[f32],
    hess: Hessians,
    index: &[usize],
    pool: &ThreadPool,
) {
    if pool.current_num_threads() > 1 && index.len() >= MIN_PARALLEL_SAMPLES {
        pool.install(|| {
            hist.data
                .par_iter_mut()
                .enumerate()
                .for_each(|(col, h)| h.update(data.get_col(col), grad, hess, index));
        });
    } else {
        hist.data
            .iter_mut()
            .enumerate()
            .for_each(|(col, h)| h.update(data.get_col(col), grad, hess, index));
    }
}

/// Create and fill the histograms of a node in one go.
pub fn build_histogram(
    n_bins_per_feature: &[usize],
    data: &Matrix<u16>,
    grad: &[f32],
    hess: Hessians,
    index: &[usize],
    pool: &ThreadPool,
) -> NodeHistogram {
    let mut hist = NodeHistogram::empty(n_bins_per_feature);
    update_histogram(&mut hist, data, grad, hess, index, pool);
    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn pool(n: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(n).build().unwrap()
    }

    #[test]
    fn test_simple_histogram() {
        // Column 0: 0, 1, 1, 2, 2, 2
        // Column 1: 1, 1, 0, 0, 0, 1
        let data_vec: Vec<u16> = vec![0, 1, 1, 2, 2, 2, 1, 1, 0, 0, 0, 1];
        let data = Matrix::new(&data_vec, 6, 2);
        let grad = vec![1.0, -1.0, 0.5, 2.0, 2.0, -0.5];
        let hess = vec![1.0, 2.0, 1.0, 0.5, 0.5, 1.0];

        let mut hist = NodeHistogram::empty(&[3, 2]);
        update_histogram(&mut hist, &data, &grad, Hessians::PerSample(&hess), &data.index, &pool(1));

        let f0 = &hist.data[0].data;
        assert_eq!(f0[0].count, 1);
        assert_eq!(f0[1].count, 2);
        assert_eq!(f0[2].count, 3);
        assert_relative_eq!(f0[1].sum_gradients, -0.5);
        assert_relative_eq!(f0[1].sum_hessians, 3.0);
        assert_relative_eq!(f0[2].sum_gradients, 3.5);
        assert_relative_eq!(f0[2].sum_hessians, 2.0);

        let f1 = &hist.data[1].data;
        assert_eq!(f1[0].count, 3);
        assert_eq!(f1[1].count, 3);
        assert_relative_eq!(f1[0].sum_gradients, 4.5);
        assert_relative_eq!(f1[1].sum_gradients, -0.5);

        // Every feature sees the same totals.
        let t0 = hist.data[0].total();
        let t1 = hist.data[1].total();
        assert_eq!(t0.count, 6);
        assert_relative_eq!(t0.sum_gradients, t1.sum_gradients);
        assert_relative_eq!(t0.sum_hessians, t1.sum_hessians);
    }

    #[test]
    fn test_histogram_subset_and_empty() {
        let data_vec: Vec<u16> = vec![0, 1, 1, 2];
        let data = Matrix::new(&data_vec, 4, 1);
        let grad = vec![1.0, 2.0, 3.0, 4.0];

        let hist = build_histogram(&[3], &data, &grad, Hessians::Constant(1.0), &[1, 3], &pool(1));
        assert_eq!(hist.data[0].data[0].count, 0);
        assert_eq!(hist.data[0].data[1].count, 1);
        assert_relative_eq!(hist.data[0].data[1].sum_gradients, 2.0);
        assert_relative_eq!(hist.data[0].data[2].sum_gradients, 4.0);

        let hist = build_histogram(&[3], &data, &grad, Hessians::Constant(1.0), &[], &pool(1));
        assert!(hist.data[0].data.iter().all(|b| *b == Bin::empty()));
    }

    #[test]
    fn test_constant_hessian_matches_per_sample() {
        let mut rng = StdRng::seed_from_u64(0);
        let rows = 1000;
        let data_vec: Vec<u16> = (0..(rows * 3)).map(|_| rng.gen_range(0..16)).collect();
        let data = Matrix::new(&data_vec, rows, 3);
        let grad: Vec<f32> = (0..rows).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hess = vec![0.25_f32; rows];

        let n_bins = [16, 16, 16];
        let constant = build_histogram(&n_bins, &data, &grad, Hessians::Constant(0.25), &data.index, &pool(1));
        let per_sample = build_histogram(&n_bins, &data, &grad, Hessians::PerSample(&hess), &data.index, &pool(1));
        for (c, p) in constant.data.iter().zip(per_sample.data.iter()) {
            for (cb, pb) in c.data.iter().zip(p.data.iter()) {
                assert_eq!(cb.count, pb.count);
                assert_relative_eq!(cb.sum_gradients, pb.sum_gradients);
                assert_relative_eq!(cb.sum_hessians, pb.sum_hessians, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_histogram_subtraction() {
        let mut rng = StdRng::seed_from_u64(1);
        let rows = 2000;
        let data_vec: Vec<u16> = (0..(rows * 2)).map(|_| rng.gen_range(0..8)).collect();
        let data = Matrix::new(&data_vec, rows, 2);
        let grad: Vec<f32> = (0..rows).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hess: Vec<f32> = (0..rows).map(|_| rng.gen_range(0.1..1.0)).collect();
        let hess = Hessians::PerSample(&hess);
        let n_bins = [8, 8];
        let p = pool(1);

        let (left, right): (Vec<usize>, Vec<usize>) = data.index.iter().partition(|i| *i % 3 == 0);
        let parent = build_histogram(&n_bins, &data, &grad, hess, &data.index, &p);
        let left_hist = build_histogram(&n_bins, &data, &grad, hess, &left, &p);
        let right_hist = build_histogram(&n_bins, &data, &grad, hess, &right, &p);
        let derived = NodeHistogram::from_parent_child(&parent, &left_hist);

        for (d, r) in derived.data.iter().zip(right_hist.data.iter()) {
            for (db, rb) in d.data.iter().zip(r.data.iter()) {
                assert_eq!(db.count, rb.count);
                assert_relative_eq!(db.sum_gradients, rb.sum_gradients, epsilon = 1e-9);
                assert_relative_eq!(db.sum_hessians, rb.sum_hessians, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_histogram_parallel() {
        let mut rng = StdRng::seed_from_u64(2);
        let rows = 5000;
        let cols = 4;
        let data_vec: Vec<u16> = (0..(rows * cols)).map(|_| rng.gen_range(0..32)).collect();
        let data = Matrix::new(&data_vec, rows, cols);
        let grad: Vec<f32> = (0..rows).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let n_bins = vec![32; cols];

        let single = build_histogram(&n_bins, &data, &grad, Hessians::Constant(1.0), &data.index, &pool(1));
        let multi = build_histogram(&n_bins, &data, &grad, Hessians::Constant(1.0), &data.index, &pool(4));
        assert_eq!(single, multi);
    }
}
