//! Splitter
//!
//! Turns the histograms of a node into the single best `(feature, bin)` cut.
use crate::bin::Bin;
use crate::config::GrowerConfig;
use crate::data::Matrix;
use crate::histogram::{FeatureHistogram, NodeHistogram};
use crate::utils::{pivot_on_split, split_gain};
use rayon::{prelude::*, ThreadPool};
use serde::{Deserialize, Serialize};

/// Aggregated statistics of a set of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub sum_gradients: f64,
    pub sum_hessians: f64,
    pub count: usize,
}

impl NodeInfo {
    pub fn new(sum_gradients: f64, sum_hessians: f64, count: usize) -> Self {
        NodeInfo {
            sum_gradients,
            sum_hessians,
            count,
        }
    }

    pub fn from_bin(bin: &Bin) -> Self {
        NodeInfo::new(bin.sum_gradients, bin.sum_hessians, bin.count as usize)
    }
}

/// A candidate decision at a node.
///
/// Samples with a binned value `<= bin_idx` on `feature_idx` go left.
/// A gain of negative infinity means no valid split was found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitInfo {
    pub gain: f64,
    pub feature_idx: usize,
    pub bin_idx: u16,
    pub left: NodeInfo,
    pub right: NodeInfo,
}

impl Default for SplitInfo {
    fn default() -> Self {
        SplitInfo {
            gain: f64::NEG_INFINITY,
            feature_idx: 0,
            bin_idx: 0,
            left: NodeInfo::default(),
            right: NodeInfo::default(),
        }
    }
}

impl SplitInfo {
    /// Did the search find any split that satisfies the leaf constraints.
    pub fn is_valid(&self) -> bool {
        self.gain > f64::NEG_INFINITY
    }

    /// Strictly better gain, ties go to the lowest feature then the lowest bin.
    pub fn is_better_than(&self, other: &SplitInfo) -> bool {
        if self.gain != other.gain {
            return self.gain > other.gain;
        }
        (self.feature_idx, self.bin_idx) < (other.feature_idx, other.bin_idx)
    }
}

/// Scores candidate cuts, and applies the chosen one to a node's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splitter {
    pub l2_regularization: f64,
    pub min_samples_leaf: usize,
    pub min_hessian_to_split: f64,
}

impl Splitter {
    pub fn new(l2_regularization: f64, min_samples_leaf: usize, min_hessian_to_split: f64) -> Self {
        Splitter {
            l2_regularization,
            min_samples_leaf,
            min_hessian_to_split,
        }
    }

    pub fn from_config(cfg: &GrowerConfig) -> Self {
        Splitter::new(cfg.l2_regularization, cfg.min_samples_leaf, cfg.min_hessian_to_split)
    }

    /// Best cut of one feature.
    ///
    /// Walks the bins in increasing order, the left side is the running sum and
    /// the right side is whatever of `node` remains. Cuts leaving either side
    /// with too few samples, or too little hessian, are skipped.
    pub fn best_feature_split(&self, feature_idx: usize, hist_feat: &FeatureHistogram, node: &NodeInfo) -> SplitInfo {
        let mut best = SplitInfo {
            feature_idx,
            ..SplitInfo::default()
        };
        let mut left = NodeInfo::default();

        // The last bin would send every sample left.
        let n_cuts = hist_feat.data.len().saturating_sub(1);
        for (bin_idx, bin) in hist_feat.data.iter().take(n_cuts).enumerate() {
            left.sum_gradients += bin.sum_gradients;
            left.sum_hessians += bin.sum_hessians;
            left.count += bin.count as usize;

            if left.count < self.min_samples_leaf {
                continue;
            }
            let right = NodeInfo::new(
                node.sum_gradients - left.sum_gradients,
                node.sum_hessians - left.sum_hessians,
                node.count - left.count,
            );
            if right.count < self.min_samples_leaf {
                break;
            }
            if left.sum_hessians < self.min_hessian_to_split || right.sum_hessians < self.min_hessian_to_split {
                continue;
            }

            let gain = split_gain(
                left.sum_gradients,
                left.sum_hessians,
                right.sum_gradients,
                right.sum_hessians,
                node.sum_gradients,
                node.sum_hessians,
                self.l2_regularization,
            );
            // Strict comparison keeps the lowest bin on ties.
            if gain > best.gain {
                best.gain = gain;
                best.bin_idx = bin_idx as u16;
                best.left = left;
                best.right = right;
            }
        }
        best
    }

    /// Find the best possible split, considering all feature histograms.
    ///
    /// Features are searched in parallel on `pool`, the reduction runs in feature
    /// order so the result does not depend on scheduling.
    pub fn best_split(&self, hist: &NodeHistogram, node: &NodeInfo, pool: &ThreadPool) -> SplitInfo {
        let splits: Vec<SplitInfo> = if pool.current_num_threads() > 1 {
            pool.install(|| {
                hist.data
                    .par_iter()
                    .enumerate()
                    .map(|(feature_idx, h)| self.best_feature_split(feature_idx, h, node))
                    .collect()
            })
        } else {
            hist.data
                .iter()
                .enumerate()
                .map(|(feature_idx, h)| self.best_feature_split(feature_idx, h, node))
                .collect()
        };

        splits.into_iter().fold(SplitInfo::default(), |best, s| {
            if s.is_better_than(&best) {
                s
            } else {
                best
            }
        })
    }

    /// Pivot the rows of a node so the ones going left come first,
    /// returns how many rows went left.
    pub fn split_indices(&self, split_info: &SplitInfo, data: &Matrix<u16>, index: &mut [usize]) -> usize {
        pivot_on_split(index, data.get_col(split_info.feature_idx), split_info.bin_idx)
    }
}
