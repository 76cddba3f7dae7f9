//! Tree
//!
//! Best-first growth of a single regression tree on pre-binned data.
//!
//! The grower owns every node of the tree in an arena, and one partition
//! buffer holding every sample index. Each node owns a contiguous range of
//! that buffer, splitting a node pivots its range in place so the two
//! children own the two halves.
use crate::config::GrowerConfig;
use crate::data::{Hessians, JaggedMatrix, Matrix};
use crate::errors::GrowerError;
use crate::grower::Grower;
use crate::histogram::{build_histogram, NodeHistogram};
use crate::node::{NodeState, SplittableNode, TreeNode};
use crate::predictor::Predictor;
use crate::splitter::{NodeInfo, Splitter};
use crate::utils::{validate_usize_parameter, weight};
use hashbrown::HashMap;
use log::{debug, info};
use rayon::ThreadPool;
use std::collections::BinaryHeap;
use std::fmt::{self, Display};
use std::time::{Duration, Instant};

/// Grows one tree from binned data, gradients and hessians.
///
/// The root is evaluated on construction. Each call to [`TreeGrower::split_next`]
/// applies the split with the highest gain among all nodes waiting in the queue,
/// and [`TreeGrower::grow`] repeats that until nothing is left to split.
pub struct TreeGrower<'a> {
    data: &'a Matrix<'a, u16>,
    gradients: &'a [f32],
    hessians: Hessians<'a>,
    cfg: GrowerConfig,
    splitter: Splitter,
    pool: &'a ThreadPool,
    n_bins_per_feature: Vec<usize>,
    index: Vec<usize>,
    nodes: Vec<TreeNode>,
    histograms: HashMap<usize, NodeHistogram>,
    splittable: BinaryHeap<SplittableNode>,
    finalized_leaves: Vec<usize>,
    /// Time spent building histograms and searching for splits.
    pub total_find_split_time: Duration,
    /// Time spent partitioning sample indices.
    pub total_apply_split_time: Duration,
}

impl<'a> TreeGrower<'a> {
    /// Create a grower, and evaluate the root node.
    ///
    /// * `data` - Binned features, column-major, one column per feature.
    /// * `gradients` - One gradient per row of `data`.
    /// * `hessians` - Either a constant, or one hessian per row of `data`.
    /// * `n_bins_per_feature` - Number of bins each feature uses, every feature
    ///   gets `cfg.max_bins` when `None`.
    /// * `cfg` - Growth parameters.
    /// * `pool` - Thread pool histograms and split searches run on.
    pub fn new(
        data: &'a Matrix<'a, u16>,
        gradients: &'a [f32],
        hessians: Hessians<'a>,
        n_bins_per_feature: Option<&[usize]>,
        cfg: GrowerConfig,
        pool: &'a ThreadPool,
    ) -> Result<Self, GrowerError> {
        cfg.validate()?;
        if gradients.len() != data.rows {
            return Err(GrowerError::GradientLength(gradients.len(), data.rows));
        }
        if let Some(n_hessians) = hessians.len() {
            if n_hessians != data.rows {
                return Err(GrowerError::HessianLength(n_hessians, data.rows));
            }
        }
        let n_bins_per_feature = match n_bins_per_feature {
            Some(n_bins) => {
                if n_bins.len() != data.cols {
                    return Err(GrowerError::FeatureCount(data.cols, n_bins.len()));
                }
                for n in n_bins {
                    validate_usize_parameter(*n, 1, cfg.max_bins, "n_bins_per_feature")?;
                }
                n_bins.to_vec()
            }
            None => vec![cfg.max_bins; data.cols],
        };
        check_bins(data, &n_bins_per_feature)?;

        let index: Vec<usize> = (0..data.rows).collect();
        let root_info = NodeInfo::new(
            gradients.iter().map(|g| f64::from(*g)).sum(),
            hessians.sum(&index),
            index.len(),
        );

        let mut grower = TreeGrower {
            data,
            gradients,
            hessians,
            splitter: Splitter::from_config(&cfg),
            cfg,
            pool,
            n_bins_per_feature,
            nodes: vec![TreeNode::new(0, 0, 0, index.len(), &root_info, None)],
            index,
            histograms: HashMap::new(),
            splittable: BinaryHeap::new(),
            finalized_leaves: Vec::new(),
            total_find_split_time: Duration::ZERO,
            total_apply_split_time: Duration::ZERO,
        };
        grower.intake(0, None);
        Ok(grower)
    }

    /// Grow the tree until no node can be split any further.
    pub fn grow(&mut self) -> Result<(), GrowerError> {
        while self.can_split_further() {
            self.split_next()?;
        }
        info!(
            "Grew a tree with {} leaves, depth {} and {} nodes. Finding splits took {:.3}s, applying them took {:.3}s.",
            self.n_leaf_nodes(),
            self.max_depth(),
            self.nodes.len(),
            self.total_find_split_time.as_secs_f64(),
            self.total_apply_split_time.as_secs_f64()
        );
        Ok(())
    }

    /// Apply the best split of the highest gain node in the queue.
    ///
    /// Returns the arena ids of the new left and right children.
    pub fn split_next(&mut self) -> Result<(usize, usize), GrowerError> {
        let next = self.splittable.get_next_node().ok_or(GrowerError::NothingToSplit)?;
        let num = next.num;
        let (depth, start, stop) = {
            let node = &self.nodes[num];
            (node.depth, node.start_idx, node.stop_idx)
        };
        let split_info = self.nodes[num].split_info.ok_or(GrowerError::NothingToSplit)?;

        let tic = Instant::now();
        let n_left = self
            .splitter
            .split_indices(&split_info, self.data, &mut self.index[start..stop]);
        self.total_apply_split_time += tic.elapsed();
        debug_assert_eq!(n_left, split_info.left.count);
        let mid = start + n_left;

        let left_child = self.nodes.len();
        let right_child = left_child + 1;
        self.nodes
            .push(TreeNode::new(left_child, depth + 1, start, mid, &split_info.left, Some(num)));
        self.nodes
            .push(TreeNode::new(right_child, depth + 1, mid, stop, &split_info.right, Some(num)));
        self.nodes[num].state = NodeState::Internal { left_child, right_child };
        let parent_hist = self.histograms.remove(&num);

        debug!(
            "Split node {} on feature {} at bin {} with gain {:.6}, {} samples left and {} right.",
            num,
            split_info.feature_idx,
            split_info.bin_idx,
            split_info.gain,
            n_left,
            stop - mid
        );

        if let Some(max_leaf_nodes) = self.cfg.max_leaf_nodes {
            if self.finalized_leaves.len() + self.splittable.n_nodes() + 2 >= max_leaf_nodes {
                self.finalize_leaf(left_child);
                self.finalize_leaf(right_child);
                self.finalize_splittable_nodes();
                debug!("Reached {} leaves, every remaining node is now a leaf.", max_leaf_nodes);
                return Ok((left_child, right_child));
            }
        }

        let (left_hist, right_hist) = self.children_histograms(parent_hist, left_child, right_child);
        self.intake(left_child, left_hist);
        self.intake(right_child, right_hist);
        Ok((left_child, right_child))
    }

    /// Are there nodes left in the queue.
    pub fn can_split_further(&self) -> bool {
        !self.splittable.is_empty()
    }

    /// Histograms of both children, when both of them will be searched.
    ///
    /// Only the smaller child is accumulated from its samples, the other is
    /// derived from the parent.
    fn children_histograms(
        &mut self,
        parent_hist: Option<NodeHistogram>,
        left_child: usize,
        right_child: usize,
    ) -> (Option<NodeHistogram>, Option<NodeHistogram>) {
        let parent = match parent_hist {
            Some(parent) if self.can_expand(left_child) && self.can_expand(right_child) => parent,
            _ => return (None, None),
        };
        let tic = Instant::now();
        let left_is_smaller = self.nodes[left_child].n_samples() <= self.nodes[right_child].n_samples();
        let small = if left_is_smaller { left_child } else { right_child };
        let small_hist = self.node_histogram(small);
        let large_hist = NodeHistogram::from_parent_child(&parent, &small_hist);
        self.total_find_split_time += tic.elapsed();
        if left_is_smaller {
            (Some(small_hist), Some(large_hist))
        } else {
            (Some(large_hist), Some(small_hist))
        }
    }

    /// Evaluate a new node, it either joins the queue or becomes a leaf.
    fn intake(&mut self, num: usize, hist: Option<NodeHistogram>) {
        if !self.can_expand(num) {
            self.finalize_leaf(num);
            return;
        }
        let tic = Instant::now();
        let hist = match hist {
            Some(hist) => hist,
            None => self.node_histogram(num),
        };
        let split_info = self
            .splitter
            .best_split(&hist, &self.nodes[num].node_info(), self.pool);
        self.total_find_split_time += tic.elapsed();

        self.nodes[num].split_info = Some(split_info);
        if split_info.gain > 0.0 && split_info.gain >= self.cfg.min_gain_to_split {
            self.nodes[num].state = NodeState::Splittable;
            self.histograms.insert(num, hist);
            self.splittable.add_node(SplittableNode {
                num,
                gain: split_info.gain,
            });
        } else {
            self.finalize_leaf(num);
        }
    }

    /// Can the node possibly hold a split that respects the depth and leaf constraints.
    fn can_expand(&self, num: usize) -> bool {
        let node = &self.nodes[num];
        if let Some(max_depth) = self.cfg.max_depth {
            if node.depth >= max_depth {
                return false;
            }
        }
        node.n_samples() >= 2 * self.cfg.min_samples_leaf
            && node.sum_hessians >= 2.0 * self.cfg.min_hessian_to_split
    }

    fn node_histogram(&self, num: usize) -> NodeHistogram {
        build_histogram(
            &self.n_bins_per_feature,
            self.data,
            self.gradients,
            self.hessians,
            self.sample_indices(num),
            self.pool,
        )
    }

    fn finalize_leaf(&mut self, num: usize) {
        let node = &mut self.nodes[num];
        let value = self.cfg.shrinkage * weight(node.sum_gradients, node.sum_hessians, self.cfg.l2_regularization);
        node.state = NodeState::Finalized { value };
        self.histograms.remove(&num);
        self.finalized_leaves.push(num);
    }

    fn finalize_splittable_nodes(&mut self) {
        while let Some(node) = self.splittable.get_next_node() {
            self.finalize_leaf(node.num);
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Node with the given arena id.
    pub fn node(&self, num: usize) -> Option<&TreeNode> {
        self.nodes.get(num)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// The rows of a node, panics if `num` is not a node of this tree.
    pub fn sample_indices(&self, num: usize) -> &[usize] {
        let node = &self.nodes[num];
        &self.index[node.start_idx..node.stop_idx]
    }

    /// Leaves in the order they were finalized.
    pub fn finalized_leaves(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.finalized_leaves.iter().map(move |num| &self.nodes[*num])
    }

    /// Value and rows of every finalized leaf, in the order they were finalized.
    pub fn leaves_data(&self) -> Vec<(f64, &[usize])> {
        self.finalized_leaves()
            .filter_map(|node| node.value().map(|value| (value, self.sample_indices(node.num))))
            .collect()
    }

    pub fn n_splittable_nodes(&self) -> usize {
        self.splittable.n_nodes()
    }

    pub fn n_leaf_nodes(&self) -> usize {
        self.finalized_leaves.len()
    }

    /// Deepest depth reached by any node.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Add the value of each leaf to the raw predictions of its training rows.
    pub fn update_raw_predictions(&self, raw_predictions: &mut [f64]) -> Result<(), GrowerError> {
        if raw_predictions.len() != self.data.rows {
            return Err(GrowerError::PredictionLength(raw_predictions.len(), self.data.rows));
        }
        for (value, rows) in self.leaves_data() {
            for row in rows {
                raw_predictions[*row] += value;
            }
        }
        Ok(())
    }

    /// Flatten the grown tree into a predictor.
    ///
    /// * `numerical_thresholds` - Upper bound of every bin of every feature, required
    ///   to predict raw values. Without them the predictor only handles binned data.
    pub fn make_predictor(&self, numerical_thresholds: Option<&JaggedMatrix<f64>>) -> Result<Predictor, GrowerError> {
        if self.can_split_further() {
            return Err(GrowerError::GrowthNotFinished);
        }
        Predictor::from_nodes(&self.nodes, numerical_thresholds)
    }
}

/// Every binned value must fit in the bins declared for its feature.
fn check_bins(data: &Matrix<u16>, n_bins_per_feature: &[usize]) -> Result<(), GrowerError> {
    for (feature, n_bins) in n_bins_per_feature.iter().enumerate() {
        if let Some(code) = data.get_col(feature).iter().find(|v| usize::from(**v) >= *n_bins) {
            return Err(GrowerError::BinOutOfRange {
                feature,
                code: *code,
                n_bins: *n_bins,
            });
        }
    }
    Ok(())
}

impl<'a> Display for TreeGrower<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<usize> = vec![0];
        let mut r = String::new();
        while let Some(idx) = print_buffer.pop() {
            let node = &self.nodes[idx];
            r += format!("{}{}\n", "      ".repeat(node.depth).as_str(), node).as_str();
            if let NodeState::Internal { left_child, right_child } = node.state {
                print_buffer.push(right_child);
                print_buffer.push(left_child);
            }
        }
        write!(f, "{}", r)
    }
}
