//! Predictor
//!
//! Compact, immutable form of a grown tree. Nodes are stored in pre-order,
//! the root sits at position 0 and every child sits after its parent.
use crate::data::{JaggedMatrix, Matrix};
use crate::errors::GrowerError;
use crate::node::{NodeState, TreeNode};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs;
use std::path::Path;

/// A node of the flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredictorNode {
    /// Rows with a bin `<= bin_threshold`, or a raw value `<= threshold`, go to `left`.
    Internal {
        feature_idx: usize,
        bin_threshold: u16,
        threshold: Option<f64>,
        left: usize,
        right: usize,
        gain: f64,
        count: usize,
        depth: usize,
    },
    Leaf {
        value: f64,
        count: usize,
        depth: usize,
    },
}

impl PredictorNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, PredictorNode::Leaf { .. })
    }

    pub fn depth(&self) -> usize {
        match self {
            PredictorNode::Internal { depth, .. } | PredictorNode::Leaf { depth, .. } => *depth,
        }
    }

    /// Number of training samples that reached this node.
    pub fn count(&self) -> usize {
        match self {
            PredictorNode::Internal { count, .. } | PredictorNode::Leaf { count, .. } => *count,
        }
    }
}

impl Display for PredictorNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PredictorNode::Internal {
                feature_idx,
                bin_threshold,
                threshold,
                left,
                right,
                gain,
                count,
                ..
            } => match threshold {
                Some(t) => write!(
                    f,
                    "[{} <= {} (bin {})] yes={},no={},gain={},count={}",
                    feature_idx, t, bin_threshold, left, right, gain, count
                ),
                None => write!(
                    f,
                    "[{} <= bin {}] yes={},no={},gain={},count={}",
                    feature_idx, bin_threshold, left, right, gain, count
                ),
            },
            PredictorNode::Leaf { value, count, .. } => write!(f, "leaf={},count={}", value, count),
        }
    }
}

/// Flattened tree, ready to predict binned or raw data.
///
/// Only built from a grown tree or from JSON, both check the layout so
/// prediction can always walk from the root to a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredictorNodes")]
pub struct Predictor {
    nodes: Vec<PredictorNode>,
}

/// Unchecked form of a deserialized predictor.
#[derive(Deserialize)]
struct PredictorNodes {
    nodes: Vec<PredictorNode>,
}

impl TryFrom<PredictorNodes> for Predictor {
    type Error = GrowerError;

    fn try_from(value: PredictorNodes) -> Result<Self, Self::Error> {
        let predictor = Predictor { nodes: value.nodes };
        predictor.validate()?;
        Ok(predictor)
    }
}

impl Predictor {
    /// Flatten an arena of grown nodes, rooted at node 0.
    ///
    /// * `nodes` - Arena of a fully grown tree, every node is internal or a leaf.
    /// * `numerical_thresholds` - Upper bound of each bin per feature, when
    ///   given every split also gets the raw threshold of its bin.
    pub fn from_nodes(nodes: &[TreeNode], numerical_thresholds: Option<&JaggedMatrix<f64>>) -> Result<Self, GrowerError> {
        let mut flat: Vec<PredictorNode> = Vec::with_capacity(nodes.len());
        // Arena id, and the position of the parent with the side it hangs from.
        let mut stack: Vec<(usize, Option<(usize, bool)>)> = vec![(0, None)];
        while let Some((num, parent)) = stack.pop() {
            let node = nodes.get(num).ok_or(GrowerError::GrowthNotFinished)?;
            let position = flat.len();
            if let Some((parent_position, is_left)) = parent {
                if let PredictorNode::Internal { left, right, .. } = &mut flat[parent_position] {
                    if is_left {
                        *left = position;
                    } else {
                        *right = position;
                    }
                }
            }
            match node.state {
                NodeState::Finalized { value } => flat.push(PredictorNode::Leaf {
                    value,
                    count: node.n_samples(),
                    depth: node.depth,
                }),
                NodeState::Internal { left_child, right_child } => {
                    let split_info = node.split_info.ok_or(GrowerError::GrowthNotFinished)?;
                    let threshold = match numerical_thresholds {
                        Some(thresholds) => Some(
                            thresholds
                                .try_get(split_info.feature_idx, usize::from(split_info.bin_idx))
                                .ok_or(GrowerError::MissingThreshold {
                                    feature: split_info.feature_idx,
                                    bin: split_info.bin_idx,
                                })?,
                        ),
                        None => None,
                    };
                    flat.push(PredictorNode::Internal {
                        feature_idx: split_info.feature_idx,
                        bin_threshold: split_info.bin_idx,
                        threshold,
                        left: 0,
                        right: 0,
                        gain: split_info.gain,
                        count: node.n_samples(),
                        depth: node.depth,
                    });
                    // Left is popped first, so its subtree follows the parent.
                    stack.push((right_child, Some((position, false))));
                    stack.push((left_child, Some((position, true))));
                }
                NodeState::Unexpanded | NodeState::Splittable => return Err(GrowerError::GrowthNotFinished),
            }
        }
        let predictor = Predictor { nodes: flat };
        predictor.validate()?;
        Ok(predictor)
    }

    /// Nodes in pre-order, the root first.
    pub fn nodes(&self) -> &[PredictorNode] {
        &self.nodes
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaf_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf, a lone root has depth 0.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth()).max().unwrap_or(0)
    }

    /// Can raw, not binned, values be predicted.
    pub fn has_thresholds(&self) -> bool {
        self.nodes.iter().all(|n| match n {
            PredictorNode::Internal { threshold, .. } => threshold.is_some(),
            PredictorNode::Leaf { .. } => true,
        })
    }

    /// Number of columns the data must have at least.
    fn n_features_required(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                PredictorNode::Internal { feature_idx, .. } => Some(feature_idx + 1),
                PredictorNode::Leaf { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }

    fn check_features(&self, cols: usize) -> Result<(), GrowerError> {
        let required = self.n_features_required();
        if cols < required {
            Err(GrowerError::FeatureCount(required, cols))
        } else {
            Ok(())
        }
    }

    fn predict_row(&self, data: &Matrix<f64>, row: usize) -> f64 {
        let mut node_idx = 0;
        loop {
            match &self.nodes[node_idx] {
                PredictorNode::Leaf { value, .. } => return *value,
                PredictorNode::Internal {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node_idx = match threshold {
                        Some(t) if *data.get(row, *feature_idx) <= *t => *left,
                        _ => *right,
                    }
                }
            }
        }
    }

    fn predict_row_binned(&self, data: &Matrix<u16>, row: usize) -> f64 {
        let mut node_idx = 0;
        loop {
            match &self.nodes[node_idx] {
                PredictorNode::Leaf { value, .. } => return *value,
                PredictorNode::Internal {
                    feature_idx,
                    bin_threshold,
                    left,
                    right,
                    ..
                } => {
                    node_idx = if *data.get(row, *feature_idx) <= *bin_threshold {
                        *left
                    } else {
                        *right
                    }
                }
            }
        }
    }

    /// Predict the value of a single row of raw features.
    pub fn predict_row_from_row_slice(&self, row: &[f64]) -> Result<f64, GrowerError> {
        if !self.has_thresholds() {
            return Err(GrowerError::MissingThresholds);
        }
        self.check_features(row.len())?;
        let data = Matrix::new(row, 1, row.len());
        Ok(self.predict_row(&data, 0))
    }

    /// Predict raw feature values, compared to the numerical thresholds.
    ///
    /// * `data` - Raw features, one column per feature.
    /// * `parallel` - Predict rows in parallel on the current rayon pool. That is the
    ///   global pool, unless called inside `ThreadPool::install`, for example on the
    ///   pool built by `GrowerConfig::build_pool`.
    pub fn predict(&self, data: &Matrix<f64>, parallel: bool) -> Result<Vec<f64>, GrowerError> {
        if !self.has_thresholds() {
            return Err(GrowerError::MissingThresholds);
        }
        self.check_features(data.cols)?;
        let preds = if parallel {
            data.index.par_iter().map(|i| self.predict_row(data, *i)).collect()
        } else {
            data.index.iter().map(|i| self.predict_row(data, *i)).collect()
        };
        Ok(preds)
    }

    /// Predict binned features, compared to the bin thresholds.
    ///
    /// `parallel` runs on the current rayon pool, like [`Predictor::predict`].
    pub fn predict_binned(&self, data: &Matrix<u16>, parallel: bool) -> Result<Vec<f64>, GrowerError> {
        self.check_features(data.cols)?;
        let preds = if parallel {
            data.index
                .par_iter()
                .map(|i| self.predict_row_binned(data, *i))
                .collect()
        } else {
            data.index.iter().map(|i| self.predict_row_binned(data, *i)).collect()
        };
        Ok(preds)
    }

    /// Check the layout is a tree the prediction loop can walk.
    fn validate(&self) -> Result<(), GrowerError> {
        if self.nodes.is_empty() {
            return Err(GrowerError::UnableToRead("predictor has no nodes".to_string()));
        }
        for (position, node) in self.nodes.iter().enumerate() {
            if let PredictorNode::Internal { left, right, .. } = node {
                for child in [left, right] {
                    if *child <= position || *child >= self.nodes.len() {
                        return Err(GrowerError::UnableToRead(format!(
                            "node {} points to invalid child {}",
                            position, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Dump a predictor as a json object
    pub fn json_dump(&self) -> Result<String, GrowerError> {
        serde_json::to_string(self).map_err(|e| GrowerError::UnableToWrite(e.to_string()))
    }

    /// Load a predictor from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    pub fn from_json(json_str: &str) -> Result<Self, GrowerError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| GrowerError::UnableToRead(e.to_string()))
    }

    /// Save a predictor as a json object to a file.
    ///
    /// * `path` - Path to save predictor.
    pub fn save_predictor<P: AsRef<Path>>(&self, path: P) -> Result<(), GrowerError> {
        fs::write(path, self.json_dump()?).map_err(|e| GrowerError::UnableToWrite(e.to_string()))
    }

    /// Load a predictor from a path to a json predictor object.
    pub fn load_predictor<P: AsRef<Path>>(path: P) -> Result<Self, GrowerError> {
        let json_str = fs::read_to_string(path).map_err(|e| GrowerError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl Display for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut r = String::new();
        for (position, node) in self.nodes.iter().enumerate() {
            r += format!("{}{}:{}\n", "      ".repeat(node.depth()).as_str(), position, node).as_str();
        }
        write!(f, "{}", r)
    }
}
