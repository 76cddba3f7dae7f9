//! Grower Configuration
//!
//! Parameters controlling how a single tree is grown, with their defaults,
//! builder style setters, and validation.
use crate::constants::{DEFAULT_MAX_BINS, DEFAULT_MIN_HESSIAN_TO_SPLIT, DEFAULT_MIN_SAMPLES_LEAF, MAX_BINS_LIMIT};
use crate::errors::GrowerError;
use crate::utils::{validate_float_parameter, validate_positive_float_parameter, validate_usize_parameter};
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_max_bins() -> usize {
    DEFAULT_MAX_BINS
}
fn default_min_samples_leaf() -> usize {
    DEFAULT_MIN_SAMPLES_LEAF
}
fn default_min_hessian_to_split() -> f64 {
    DEFAULT_MIN_HESSIAN_TO_SPLIT
}
fn default_shrinkage() -> f64 {
    1.0
}

/// Configuration of the tree grower.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GrowerConfig {
    /// Largest number of bins any feature may use.
    #[serde(default = "default_max_bins")]
    pub max_bins: usize,
    /// Cap on the number of leaves, `None` for no cap.
    #[serde(default)]
    pub max_leaf_nodes: Option<usize>,
    /// Cap on the depth of the tree, the root is at depth 0.
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Minimum number of samples on each side of a split.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Nodes whose best split gains less than this become leaves.
    #[serde(default)]
    pub min_gain_to_split: f64,
    /// Minimum hessian sum on each side of a split.
    #[serde(default = "default_min_hessian_to_split")]
    pub min_hessian_to_split: f64,
    /// L2 penalty on leaf values.
    #[serde(default)]
    pub l2_regularization: f64,
    /// Learning rate applied to every leaf value.
    #[serde(default = "default_shrinkage")]
    pub shrinkage: f64,
    /// Worker threads used for histograms and split finding, `None` lets rayon decide.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for GrowerConfig {
    fn default() -> Self {
        GrowerConfig {
            max_bins: default_max_bins(),
            max_leaf_nodes: None,
            max_depth: None,
            min_samples_leaf: default_min_samples_leaf(),
            min_gain_to_split: 0.0,
            min_hessian_to_split: default_min_hessian_to_split(),
            l2_regularization: 0.0,
            shrinkage: default_shrinkage(),
            num_threads: None,
        }
    }
}

impl GrowerConfig {
    // Set methods for parameters

    /// Set the number of bins.
    /// * `max_bins` - Largest number of bins a feature was discretized into.
    pub fn set_max_bins(mut self, max_bins: usize) -> Self {
        self.max_bins = max_bins;
        self
    }

    /// Set the maximum number of leaves.
    /// * `max_leaf_nodes` - Growth stops once the tree has this many leaves.
    pub fn set_max_leaf_nodes(mut self, max_leaf_nodes: Option<usize>) -> Self {
        self.max_leaf_nodes = max_leaf_nodes;
        self
    }

    /// Set the maximum depth.
    /// * `max_depth` - Nodes at this depth are not split.
    pub fn set_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples per leaf.
    pub fn set_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the minimum gain a split must reach.
    pub fn set_min_gain_to_split(mut self, min_gain_to_split: f64) -> Self {
        self.min_gain_to_split = min_gain_to_split;
        self
    }

    /// Set the minimum hessian sum per leaf.
    pub fn set_min_hessian_to_split(mut self, min_hessian_to_split: f64) -> Self {
        self.min_hessian_to_split = min_hessian_to_split;
        self
    }

    /// Set the L2 regularization.
    pub fn set_l2_regularization(mut self, l2_regularization: f64) -> Self {
        self.l2_regularization = l2_regularization;
        self
    }

    /// Set the shrinkage, also known as learning rate.
    pub fn set_shrinkage(mut self, shrinkage: f64) -> Self {
        self.shrinkage = shrinkage;
        self
    }

    /// Set the number of threads.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Check every parameter, and combination of parameters, before any growth happens.
    pub fn validate(&self) -> Result<(), GrowerError> {
        validate_usize_parameter(self.max_bins, 2, MAX_BINS_LIMIT, "max_bins")?;
        if let Some(max_leaf_nodes) = self.max_leaf_nodes {
            validate_usize_parameter(max_leaf_nodes, 2, usize::MAX, "max_leaf_nodes")?;
        }
        if let Some(max_depth) = self.max_depth {
            validate_usize_parameter(max_depth, 1, usize::MAX, "max_depth")?;
        }
        validate_usize_parameter(self.min_samples_leaf, 1, usize::MAX, "min_samples_leaf")?;
        validate_positive_float_parameter(self.min_gain_to_split, "min_gain_to_split")?;
        validate_positive_float_parameter(self.min_hessian_to_split, "min_hessian_to_split")?;
        validate_positive_float_parameter(self.l2_regularization, "l2_regularization")?;
        validate_float_parameter(self.shrinkage, f64::MIN_POSITIVE, f64::MAX, "shrinkage")?;
        if let Some(num_threads) = self.num_threads {
            validate_usize_parameter(num_threads, 1, usize::MAX, "num_threads")?;
        }
        Ok(())
    }

    /// Parse a configuration from JSON, missing fields take their defaults.
    pub fn from_json(json_str: &str) -> Result<Self, GrowerError> {
        let cfg: GrowerConfig =
            serde_json::from_str(json_str).map_err(|e| GrowerError::UnableToRead(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a configuration from a JSON file.
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, GrowerError> {
        let json_str = fs::read_to_string(path).map_err(|e| GrowerError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }

    pub fn json_dump(&self) -> Result<String, GrowerError> {
        serde_json::to_string(self).map_err(|e| GrowerError::UnableToWrite(e.to_string()))
    }

    /// Build the thread pool histograms and split searches run on.
    pub fn build_pool(&self) -> Result<ThreadPool, GrowerError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads.unwrap_or(0))
            .build()
            .map_err(|e| GrowerError::UnableToCreatePool(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = GrowerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_bins, 256);
        assert_eq!(cfg.min_samples_leaf, 20);
        assert_eq!(cfg.max_leaf_nodes, None);
    }

    #[test]
    fn test_setters() {
        let cfg = GrowerConfig::default()
            .set_max_leaf_nodes(Some(31))
            .set_max_depth(Some(4))
            .set_shrinkage(0.1)
            .set_l2_regularization(1.0)
            .set_min_samples_leaf(5)
            .set_min_gain_to_split(0.01)
            .set_min_hessian_to_split(0.0)
            .set_max_bins(64)
            .set_num_threads(Some(2));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_leaf_nodes, Some(31));
        assert_eq!(cfg.max_depth, Some(4));
        assert_eq!(cfg.shrinkage, 0.1);
        assert_eq!(cfg.build_pool().unwrap().current_num_threads(), 2);
    }

    #[test]
    fn test_invalid_config() {
        let invalid = [
            GrowerConfig::default().set_max_leaf_nodes(Some(1)),
            GrowerConfig::default().set_max_depth(Some(0)),
            GrowerConfig::default().set_min_samples_leaf(0),
            GrowerConfig::default().set_min_gain_to_split(-1.0),
            GrowerConfig::default().set_min_hessian_to_split(f64::NAN),
            GrowerConfig::default().set_l2_regularization(-0.5),
            GrowerConfig::default().set_shrinkage(0.0),
            GrowerConfig::default().set_max_bins(1),
            GrowerConfig::default().set_max_bins(70000),
            GrowerConfig::default().set_num_threads(Some(0)),
        ];
        for cfg in invalid.iter() {
            assert!(
                matches!(cfg.validate(), Err(GrowerError::InvalidParameter(..))),
                "{:?} should not validate",
                cfg
            );
        }
    }

    #[test]
    fn test_config_json() {
        let cfg = GrowerConfig::from_json(r#"{"max_leaf_nodes": 3, "shrinkage": 0.5}"#).unwrap();
        assert_eq!(cfg.max_leaf_nodes, Some(3));
        assert_eq!(cfg.shrinkage, 0.5);
        assert_eq!(cfg.min_samples_leaf, 20);

        let dumped = cfg.json_dump().unwrap();
        assert_eq!(GrowerConfig::from_json(&dumped).unwrap(), cfg);

        assert!(GrowerConfig::from_json(r#"{"shrinkage": -1.0}"#).is_err());
        assert!(GrowerConfig::from_json("not json").is_err());
    }
}
