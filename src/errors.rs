//! Errors
//!
//! Custom error types used throughout the `histgrow` crate.
use thiserror::Error;

/// Errors that can occur while growing a tree or using its predictor.
#[derive(Debug, Error)]
pub enum GrowerError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Number of gradients, and number of rows in the data.
    #[error("Received {0} gradients, but the data has {1} rows.")]
    GradientLength(usize, usize),
    /// Number of hessians, and number of rows in the data.
    #[error("Received {0} hessians, but the data has {1} rows.")]
    HessianLength(usize, usize),
    /// Expected number of features, and number found.
    #[error("Expected {0} features, but {1} were provided.")]
    FeatureCount(usize, usize),
    /// A binned value does not fit in the bins declared for its feature.
    #[error("Feature {feature} contains bin {code}, but only {n_bins} bins are declared for it.")]
    BinOutOfRange { feature: usize, code: u16, n_bins: usize },
    /// Number of predictions to update, and number of rows in the data.
    #[error("Received {0} predictions, but the data has {1} rows.")]
    PredictionLength(usize, usize),
    /// `split_next` was called with an empty queue.
    #[error("There are no splittable nodes left in the tree.")]
    NothingToSplit,
    /// A predictor was requested while some nodes could still be split.
    #[error("The tree still has nodes waiting to be split, finish growing it first.")]
    GrowthNotFinished,
    /// Raw value prediction on a predictor built without thresholds.
    #[error("This predictor was built without numerical thresholds, only binned data can be predicted.")]
    MissingThresholds,
    /// The thresholds handed to the predictor do not cover a split.
    #[error("No numerical threshold available for feature {feature} at bin {bin}.")]
    MissingThreshold { feature: usize, bin: u16 },
    /// Unable to build the thread pool.
    #[error("Unable to create thread pool: {0}")]
    UnableToCreatePool(String),
    /// Unable to serialize a predictor or config.
    #[error("Unable to write: {0}")]
    UnableToWrite(String),
    /// Unable to deserialize a predictor or config.
    #[error("Unable to read: {0}")]
    UnableToRead(String),
}
