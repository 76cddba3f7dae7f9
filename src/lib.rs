mod bin;
mod node;

// Modules
pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod grower;
pub mod histogram;
pub mod predictor;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use bin::Bin;
pub use config::GrowerConfig;
pub use data::{Hessians, JaggedMatrix, Matrix};
pub use errors::GrowerError;
pub use node::{NodeState, SplittableNode, TreeNode};
pub use predictor::{Predictor, PredictorNode};
pub use tree::TreeGrower;
