/// Added to every hessian denominator so degenerate nodes never divide by zero.
pub const HESSIAN_EPS: f64 = f64::EPSILON;
/// Below this many samples a node's histogram is built on the calling thread.
pub const MIN_PARALLEL_SAMPLES: usize = 512;
/// Largest number of bins a feature can be discretized into, bins are stored as `u16`.
pub const MAX_BINS_LIMIT: usize = u16::MAX as usize + 1;
pub const DEFAULT_MAX_BINS: usize = 256;
pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 20;
pub const DEFAULT_MIN_HESSIAN_TO_SPLIT: f64 = 1e-3;
