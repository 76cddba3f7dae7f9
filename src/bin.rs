//! Bin
//!
//! This module defines the `Bin` struct, one bucket of a feature histogram.
//! Each bin stores the gradient sum, hessian sum, and sample count of the
//! samples whose binned value falls in it.
use serde::{Deserialize, Serialize};

/// Struct to hold the information of a given bin.
///
/// Sums are kept in `f64` even though the per sample statistics are `f32`,
/// so large nodes do not lose precision.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub struct Bin {
    /// Sum of the gradients.
    pub sum_gradients: f64,
    /// Sum of the hessians.
    pub sum_hessians: f64,
    /// Number of samples.
    pub count: u32,
}

impl Bin {
    /// Create an empty bin.
    pub fn empty() -> Self {
        Bin::default()
    }

    /// Add one sample with its own hessian.
    #[inline]
    pub fn add(&mut self, gradient: f32, hessian: f32) {
        self.sum_gradients += f64::from(gradient);
        self.sum_hessians += f64::from(hessian);
        self.count += 1;
    }

    /// Add one sample, the hessian is filled in later from the count.
    #[inline]
    pub fn add_gradient(&mut self, gradient: f32) {
        self.sum_gradients += f64::from(gradient);
        self.count += 1;
    }

    /// Build the bin of a sibling node, by subtracting the values
    /// of the child bin from the parent bin.
    #[inline]
    pub fn from_parent_child(parent: &Bin, child: &Bin) -> Bin {
        Bin {
            sum_gradients: parent.sum_gradients - child.sum_gradients,
            sum_hessians: parent.sum_hessians - child.sum_hessians,
            count: parent.count - child.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin() {
        let mut root_bin = Bin::empty();
        root_bin.add(1.0, 0.5);
        root_bin.add(-3.0, 0.25);
        root_bin.add(2.0, 0.25);
        let mut child_bin = Bin::empty();
        child_bin.add(-3.0, 0.25);
        let update_bin = Bin::from_parent_child(&root_bin, &child_bin);
        assert_eq!(update_bin.count, 2);
        assert_eq!(update_bin.sum_gradients, 3.0);
        assert_eq!(update_bin.sum_hessians, 0.75);
    }

    #[test]
    fn test_bin_add_gradient() {
        let mut bin = Bin::empty();
        bin.add_gradient(0.5);
        bin.add_gradient(0.5);
        assert_eq!(bin.count, 2);
        assert_eq!(bin.sum_gradients, 1.0);
        assert_eq!(bin.sum_hessians, 0.0);
    }
}
