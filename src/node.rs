use crate::splitter::{NodeInfo, SplitInfo};
use std::cmp::Ordering;
use std::fmt;

/// Where a node is in its lifecycle while the tree grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeState {
    /// Created, histogram and best split not computed yet.
    Unexpanded,
    /// Has a positive gain split, and waits in the queue.
    Splittable,
    /// The split has been applied, the node owns two children.
    Internal { left_child: usize, right_child: usize },
    /// Terminal leaf, `value` already includes the shrinkage.
    Finalized { value: f64 },
}

/// A node of the tree under construction.
///
/// Nodes live in the grower's arena and refer to each other by position.
/// The rows of a node are the range `start_idx..stop_idx` of the grower's
/// partition buffer.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub num: usize,
    pub depth: usize,
    pub parent: Option<usize>,
    pub start_idx: usize,
    pub stop_idx: usize,
    pub sum_gradients: f64,
    pub sum_hessians: f64,
    pub split_info: Option<SplitInfo>,
    pub state: NodeState,
}

impl TreeNode {
    pub fn new(num: usize, depth: usize, start_idx: usize, stop_idx: usize, info: &NodeInfo, parent: Option<usize>) -> Self {
        TreeNode {
            num,
            depth,
            parent,
            start_idx,
            stop_idx,
            sum_gradients: info.sum_gradients,
            sum_hessians: info.sum_hessians,
            split_info: None,
            state: NodeState::Unexpanded,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.stop_idx - self.start_idx
    }

    pub fn node_info(&self) -> NodeInfo {
        NodeInfo::new(self.sum_gradients, self.sum_hessians, self.n_samples())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.state, NodeState::Finalized { .. })
    }

    /// Prediction value, only set on finalized leaves.
    pub fn value(&self) -> Option<f64> {
        match self.state {
            NodeState::Finalized { value } => Some(value),
            _ => None,
        }
    }

    pub fn left_child(&self) -> Option<usize> {
        match self.state {
            NodeState::Internal { left_child, .. } => Some(left_child),
            _ => None,
        }
    }

    pub fn right_child(&self) -> Option<usize> {
        match self.state {
            NodeState::Internal { right_child, .. } => Some(right_child),
            _ => None,
        }
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.state, self.split_info) {
            (NodeState::Finalized { value }, _) => {
                write!(f, "{}:leaf={},cover={},samples={}", self.num, value, self.sum_hessians, self.n_samples())
            }
            (NodeState::Internal { left_child, right_child }, Some(split_info)) => write!(
                f,
                "{}:[{} <= {}] yes={},no={},gain={},cover={}",
                self.num,
                split_info.feature_idx,
                split_info.bin_idx,
                left_child,
                right_child,
                split_info.gain,
                self.sum_hessians
            ),
            (state, _) => write!(f, "{}:{:?},cover={}", self.num, state, self.sum_hessians),
        }
    }
}

/// Queue entry of a splittable node, ordered by the gain of its best split.
/// Equal gains pop the node created first.
#[derive(Debug, Clone, Copy)]
pub struct SplittableNode {
    pub num: usize,
    pub gain: f64,
}

impl Ord for SplittableNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.num.cmp(&self.num))
    }
}

impl PartialOrd for SplittableNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SplittableNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplittableNode {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_splittable_node_order() {
        let mut heap = BinaryHeap::new();
        heap.push(SplittableNode { num: 3, gain: 1.0 });
        heap.push(SplittableNode { num: 1, gain: 5.0 });
        heap.push(SplittableNode { num: 4, gain: 5.0 });
        heap.push(SplittableNode { num: 2, gain: 0.5 });
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop()).map(|n| n.num).collect();
        assert_eq!(order, vec![1, 4, 3, 2]);
    }

    #[test]
    fn test_node_state() {
        let info = NodeInfo::new(-2.0, 4.0, 4);
        let mut node = TreeNode::new(0, 0, 0, 4, &info, None);
        assert_eq!(node.n_samples(), 4);
        assert_eq!(node.node_info(), info);
        assert_eq!(node.value(), None);
        assert!(!node.is_leaf());

        node.state = NodeState::Internal {
            left_child: 1,
            right_child: 2,
        };
        assert_eq!(node.left_child(), Some(1));
        assert_eq!(node.right_child(), Some(2));
        assert!(!node.is_leaf());

        node.state = NodeState::Finalized { value: 0.5 };
        assert!(node.is_leaf());
        assert_eq!(node.value(), Some(0.5));
        assert_eq!(node.left_child(), None);
        println!("{}", node);
    }
}
