use crate::node::SplittableNode;
use std::collections::BinaryHeap;

/// Trait for handling the order in which nodes are expanded.
pub trait Grower {
    /// Add a node to the grower.
    fn add_node(&mut self, node: SplittableNode);
    /// Get the next node to split, `None` once the grower is empty.
    fn get_next_node(&mut self) -> Option<SplittableNode>;
    /// Check if the grower is empty.
    fn is_empty(&self) -> bool;
    /// Number of nodes waiting to be split.
    fn n_nodes(&self) -> usize;
}

/// Best-first growth, the highest gain node across the whole tree is split next.
impl Grower for BinaryHeap<SplittableNode> {
    fn add_node(&mut self, node: SplittableNode) {
        self.push(node);
    }

    fn get_next_node(&mut self) -> Option<SplittableNode> {
        self.pop()
    }

    fn is_empty(&self) -> bool {
        BinaryHeap::is_empty(self)
    }

    fn n_nodes(&self) -> usize {
        self.len()
    }
}
