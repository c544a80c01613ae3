//! Visitor pattern for culling tree traversal.

use super::{CullingNode, NodeHandle};

/// Visitor for processing culling nodes during a depth-first traversal.
pub trait SceneVisitor {
    /// Called once per node, parents before children. Roots have depth 0.
    fn visit(&mut self, handle: NodeHandle, node: &CullingNode, depth: usize);
}

/// A visitor that records every visited node with its depth.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<(NodeHandle, usize)>,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the visited `(handle, depth)` pairs in visiting order.
    pub fn visited(&self) -> &[(NodeHandle, usize)] {
        &self.collected
    }

    pub fn into_visited(self) -> Vec<(NodeHandle, usize)> {
        self.collected
    }
}

impl SceneVisitor for CollectingVisitor {
    fn visit(&mut self, handle: NodeHandle, _node: &CullingNode, depth: usize) {
        self.collected.push((handle, depth));
    }
}

/// A visitor that calls a closure for each node.
pub struct FnVisitor<F>
where
    F: FnMut(NodeHandle, &CullingNode, usize),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(NodeHandle, &CullingNode, usize),
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> SceneVisitor for FnVisitor<F>
where
    F: FnMut(NodeHandle, &CullingNode, usize),
{
    fn visit(&mut self, handle: NodeHandle, node: &CullingNode, depth: usize) {
        (self.func)(handle, node, depth);
    }
}
