//! Arena node of a region BSP tree.

use serde::{Deserialize, Serialize};

use crate::Plane3D;

/// A node in a region's BSP tree.
///
/// Children are indices into the tree's node arena; `None` marks an absent
/// child. An absent front child means "inside", an absent back child means
/// "outside".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BspTreeNode {
    plane: Plane3D,
    front: Option<usize>,
    back: Option<usize>,
}

impl BspTreeNode {
    /// Creates a node with no children.
    pub fn new(plane: Plane3D) -> Self {
        Self {
            plane,
            front: None,
            back: None,
        }
    }

    #[inline]
    pub fn plane(&self) -> &Plane3D {
        &self.plane
    }

    /// Returns the arena index of the front child.
    #[inline]
    pub fn front(&self) -> Option<usize> {
        self.front
    }

    /// Returns the arena index of the back child.
    #[inline]
    pub fn back(&self) -> Option<usize> {
        self.back
    }

    #[inline]
    pub fn set_front(&mut self, index: Option<usize>) {
        self.front = index;
    }

    #[inline]
    pub fn set_back(&mut self, index: Option<usize>) {
        self.back = index;
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.front.is_none() && self.back.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn new_node_is_leaf() {
        let mut node = BspTreeNode::new(Plane3D::new(Vector3::new(0.0, 1.0, 0.0), 0.0));
        assert!(node.is_leaf());

        node.set_back(Some(3));
        assert!(!node.is_leaf());
        assert_eq!(node.back(), Some(3));
        assert_eq!(node.front(), None);
    }
}
