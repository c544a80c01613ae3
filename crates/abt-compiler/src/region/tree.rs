//! Arena BSP tree used for point containment tests.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::{Classification, PlaneSide, RawTriangle};

use super::node::BspTreeNode;
use super::selector::{BalancedSplit, PlaneSelector};

/// A BSP tree stored as a flat node arena with the root at index 0.
///
/// Built from a closed triangle volume whose triangle normals point inwards,
/// so the front side of every plane is the inside of the volume. Children
/// always come after their parent in the arena, which loaded trees are
/// checked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BspTreeNode>", into = "Vec<BspTreeNode>")]
pub struct BspTree {
    nodes: Vec<BspTreeNode>,
}

impl BspTree {
    /// Creates an empty tree, which contains no points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a set of triangles.
    ///
    /// Each node splits on the plane of the triangle picked by `selector`.
    /// Triangles spanning that plane go to both sides unsplit and triangles
    /// lying on it are dropped, so every level removes at least the chosen
    /// triangle. Degenerate triangles never become split planes and are left
    /// out of construction.
    pub fn build<S: PlaneSelector>(triangles: &[RawTriangle], selector: &S) -> Self {
        let usable: Vec<RawTriangle> = triangles
            .iter()
            .filter(|triangle| triangle.plane().is_some())
            .cloned()
            .collect();

        let mut tree = Self::new();
        build_node(&mut tree.nodes, usable, selector);
        tree
    }

    /// Builds a tree using the [`BalancedSplit`] selector.
    pub fn from_triangles(triangles: &[RawTriangle]) -> Self {
        Self::build(triangles, &BalancedSplit)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node arena, root first.
    #[inline]
    pub fn nodes(&self) -> &[BspTreeNode] {
        &self.nodes
    }

    /// Returns the maximum depth of the tree (0 for an empty tree).
    pub fn depth(&self) -> usize {
        fn node_depth(nodes: &[BspTreeNode], index: Option<usize>) -> usize {
            match index.and_then(|i| nodes.get(i)) {
                Some(node) => {
                    1 + node_depth(nodes, node.front()).max(node_depth(nodes, node.back()))
                }
                None => 0,
            }
        }

        if self.nodes.is_empty() {
            0
        } else {
            node_depth(&self.nodes, Some(0))
        }
    }

    /// Returns whether `point` is inside the volume.
    ///
    /// Points on a plane follow the front child, so boundary points count as
    /// inside. An empty tree contains nothing.
    pub fn contains(&self, point: Point3<f32>) -> bool {
        let mut current = 0;

        while let Some(node) = self.nodes.get(current) {
            match node.plane().classify_point(point) {
                PlaneSide::Front | PlaneSide::OnPlane => match node.front() {
                    Some(front) => current = front,
                    None => return true,
                },
                PlaneSide::Back => match node.back() {
                    Some(back) => current = back,
                    None => return false,
                },
            }
        }

        false
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl TryFrom<Vec<BspTreeNode>> for BspTree {
    type Error = Error;

    fn try_from(nodes: Vec<BspTreeNode>) -> Result<Self, Error> {
        for (node, entry) in nodes.iter().enumerate() {
            for child in [entry.front(), entry.back()].into_iter().flatten() {
                if child <= node || child >= nodes.len() {
                    return Err(Error::InvalidBspChild { node, child });
                }
            }
        }

        Ok(Self { nodes })
    }
}

impl From<BspTree> for Vec<BspTreeNode> {
    fn from(tree: BspTree) -> Self {
        tree.nodes
    }
}

/// Recursively builds a node, returning its arena index.
fn build_node<S: PlaneSelector>(
    nodes: &mut Vec<BspTreeNode>,
    triangles: Vec<RawTriangle>,
    selector: &S,
) -> Option<usize> {
    let plane = selector.select(&triangles)?.plane()?;

    let index = nodes.len();
    nodes.push(BspTreeNode::new(plane.clone()));

    let mut front_list = Vec::new();
    let mut back_list = Vec::new();

    for triangle in triangles {
        match triangle.classify(&plane) {
            Classification::Front => front_list.push(triangle),
            Classification::Back => back_list.push(triangle),
            Classification::Spanning => {
                front_list.push(triangle.clone());
                back_list.push(triangle);
            }
            Classification::Coplanar => {}
        }
    }

    if !front_list.is_empty() {
        let front = build_node(nodes, front_list, selector);
        nodes[index].set_front(front);
    }
    if !back_list.is_empty() {
        let back = build_node(nodes, back_list, selector);
        nodes[index].set_back(back);
    }

    Some(index)
}
