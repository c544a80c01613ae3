//! Region volumes and their point containment trees.
//!
//! Triangles whose material starts with [`REGION_MATERIAL_PREFIX`] describe
//! closed volumes rather than visible geometry. Each volume becomes a
//! [`Region`] that answers "is this point inside?" with a BSP tree.
//!
//! # Architecture
//!
//! - [`Region`]: named volume holding its triangles, tree and transform
//! - [`BspTree`]: arena of [`BspTreeNode`]s, root at index 0
//! - [`PlaneSelector`]: strategy trait for choosing splitting planes

mod node;
mod selector;
mod tree;
mod volume;

pub use node::BspTreeNode;
pub use selector::{BalancedSplit, FirstTriangle, PlaneSelector};
pub use tree::BspTree;
pub use volume::{is_region_material, Region, REGION_MATERIAL_PREFIX};
