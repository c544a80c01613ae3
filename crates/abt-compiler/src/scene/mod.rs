//! Scene graph interface used by the compiler, and an in-memory implementation.
//!
//! The compiler only talks to a scene through the [`SceneGraph`] trait. Nodes
//! are referred to by [`NodeHandle`]s, typed keys into a slot table owned by
//! the scene.
//!
//! # Architecture
//!
//! - [`SceneGraph`]: the operations the compiler needs from a scene
//! - [`CullingScene`]: slot map backed scene with query helpers
//! - [`SceneVisitor`]: visitor trait for depth-first traversal

mod culling;
mod visitor;

pub use culling::{CullingNode, CullingScene};
pub use visitor::{CollectingVisitor, FnVisitor, SceneVisitor};

use crate::{CompiledMesh, Region};

slotmap::new_key_type! {
    /// Handle to a culling node owned by a scene.
    pub struct NodeHandle;
}

/// Kind of entity stored in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    CullingNode,
    Region,
}

/// A borrowed scene entity.
#[derive(Debug, Clone, Copy)]
pub enum SceneEntity<'a> {
    CullingNode(NodeHandle, &'a CullingNode),
    Region(&'a Region),
}

impl SceneEntity<'_> {
    /// Returns the kind of this entity.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            SceneEntity::CullingNode(..) => EntityKind::CullingNode,
            SceneEntity::Region(_) => EntityKind::Region,
        }
    }
}

/// The scene operations needed to publish a compiled culling hierarchy.
pub trait SceneGraph {
    /// Removes every entity and embedded resource.
    fn clear(&mut self);

    /// Creates a culling node, as a child of `parent` or as a root.
    fn create_culling_node(&mut self, parent: Option<NodeHandle>) -> NodeHandle;

    /// Marks a node as internal, hiding it from editors and scripts.
    fn set_internal(&mut self, node: NodeHandle, internal: bool);

    /// Marks a node as static world geometry.
    fn set_world_geometry(&mut self, node: NodeHandle, world_geometry: bool);

    /// Stores a mesh as an embedded resource at `resource_path`.
    fn add_embedded_mesh(&mut self, resource_path: String, mesh: CompiledMesh);

    /// Attaches the embedded mesh called `mesh_name` to a node.
    fn attach_mesh(&mut self, node: NodeHandle, mesh_name: &str);

    /// Adds a region entity.
    fn add_region(&mut self, region: Region);
}
