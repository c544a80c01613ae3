//! In-memory scene holding culling nodes, embedded meshes and regions.

use std::collections::BTreeMap;

use nalgebra::Point3;
use slotmap::SlotMap;

use crate::mesh::mesh_resource_path;
use crate::{CompiledMesh, Region};

use super::visitor::SceneVisitor;
use super::{NodeHandle, SceneEntity, SceneGraph};

/// A node of the culling hierarchy.
#[derive(Debug, Clone, Default)]
pub struct CullingNode {
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    meshes: Vec<String>,
    internal: bool,
    world_geometry: bool,
}

impl CullingNode {
    #[inline]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Returns the child nodes in creation order.
    #[inline]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Returns the names of the meshes attached to this node.
    #[inline]
    pub fn meshes(&self) -> &[String] {
        &self.meshes
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    #[inline]
    pub fn is_world_geometry(&self) -> bool {
        self.world_geometry
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A [`SceneGraph`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct CullingScene {
    nodes: SlotMap<NodeHandle, CullingNode>,
    roots: Vec<NodeHandle>,
    embedded_meshes: BTreeMap<String, CompiledMesh>,
    regions: Vec<Region>,
}

impl CullingScene {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn node(&self, handle: NodeHandle) -> Option<&CullingNode> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the nodes without a parent, in creation order.
    #[inline]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    /// Returns the children of a node, or an empty slice for a stale handle.
    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.nodes.get(handle).map(CullingNode::children).unwrap_or(&[])
    }

    /// Returns the nodes without children in depth-first order.
    pub fn leaves(&self) -> Vec<NodeHandle> {
        let mut leaves = Vec::new();
        self.walk(|handle, node, _| {
            if node.is_leaf() {
                leaves.push(handle);
            }
        });
        leaves
    }

    /// Returns the number of levels in the deepest branch (0 for an empty scene).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        self.walk(|_, _, depth| deepest = deepest.max(depth + 1));
        deepest
    }

    /// Returns the embedded mesh stored at `resource_path`.
    pub fn embedded_mesh(&self, resource_path: &str) -> Option<&CompiledMesh> {
        self.embedded_meshes.get(resource_path)
    }

    /// Iterates over every embedded mesh with its resource path.
    pub fn embedded_meshes(&self) -> impl Iterator<Item = (&str, &CompiledMesh)> {
        self.embedded_meshes
            .iter()
            .map(|(path, mesh)| (path.as_str(), mesh))
    }

    /// Returns the embedded meshes attached to a node.
    pub fn meshes_for(&self, handle: NodeHandle) -> Vec<&CompiledMesh> {
        self.nodes.get(handle).map_or_else(Vec::new, |node| {
            node.meshes()
                .iter()
                .filter_map(|name| self.embedded_mesh(&mesh_resource_path(name)))
                .collect()
        })
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Returns the regions containing a world space point.
    pub fn regions_containing(&self, point: Point3<f32>) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(move |region| region.intersect(point))
    }

    /// Iterates over every entity: culling nodes in depth-first order, then regions.
    pub fn entities(&self) -> Vec<SceneEntity<'_>> {
        let mut entities = Vec::with_capacity(self.nodes.len() + self.regions.len());
        self.walk(|handle, node, _| entities.push(SceneEntity::CullingNode(handle, node)));
        entities.extend(self.regions.iter().map(SceneEntity::Region));
        entities
    }

    /// Visits every node depth-first, parents before children and children in
    /// creation order.
    pub fn traverse<V: SceneVisitor>(&self, visitor: &mut V) {
        self.walk(|handle, node, depth| visitor.visit(handle, node, depth));
    }

    fn walk<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(NodeHandle, &'a CullingNode, usize),
    {
        let mut stack: Vec<(NodeHandle, usize)> =
            self.roots.iter().rev().map(|&handle| (handle, 0)).collect();

        while let Some((handle, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };

            f(handle, node, depth);
            stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        }
    }
}

impl SceneGraph for CullingScene {
    fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.embedded_meshes.clear();
        self.regions.clear();
    }

    fn create_culling_node(&mut self, parent: Option<NodeHandle>) -> NodeHandle {
        let parent = parent.filter(|&handle| self.nodes.contains_key(handle));

        let handle = self.nodes.insert(CullingNode {
            parent,
            ..CullingNode::default()
        });

        match parent.and_then(|handle| self.nodes.get_mut(handle)) {
            Some(parent) => parent.children.push(handle),
            None => self.roots.push(handle),
        }

        handle
    }

    fn set_internal(&mut self, node: NodeHandle, internal: bool) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.internal = internal;
        }
    }

    fn set_world_geometry(&mut self, node: NodeHandle, world_geometry: bool) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.world_geometry = world_geometry;
        }
    }

    fn add_embedded_mesh(&mut self, resource_path: String, mesh: CompiledMesh) {
        self.embedded_meshes.insert(resource_path, mesh);
    }

    fn attach_mesh(&mut self, node: NodeHandle, mesh_name: &str) {
        match self.nodes.get_mut(node) {
            Some(node) => node.meshes.push(mesh_name.to_string()),
            None => log::warn!("Can't attach mesh '{}' to a removed culling node", mesh_name),
        }
    }

    fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{CollectingVisitor, EntityKind, FnVisitor};

    fn build_tree(scene: &mut CullingScene) -> [NodeHandle; 5] {
        let root = scene.create_culling_node(None);
        let front = scene.create_culling_node(Some(root));
        let back = scene.create_culling_node(Some(root));
        let front_front = scene.create_culling_node(Some(front));
        let front_back = scene.create_culling_node(Some(front));
        [root, front, back, front_front, front_back]
    }

    #[test]
    fn children_keep_creation_order() {
        let mut scene = CullingScene::new();
        let [root, front, back, ..] = build_tree(&mut scene);

        assert_eq!(scene.roots(), &[root]);
        assert_eq!(scene.children(root), &[front, back]);
        assert_eq!(scene.node(front).unwrap().parent(), Some(root));
        assert_eq!(scene.node_count(), 5);
        assert_eq!(scene.depth(), 3);
    }

    #[test]
    fn traversal_is_depth_first_front_before_back() {
        let mut scene = CullingScene::new();
        let [root, front, back, front_front, front_back] = build_tree(&mut scene);

        let mut visitor = CollectingVisitor::new();
        scene.traverse(&mut visitor);

        assert_eq!(
            visitor.into_visited(),
            vec![(root, 0), (front, 1), (front_front, 2), (front_back, 2), (back, 1)]
        );
        assert_eq!(scene.leaves(), vec![front_front, front_back, back]);
    }

    #[test]
    fn fn_visitor_calls_closure() {
        let mut scene = CullingScene::new();
        build_tree(&mut scene);

        let mut leaf_count = 0;
        scene.traverse(&mut FnVisitor::new(|_, node: &CullingNode, _| {
            if node.is_leaf() {
                leaf_count += 1;
            }
        }));
        assert_eq!(leaf_count, 3);
    }

    #[test]
    fn meshes_resolve_through_resource_paths() {
        let mut scene = CullingScene::new();
        let node = scene.create_culling_node(None);

        let mut mesh = CompiledMesh::new();
        mesh.set_parameter("lightMap", "lm_0");
        scene.add_embedded_mesh(mesh_resource_path(".scene/guid/0_0"), mesh);
        scene.attach_mesh(node, ".scene/guid/0_0");

        let meshes = scene.meshes_for(node);
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].parameter("lightMap"), Some("lm_0"));
        assert!(scene.embedded_mesh("Meshes/.scene/guid/0_0.mesh").is_some());
    }

    #[test]
    fn flags_and_clear() {
        let mut scene = CullingScene::new();
        let node = scene.create_culling_node(None);
        scene.set_internal(node, true);
        scene.set_world_geometry(node, true);
        scene.add_region(Region::new("tools.region.a"));

        let culling = scene.node(node).unwrap();
        assert!(culling.is_internal());
        assert!(culling.is_world_geometry());

        let kinds: Vec<EntityKind> = scene.entities().iter().map(|e| e.entity_kind()).collect();
        assert_eq!(kinds, vec![EntityKind::CullingNode, EntityKind::Region]);

        scene.clear();
        assert_eq!(scene.node_count(), 0);
        assert!(scene.roots().is_empty());
        assert!(scene.regions().is_empty());
        assert!(scene.node(node).is_none());

        // Stale handles are ignored
        scene.set_internal(node, false);
        scene.attach_mesh(node, "gone");
        assert!(scene.children(node).is_empty());
    }
}
