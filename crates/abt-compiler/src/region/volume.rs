//! Named region volumes.

use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};

use crate::{RawTriangle, TriangleArray};

use super::node::BspTreeNode;
use super::selector::PlaneSelector;
use super::tree::BspTree;

/// Material name prefix that marks triangles as region geometry.
pub const REGION_MATERIAL_PREFIX: &str = "tools.region.";

/// Returns whether a material name marks region geometry.
#[inline]
pub fn is_region_material(material: &str) -> bool {
    material.starts_with(REGION_MATERIAL_PREFIX)
}

/// A named volume of space defined by a closed triangle mesh.
///
/// Only triangle positions are kept. Containment is answered by a BSP tree
/// built over the triangles in the region's local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    name: String,
    triangles: Vec<RawTriangle>,
    bsp: BspTree,
    transform: Isometry3<f32>,
}

impl Default for Region {
    fn default() -> Self {
        Self::new("")
    }
}

impl Region {
    /// Creates an empty region with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triangles: Vec::new(),
            bsp: BspTree::new(),
            transform: Isometry3::identity(),
        }
    }

    /// Creates a region and builds its BSP tree from raw triangles.
    pub fn from_raw_triangles(name: impl Into<String>, triangles: Vec<RawTriangle>) -> Self {
        let mut region = Self::new(name);
        region.setup_raw(triangles);
        region
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copies the positions of every triangle in `triangles` and builds the BSP tree.
    pub fn setup(&mut self, triangles: &TriangleArray) {
        self.setup_raw(triangles.iter().map(|triangle| triangle.raw()).collect());
    }

    /// Stores `triangles` and builds the BSP tree with the default selector.
    pub fn setup_raw(&mut self, triangles: Vec<RawTriangle>) {
        self.bsp = BspTree::from_triangles(&triangles);
        self.triangles = triangles;
    }

    /// Stores `triangles` and builds the BSP tree with a custom plane selector.
    pub fn setup_with<S: PlaneSelector>(&mut self, triangles: Vec<RawTriangle>, selector: &S) {
        self.bsp = BspTree::build(&triangles, selector);
        self.triangles = triangles;
    }

    #[inline]
    pub fn transform(&self) -> &Isometry3<f32> {
        &self.transform
    }

    /// Sets the local to world transform of the region.
    pub fn set_transform(&mut self, transform: Isometry3<f32>) {
        self.transform = transform;
    }

    /// Returns whether a world space point lies inside the region.
    pub fn intersect(&self, point: Point3<f32>) -> bool {
        if self.bsp.is_empty() {
            return false;
        }

        let local = self.transform.inverse_transform_point(&point);
        self.bsp.contains(local)
    }

    /// Returns the region's triangles in local space.
    #[inline]
    pub fn triangles(&self) -> &[RawTriangle] {
        &self.triangles
    }

    #[inline]
    pub fn bsp(&self) -> &BspTree {
        &self.bsp
    }

    /// Returns the BSP node arena, root first.
    #[inline]
    pub fn bsp_nodes(&self) -> &[BspTreeNode] {
        self.bsp.nodes()
    }

    /// Removes all geometry. The name and transform are kept.
    pub fn clear(&mut self) {
        self.triangles.clear();
        self.bsp.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::selector::FirstTriangle;
    use crate::{StreamKind, VertexLayout, VertexStream};
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn p(x: f32, y: f32, z: f32) -> Point3<f32> {
        Point3::new(x, y, z)
    }

    /// Unit cube `[0, 1]^3` wound counter-clockwise seen from outside.
    fn make_box() -> Vec<RawTriangle> {
        let c = |i: usize| p((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32);
        let quads = [
            [0, 2, 3, 1], // z = 0
            [4, 5, 7, 6], // z = 1
            [0, 1, 5, 4], // y = 0
            [2, 6, 7, 3], // y = 1
            [0, 4, 6, 2], // x = 0
            [1, 3, 7, 5], // x = 1
        ];

        quads
            .iter()
            .flat_map(|&[a, b, cc, d]| {
                [
                    RawTriangle::new(c(a), c(b), c(cc)),
                    RawTriangle::new(c(a), c(cc), c(d)),
                ]
            })
            .collect()
    }

    #[test]
    fn box_centroid_is_inside() {
        let region = Region::from_raw_triangles("tools.region.box", make_box());

        assert!(region.intersect(p(0.5, 0.5, 0.5)));
        assert!(!region.intersect(p(5.0, 0.5, 0.5)));
        assert!(!region.intersect(p(0.5, 0.5, -3.0)));
        assert_eq!(region.triangles().len(), 12);
        assert!(!region.bsp_nodes().is_empty());
    }

    #[test]
    fn setup_from_triangle_array() {
        let layout = VertexLayout::new(vec![
            VertexStream::new(StreamKind::Normal, 3),
            VertexStream::new(StreamKind::Position, 3),
        ]);
        let mut array = TriangleArray::with_layout(layout).unwrap();
        for triangle in make_box() {
            let records: Vec<Vec<u8>> = triangle
                .vertices()
                .iter()
                .map(|v| bytemuck::cast_slice(&[0.0f32, 0.0, 0.0, v.x, v.y, v.z]).to_vec())
                .collect();
            array
                .add_triangle(&records[0], &records[1], &records[2], "tools.region.box", "")
                .unwrap();
        }

        let mut region = Region::new("tools.region.box");
        region.setup(&array);

        assert_eq!(region.triangles(), make_box().as_slice());
        assert!(region.intersect(p(0.25, 0.75, 0.5)));
    }

    #[test]
    fn transform_moves_the_volume() {
        let mut region = Region::from_raw_triangles("tools.region.moved", make_box());
        region.set_transform(Isometry3::from_parts(
            Translation3::new(10.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2),
        ));

        // Local (0.5, 0.5, 0.5) maps to world (9.5, 0.5, 0.5)
        assert!(region.intersect(p(9.5, 0.5, 0.5)));
        assert!(!region.intersect(p(0.5, 0.5, 0.5)));
    }

    #[test]
    fn empty_region_contains_nothing() {
        let mut region = Region::from_raw_triangles("tools.region.box", make_box());
        region.clear();
        assert!(!region.intersect(p(0.5, 0.5, 0.5)));
        assert_eq!(region.name(), "tools.region.box");
    }

    #[test]
    fn selectors_agree_on_containment() {
        let mut balanced = Region::new("a");
        balanced.setup_raw(make_box());
        let mut first = Region::new("b");
        first.setup_with(make_box(), &FirstTriangle);

        for point in [p(0.5, 0.5, 0.5), p(0.1, 0.9, 0.2), p(-1.0, 0.5, 0.5), p(0.5, 2.0, 0.5)] {
            assert_eq!(balanced.intersect(point), first.intersect(point));
        }
    }

    #[test]
    fn serde_round_trip() {
        let mut region = Region::from_raw_triangles("tools.region.saved", make_box());
        region.set_transform(Isometry3::translation(0.0, 2.0, 0.0));

        let text = ron::to_string(&region).unwrap();
        let loaded: Region = ron::from_str(&text).unwrap();

        assert_eq!(loaded.name(), "tools.region.saved");
        assert_eq!(loaded.bsp_nodes().len(), region.bsp_nodes().len());
        assert!(loaded.intersect(p(0.5, 2.5, 0.5)));
        assert!(!loaded.intersect(p(0.5, 0.5, 0.5)));
    }

    #[test]
    fn region_material_prefix() {
        assert!(is_region_material("tools.region.water"));
        assert!(!is_region_material("tools.regions"));
        assert!(!is_region_material("stone"));
    }
}
