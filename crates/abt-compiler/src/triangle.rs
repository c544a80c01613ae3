//! Triangle records and views.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Classification, Plane3D, TriangleArray};

/// Triangles with an area below this are considered degenerate.
pub const DEGENERATE_AREA: f32 = 0.000_001;

/// A triangle stored in a [`TriangleArray`].
///
/// The three indices point into the vertex buffer of the owning array, the
/// triangle itself holds no vertex data. An empty material or lightmap name
/// means "default" or "none".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triangle {
    indices: [u32; 3],
    material: String,
    lightmap: String,
}

impl Triangle {
    pub(crate) fn new(indices: [u32; 3], material: &str, lightmap: &str) -> Self {
        Self {
            indices,
            material: material.to_string(),
            lightmap: lightmap.to_string(),
        }
    }

    /// Returns the vertex indices of this triangle.
    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        self.indices
    }

    #[inline]
    pub fn material(&self) -> &str {
        &self.material
    }

    #[inline]
    pub fn lightmap(&self) -> &str {
        &self.lightmap
    }
}

/// A borrowed view joining a [`Triangle`] with the array that holds its vertices.
#[derive(Debug, Clone, Copy)]
pub struct TriangleRef<'a> {
    pub(crate) array: &'a TriangleArray,
    pub(crate) triangle: &'a Triangle,
}

impl<'a> TriangleRef<'a> {
    /// Returns the array this triangle belongs to.
    #[inline]
    pub fn array(&self) -> &'a TriangleArray {
        self.array
    }

    #[inline]
    pub fn triangle(&self) -> &'a Triangle {
        self.triangle
    }

    #[inline]
    pub fn material(&self) -> &'a str {
        self.triangle.material()
    }

    #[inline]
    pub fn lightmap(&self) -> &'a str {
        self.triangle.lightmap()
    }

    /// Returns the raw vertex record of corner `v` (0..3).
    #[inline]
    pub fn vertex_data(&self, v: usize) -> &'a [u8] {
        self.array.vertex_bytes(self.triangle.indices[v])
    }

    /// Returns an owned copy of the vertex record of corner `v`.
    pub fn copy_vertex_data(&self, v: usize) -> Vec<u8> {
        self.vertex_data(v).to_vec()
    }

    /// Returns the position of corner `v`.
    #[inline]
    pub fn position(&self, v: usize) -> Point3<f32> {
        self.array.vertex_position(self.triangle.indices[v])
    }

    /// Returns all three corner positions.
    pub fn positions(&self) -> [Point3<f32>; 3] {
        [self.position(0), self.position(1), self.position(2)]
    }

    /// Returns a position-only copy of this triangle.
    pub fn raw(&self) -> RawTriangle {
        let [a, b, c] = self.positions();
        RawTriangle::new(a, b, c)
    }

    /// Computes the unit normal using the engine winding, `(v2 - v0) × (v1 - v0)`.
    pub fn normal(&self) -> Vector3<f32> {
        self.raw().normal()
    }

    /// Returns whether every corner position is finite.
    pub fn is_finite(&self) -> bool {
        self.positions()
            .iter()
            .all(|p| p.coords.iter().all(|c| c.is_finite()))
    }

    /// Computes the area with Heron's formula.
    ///
    /// Returns `f32::MAX` when any corner position is NaN or infinite.
    pub fn area(&self) -> f32 {
        if !self.is_finite() {
            return f32::MAX;
        }

        let [p0, p1, p2] = self.positions();
        let a = (p0 - p1).norm();
        let b = (p1 - p2).norm();
        let c = (p2 - p0).norm();

        let s = (a + b + c) * 0.5;
        let t = s * (s - a) * (s - b) * (s - c);

        // Rounding can push a sliver's product slightly negative
        t.max(0.0).sqrt()
    }

    /// Returns whether this triangle is malformed or too small to keep.
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.area() < DEGENERATE_AREA
    }

    /// Classifies this triangle against a plane.
    pub fn classify(&self, plane: &Plane3D) -> Classification {
        let [a, b, c] = self.positions();
        plane.classify_triangle(a, b, c)
    }
}

/// A bare triangle of three positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTriangle {
    vertices: [Point3<f32>; 3],
}

impl RawTriangle {
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Returns the three vertices of the triangle.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>; 3] {
        &self.vertices
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Point3<f32> {
        self.vertices[index]
    }

    pub fn set_vertex(&mut self, index: usize, vertex: Point3<f32>) {
        self.vertices[index] = vertex;
    }

    /// Computes the unit normal, `(v2 - v0) × (v1 - v0)`.
    ///
    /// Front faces wind clockwise when seen from the side the normal points to.
    /// Degenerate triangles produce a non-finite vector, see [`RawTriangle::unit_normal`].
    pub fn normal(&self) -> Vector3<f32> {
        let [a, b, c] = &self.vertices;
        (c - a).cross(&(b - a)).normalize()
    }

    /// Computes the unit normal, or `None` for a degenerate triangle.
    pub fn unit_normal(&self) -> Option<Vector3<f32>> {
        let [a, b, c] = &self.vertices;
        let n = (c - a).cross(&(b - a));
        let len = n.norm();
        if len > f32::EPSILON { Some(n / len) } else { None }
    }

    /// Returns the plane this triangle lies on, or `None` if it is degenerate.
    pub fn plane(&self) -> Option<Plane3D> {
        self.unit_normal()
            .map(|normal| Plane3D::from_point_and_normal(self.vertices[0], normal))
    }

    /// Computes the centroid of the triangle.
    pub fn centroid(&self) -> Point3<f32> {
        let [a, b, c] = &self.vertices;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Classifies this triangle relative to a plane.
    pub fn classify(&self, plane: &Plane3D) -> Classification {
        let [a, b, c] = self.vertices;
        plane.classify_triangle(a, b, c)
    }
}

/// Three vertex indices with no material data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RawIndexedTriangle {
    indices: [u32; 3],
}

impl RawIndexedTriangle {
    pub fn new(index0: u32, index1: u32, index2: u32) -> Self {
        Self {
            indices: [index0, index1, index2],
        }
    }

    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        self.indices
    }

    #[inline]
    pub fn index(&self, i: usize) -> u32 {
        self.indices[i]
    }

    pub fn set_index(&mut self, i: usize, value: u32) {
        self.indices[i] = value;
    }
}

impl std::ops::Add<u32> for RawIndexedTriangle {
    type Output = RawIndexedTriangle;

    /// Offsets every index.
    fn add(self, offset: u32) -> Self::Output {
        let [a, b, c] = self.indices;
        RawIndexedTriangle::new(a + offset, b + offset, c + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VertexLayout, vertex::write_point};
    use approx::assert_relative_eq;

    fn p(x: f32, y: f32, z: f32) -> Point3<f32> {
        Point3::new(x, y, z)
    }

    fn array_with(corners: [Point3<f32>; 3]) -> TriangleArray {
        let mut array = TriangleArray::with_layout(VertexLayout::position_only()).unwrap();
        let records: Vec<Vec<u8>> = corners
            .iter()
            .map(|&corner| {
                let mut record = vec![0u8; 12];
                write_point(&mut record, 0, corner);
                record
            })
            .collect();
        array
            .add_triangle(&records[0], &records[1], &records[2], "stone", "")
            .unwrap();
        array
    }

    #[test]
    fn copied_vertex_data_outlives_the_array() {
        let array = array_with([p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0)]);
        let copy = array.triangle(0).copy_vertex_data(1);
        drop(array);

        let mut expected = vec![0u8; 12];
        write_point(&mut expected, 0, p(2.0, 0.0, 0.0));
        assert_eq!(copy, expected);
    }

    #[test]
    fn heron_area() {
        let array = array_with([p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0)]);
        assert_relative_eq!(array.triangle(0).area(), 2.0, epsilon = 1e-5);
        assert!(!array.triangle(0).is_degenerate());
    }

    #[test]
    fn collapsed_triangle_is_degenerate() {
        let array = array_with([p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 0.0, 0.0)]);
        let area = array.triangle(0).area();
        assert!(area.is_finite());
        assert!(array.triangle(0).is_degenerate());
    }

    #[test]
    fn non_finite_area_is_max() {
        let array = array_with([p(0.0, 0.0, 0.0), p(f32::NAN, 0.0, 0.0), p(0.0, 1.0, 0.0)]);
        assert_eq!(array.triangle(0).area(), f32::MAX);
        assert!(array.triangle(0).is_degenerate());
    }

    #[test]
    fn normal_uses_clockwise_front_faces() {
        let tri = RawTriangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0));
        assert_relative_eq!(tri.normal(), Vector3::new(0.0, 0.0, -1.0));

        let plane = tri.plane().unwrap();
        assert_eq!(tri.classify(&plane), Classification::Coplanar);
    }

    #[test]
    fn degenerate_raw_triangle_has_no_plane() {
        let tri = RawTriangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0));
        assert!(tri.unit_normal().is_none());
        assert!(tri.plane().is_none());
    }

    #[test]
    fn indexed_triangle_offset() {
        let tri = RawIndexedTriangle::new(0, 1, 2) + 30;
        assert_eq!(tri.indices(), [30, 31, 32]);
    }
}
