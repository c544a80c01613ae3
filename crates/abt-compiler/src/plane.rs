//! Planes and point/triangle classification against them.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Distance within which a point counts as lying on a plane.
pub const PLANE_EPSILON: f32 = 1e-3;

/// Side of a plane a single point is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Further than [`PLANE_EPSILON`] along the normal
    Front,
    /// Further than [`PLANE_EPSILON`] against the normal
    Back,
    OnPlane,
}

/// Where a triangle lies relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// No vertex is behind the plane and at least one is in front
    Front,
    /// No vertex is in front of the plane and at least one is behind
    Back,
    /// All vertices are on the plane
    Coplanar,
    /// Vertices are on both sides
    Spanning,
}

/// Classifies three points against a plane.
///
/// A point set touching the plane with the rest on one side takes that side.
pub(crate) fn classify_points(plane: &Plane3D, points: [Point3<f32>; 3]) -> Classification {
    let (mut front, mut back) = (false, false);

    for point in points {
        match plane.classify_point(point) {
            PlaneSide::Front => front = true,
            PlaneSide::Back => back = true,
            PlaneSide::OnPlane => {}
        }
    }

    match (front, back) {
        (false, false) => Classification::Coplanar,
        (true, false) => Classification::Front,
        (false, true) => Classification::Back,
        (true, true) => Classification::Spanning,
    }
}

/// An oriented plane `normal · p = offset` with a unit normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane3D {
    normal: Vector3<f32>,
    offset: f32,
}

impl Plane3D {
    /// Creates a plane from a normal and offset, normalising both.
    ///
    /// # Panics
    /// If `normal` has (almost) zero length. Callers building planes from
    /// triangles go through [`RawTriangle::plane`](crate::RawTriangle::plane),
    /// which returns `None` for degenerate triangles instead.
    pub fn new(normal: Vector3<f32>, offset: f32) -> Self {
        let length = normal.norm();
        assert!(length > f32::EPSILON, "zero length plane normal");

        Self {
            normal: normal / length,
            offset: offset / length,
        }
    }

    /// Creates the plane through `point` facing along `normal`.
    ///
    /// # Panics
    /// If `normal` has (almost) zero length.
    pub fn from_point_and_normal(point: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self::new(normal, normal.dot(&point.coords))
    }

    /// Returns the parallel plane through `point`.
    #[inline]
    pub fn through_point(&self, point: Point3<f32>) -> Self {
        Self {
            normal: self.normal,
            offset: self.normal.dot(&point.coords),
        }
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Positive in front of the plane, negative behind it.
    #[inline]
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) - self.offset
    }

    pub fn classify_point(&self, point: Point3<f32>) -> PlaneSide {
        let distance = self.signed_distance(point);

        if distance > PLANE_EPSILON {
            PlaneSide::Front
        } else if distance < -PLANE_EPSILON {
            PlaneSide::Back
        } else {
            PlaneSide::OnPlane
        }
    }

    #[inline]
    pub fn classify_triangle(
        &self,
        a: Point3<f32>,
        b: Point3<f32>,
        c: Point3<f32>,
    ) -> Classification {
        classify_points(self, [a, b, c])
    }

    /// Returns the fraction along `start -> end` at which the segment crosses
    /// the plane, or `None` when it runs parallel or crosses outside `[0, 1]`.
    pub fn intersect_segment(&self, start: Point3<f32>, end: Point3<f32>) -> Option<f32> {
        let along = self.normal.dot(&(end - start));
        if along.abs() < f32::EPSILON {
            return None;
        }

        let t = -self.signed_distance(start) / along;
        (0.0..=1.0).contains(&t).then_some(t)
    }
}
