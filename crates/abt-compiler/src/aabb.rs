//! Axis-aligned bounding boxes.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Point3<f32>,
    /// Maximum corner of the bounding box
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from its two corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Creates a degenerate box around a single point.
    pub fn from_point(point: Point3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Creates the smallest box enclosing all the given points.
    ///
    /// Returns `None` when there are no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut points = points.into_iter();
        let mut aabb = Self::from_point(points.next()?);
        for point in points {
            aabb.add_point(point);
        }
        Some(aabb)
    }

    /// Grows the box to include `point`.
    pub fn add_point(&mut self, point: Point3<f32>) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Returns the center of the box.
    pub fn center(&self) -> Point3<f32> {
        self.min + (self.max - self.min) * 0.5
    }

    /// Returns the full size of the box along each axis.
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Returns the half-size of the box along each axis.
    pub fn extents(&self) -> Vector3<f32> {
        self.size() * 0.5
    }

    /// Checks whether the box contains a point (boundary inclusive).
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}
