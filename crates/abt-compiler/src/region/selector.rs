//! Plane selection strategies for region BSP construction.

use crate::{Classification, RawTriangle};

/// Strategy for selecting which triangle's plane splits a BSP node.
///
/// Implementations must return a triangle that has a plane, i.e. a
/// non-degenerate one, or `None` when there is no such triangle.
pub trait PlaneSelector {
    /// Selects a triangle from the slice to use as the splitting plane.
    fn select<'a>(&self, triangles: &'a [RawTriangle]) -> Option<&'a RawTriangle>;
}

/// Selects the plane that splits the triangles most evenly.
///
/// Every candidate is scored by `|front - back|` over all triangles; the
/// lowest score wins and the earliest candidate wins ties. Quadratic in the
/// number of triangles, which is fine for hand placed region volumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedSplit;

impl PlaneSelector for BalancedSplit {
    fn select<'a>(&self, triangles: &'a [RawTriangle]) -> Option<&'a RawTriangle> {
        let mut best = None;
        let mut best_score = i64::MAX;

        for candidate in triangles {
            let Some(plane) = candidate.plane() else {
                continue;
            };

            let score: i64 = triangles
                .iter()
                .map(|triangle| match triangle.classify(&plane) {
                    Classification::Front => 1,
                    Classification::Back => -1,
                    _ => 0,
                })
                .sum();

            if score.abs() < best_score {
                best_score = score.abs();
                best = Some(candidate);
            }
        }

        best
    }
}

/// Selects the first triangle that has a plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTriangle;

impl PlaneSelector for FirstTriangle {
    fn select<'a>(&self, triangles: &'a [RawTriangle]) -> Option<&'a RawTriangle> {
        triangles.iter().find(|triangle| triangle.plane().is_some())
    }
}
