//! Recursive spatial subdivision of triangle soup into culling tree leaves.

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::scene::{NodeHandle, SceneGraph};
use crate::{Aabb, Classification, Plane3D, Progress, TriangleArray, TriangleArraySet, TriangleRef};

/// A leaf of the culling tree waiting for its meshes: the scene node plus the
/// triangles that ended up in it.
#[derive(Debug)]
pub struct CompileNode {
    node: NodeHandle,
    triangles: TriangleArraySet,
}

impl CompileNode {
    pub fn new(node: NodeHandle, triangles: TriangleArraySet) -> Self {
        Self { node, triangles }
    }

    #[inline]
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    #[inline]
    pub fn triangles(&self) -> &TriangleArraySet {
        &self.triangles
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.triangle_count()
    }
}

/// Chooses the plane a node's triangles are divided by.
///
/// The plane is perpendicular to the axis along which the box is largest
/// (X if strictly largest, else Y if strictly largest, else Z) and passes
/// through the centre of the box. Triangle distribution is not considered.
pub fn choose_split_plane(aabb: &Aabb) -> Plane3D {
    let size = aabb.size();

    let normal = if size.x > size.y && size.x > size.z {
        Vector3::x()
    } else if size.y > size.x && size.y > size.z {
        Vector3::y()
    } else {
        Vector3::z()
    };

    Plane3D::from_point_and_normal(aabb.center(), normal)
}

/// Returns how far a split plane may be shifted to keep a triangle whole.
///
/// Limited to a tenth of the distance from the plane to the nearer side of the box.
pub fn overgrowth_limit(plane: &Plane3D, aabb: &Aabb, max_overgrowth: f32) -> f32 {
    let to_min = plane.signed_distance(aabb.min).abs();
    let to_max = plane.signed_distance(aabb.max).abs();

    max_overgrowth.min(to_min.min(to_max) * 0.1)
}

/// Divides triangles into the sets in front of and behind `plane`.
///
/// Triangles on the plane go to the front. A spanning triangle is moved
/// whole to the side it reaches furthest into when it pokes through the
/// plane by less than `overgrowth` on the other side. Otherwise it is split,
/// on a parallel plane through its closest vertex if that vertex lies within
/// `overgrowth` of the plane, so only two pieces are produced.
///
/// Arrays left empty are not added to the output sets.
pub fn divide_triangles(
    plane: &Plane3D,
    triangles: &TriangleArraySet,
    overgrowth: f32,
    progress: &mut Progress,
) -> Result<(TriangleArraySet, TriangleArraySet)> {
    let mut front_set = TriangleArraySet::new();
    let mut back_set = TriangleArraySet::new();

    for array in triangles {
        let mut front = TriangleArray::with_layout(array.layout().clone())?;
        let mut back = TriangleArray::with_layout(array.layout().clone())?;

        for triangle in array.iter() {
            progress.check()?;

            match triangle.classify(plane) {
                Classification::Back => back.add_triangle_from(&triangle)?,
                Classification::Front | Classification::Coplanar => {
                    front.add_triangle_from(&triangle)?
                }
                Classification::Spanning => {
                    divide_spanning(plane, &triangle, overgrowth, &mut front, &mut back)?
                }
            }
        }

        if !front.is_empty() {
            front_set.push(front)?;
        }
        if !back.is_empty() {
            back_set.push(back)?;
        }
    }

    Ok((front_set, back_set))
}

fn divide_spanning(
    plane: &Plane3D,
    triangle: &TriangleRef<'_>,
    overgrowth: f32,
    front: &mut TriangleArray,
    back: &mut TriangleArray,
) -> Result<()> {
    let distances = triangle.positions().map(|p| plane.signed_distance(p));

    let max_back = distances.iter().fold(0.0f32, |max, &d| max.max(-d));
    let max_front = distances.iter().fold(0.0f32, |max, &d| max.max(d));

    if max_back < max_front && max_back < overgrowth {
        return front.add_triangle_from(triangle);
    }
    if max_front < overgrowth {
        return back.add_triangle_from(triangle);
    }

    let closest = (0..3)
        .min_by(|&a, &b| distances[a].abs().total_cmp(&distances[b].abs()))
        .unwrap_or(0);

    let (front_pieces, back_pieces) = if distances[closest].abs() < overgrowth {
        triangle.split(&plane.through_point(triangle.position(closest)))?
    } else {
        triangle.split(plane)?
    };

    front.append(&front_pieces)?;
    back.append(&back_pieces)?;
    Ok(())
}

/// Recursive builder of the culling tree.
///
/// Holds the per-run state: the tunables and the leaves produced so far.
pub(crate) struct Subdivider {
    threshold: usize,
    max_overgrowth: f32,
    initial_triangle_count: usize,
    leaves: Vec<CompileNode>,
}

impl Subdivider {
    pub(crate) fn new(threshold: u32, max_overgrowth: f32, initial_triangle_count: usize) -> Self {
        Self {
            threshold: threshold as usize,
            max_overgrowth,
            initial_triangle_count,
            leaves: Vec::new(),
        }
    }

    pub(crate) fn into_leaves(self) -> Vec<CompileNode> {
        self.leaves
    }

    fn finished_triangle_count(&self) -> usize {
        self.leaves.iter().map(CompileNode::triangle_count).sum()
    }

    fn make_leaf(&mut self, node: NodeHandle, triangles: &mut TriangleArraySet) {
        log::trace!("Leaf node with {} triangles", triangles.triangle_count());
        self.leaves.push(CompileNode::new(node, triangles.transfer()));
    }

    /// Subdivides `triangles` below `node`, consuming the set.
    pub(crate) fn subdivide<S>(
        &mut self,
        scene: &mut S,
        node: NodeHandle,
        mut triangles: TriangleArraySet,
        progress: &mut Progress,
    ) -> Result<()>
    where
        S: SceneGraph + ?Sized,
    {
        if progress.set_task_progress(self.finished_triangle_count(), self.initial_triangle_count) {
            return Err(Error::Cancelled);
        }

        scene.set_world_geometry(node, true);

        let count = triangles.triangle_count();
        let aabb = match triangles.bounds() {
            Some(aabb) if count > self.threshold => aabb,
            _ => {
                self.make_leaf(node, &mut triangles);
                return Ok(());
            }
        };

        let plane = choose_split_plane(&aabb);
        let overgrowth = overgrowth_limit(&plane, &aabb, self.max_overgrowth);

        let (front, back) = divide_triangles(&plane, &triangles, overgrowth, progress)?;
        log::debug!(
            "Divided {} triangles into {} in front and {} behind",
            count,
            front.triangle_count(),
            back.triangle_count()
        );

        // An empty side means the other child would see the same triangles again
        if front.is_empty() || back.is_empty() {
            log::warn!(
                "Subdivision made no progress on a node with {} triangles, keeping it as a leaf",
                count
            );
            self.make_leaf(node, &mut triangles);
            return Ok(());
        }
        triangles.clear();

        for side in [front, back] {
            let child = scene.create_culling_node(Some(node));
            scene.set_internal(child, true);
            self.subdivide(scene, child, side, progress)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CullingScene;
    use crate::vertex::write_point;
    use crate::VertexLayout;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn p(x: f32, y: f32, z: f32) -> Point3<f32> {
        Point3::new(x, y, z)
    }

    fn make_set(triangles: &[[Point3<f32>; 3]]) -> TriangleArraySet {
        let mut array = TriangleArray::with_layout(VertexLayout::position_only()).unwrap();
        for corners in triangles {
            let records: Vec<Vec<u8>> = corners
                .iter()
                .map(|&corner| {
                    let mut record = vec![0u8; 12];
                    write_point(&mut record, 0, corner);
                    record
                })
                .collect();
            array
                .add_triangle(&records[0], &records[1], &records[2], "rock", "")
                .unwrap();
        }
        TriangleArraySet::from(array)
    }

    #[test]
    fn split_plane_follows_largest_axis() {
        let wide = Aabb::new(p(0.0, 0.0, 0.0), p(4.0, 2.0, 2.0));
        let plane = choose_split_plane(&wide);
        assert_eq!(plane.normal(), Vector3::x());
        assert_relative_eq!(plane.offset(), 2.0);

        let tall = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 3.0, 2.0));
        assert_eq!(choose_split_plane(&tall).normal(), Vector3::y());

        // Ties fall through to Z
        let cube = Aabb::new(p(-1.0, -1.0, -1.0), p(1.0, 1.0, 1.0));
        assert_eq!(choose_split_plane(&cube).normal(), Vector3::z());
        let flat = Aabb::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 1.0));
        assert_eq!(choose_split_plane(&flat).normal(), Vector3::z());
    }

    #[test]
    fn overgrowth_is_a_tenth_of_the_nearer_half() {
        let aabb = Aabb::new(p(0.0, 0.0, 0.0), p(100.0, 1.0, 1.0));
        let plane = choose_split_plane(&aabb);
        assert_relative_eq!(overgrowth_limit(&plane, &aabb, 10.0), 5.0);
        assert_relative_eq!(overgrowth_limit(&plane, &aabb, 2.0), 2.0);
    }

    #[test]
    fn slightly_spanning_triangle_is_not_split() {
        let set = make_set(&[
            // Reaches 0.2 behind x = 0 and 3 in front
            [p(-0.2, 0.0, 0.0), p(3.0, 0.0, 0.0), p(3.0, 1.0, 0.0)],
            // Reaches 0.2 in front and 3 behind
            [p(0.2, 0.0, 0.0), p(-3.0, 0.0, 0.0), p(-3.0, 1.0, 0.0)],
        ]);
        let plane = Plane3D::new(Vector3::x(), 0.0);

        let (front, back) = divide_triangles(&plane, &set, 0.5, &mut Progress::new()).unwrap();
        assert_eq!(front.triangle_count(), 1);
        assert_eq!(back.triangle_count(), 1);
        assert_eq!(front[0].triangle(0).position(0), p(-0.2, 0.0, 0.0));
    }

    #[test]
    fn spanning_triangle_splits_without_overgrowth() {
        let set = make_set(&[[p(-2.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.5, 2.0, 0.0)]]);
        let plane = Plane3D::new(Vector3::x(), 0.0);

        let (front, back) = divide_triangles(&plane, &set, 0.0, &mut Progress::new()).unwrap();
        assert_eq!(front.triangle_count() + back.triangle_count(), 3);
        for piece in front[0].iter().chain(back[0].iter()) {
            assert_eq!(piece.material(), "rock");
        }
    }

    #[test]
    fn close_vertex_splits_into_two_pieces() {
        // The apex is 0.1 in front of x = 0, within an overgrowth of 0.5,
        // but the triangle reaches 2 units into both sides
        let set = make_set(&[[p(-2.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.1, 2.0, 0.0)]]);
        let plane = Plane3D::new(Vector3::x(), 0.0);

        let (front, back) = divide_triangles(&plane, &set, 0.5, &mut Progress::new()).unwrap();
        assert_eq!(front.triangle_count(), 1);
        assert_eq!(back.triangle_count(), 1);

        let area: f32 = front[0].iter().chain(back[0].iter()).map(|t| t.area()).sum();
        assert_relative_eq!(area, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn division_is_cancellable() {
        let set = make_set(&[[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)]]);
        let mut progress = Progress::new();
        progress.cancel();

        let err = divide_triangles(&Plane3D::new(Vector3::x(), 0.5), &set, 0.0, &mut progress)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn identical_triangles_stop_subdividing() {
        let triangle = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let set = make_set(&vec![triangle; 60]);

        let mut scene = CullingScene::new();
        let root = scene.create_culling_node(None);
        let mut subdivider = Subdivider::new(50, 10.0, 60);
        subdivider.subdivide(&mut scene, root, set, &mut Progress::new()).unwrap();

        let leaves = subdivider.into_leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].triangle_count(), 60);
        assert_eq!(scene.node_count(), 1);
    }
}
