//! Splitting stored triangles by a plane.

use crate::error::Result;
use crate::{Plane3D, PlaneSide, TriangleArray, TriangleRef};

impl TriangleRef<'_> {
    /// Splits this triangle by a plane into front and back pieces.
    ///
    /// Walks the three edges; an edge whose endpoints lie strictly on opposite
    /// sides gets a new vertex at the crossing, interpolated across every vertex
    /// stream and added to both sides. Vertices on the plane go to both sides,
    /// and an edge with only one endpoint on the plane is never cut. Each side
    /// ends up with three or four points and is triangulated as a fan.
    ///
    /// Both returned arrays use this triangle's layout and every piece keeps its
    /// material and lightmap.
    pub fn split(&self, plane: &Plane3D) -> Result<(TriangleArray, TriangleArray)> {
        let layout = self.array().layout();
        let vertex_size = layout.vertex_size();

        let mut front_verts: Vec<Vec<u8>> = Vec::with_capacity(4);
        let mut back_verts: Vec<Vec<u8>> = Vec::with_capacity(4);

        let positions = self.positions();
        let sides = positions.map(|p| plane.classify_point(p));

        for i in 0..3 {
            let next = (i + 1) % 3;
            let current = self.vertex_data(i);

            match sides[i] {
                PlaneSide::Front => front_verts.push(current.to_vec()),
                PlaneSide::Back => back_verts.push(current.to_vec()),
                PlaneSide::OnPlane => {
                    front_verts.push(current.to_vec());
                    back_verts.push(current.to_vec());
                }
            }

            let crosses = matches!(
                (sides[i], sides[next]),
                (PlaneSide::Front, PlaneSide::Back) | (PlaneSide::Back, PlaneSide::Front)
            );

            if crosses {
                let fraction = plane
                    .intersect_segment(positions[i], positions[next])
                    .unwrap_or_else(|| {
                        log::warn!("Triangle split failed to intersect edge with plane");
                        0.0
                    });

                let mut intersection = vec![0u8; vertex_size];
                layout.interpolate(current, self.vertex_data(next), &mut intersection, fraction);

                front_verts.push(intersection.clone());
                back_verts.push(intersection);
            }
        }

        let mut front = TriangleArray::with_layout(layout.clone())?;
        let mut back = TriangleArray::with_layout(layout.clone())?;

        self.add_fan(&mut front, &front_verts)?;
        self.add_fan(&mut back, &back_verts)?;

        Ok((front, back))
    }

    fn add_fan(&self, target: &mut TriangleArray, points: &[Vec<u8>]) -> Result<()> {
        if points.len() < 3 {
            return Ok(());
        }

        for i in 1..points.len() - 1 {
            target.add_triangle(
                &points[0],
                &points[i],
                &points[i + 1],
                self.material(),
                self.lightmap(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::vertex::write_point;
    use crate::{Plane3D, StreamKind, TriangleArray, VertexLayout, VertexStream};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn textured_layout() -> VertexLayout {
        VertexLayout::new(vec![
            VertexStream::new(StreamKind::Position, 3),
            VertexStream::new(StreamKind::DiffuseTextureCoordinate, 2),
        ])
    }

    /// Builds a single triangle whose texture coordinates mirror x and y.
    fn make_triangle(corners: [[f32; 3]; 3]) -> TriangleArray {
        let mut array = TriangleArray::with_layout(textured_layout()).unwrap();
        let records: Vec<Vec<u8>> = corners
            .iter()
            .map(|&[x, y, z]| bytemuck::cast_slice(&[x, y, z, x, y]).to_vec())
            .collect();
        array
            .add_triangle(&records[0], &records[1], &records[2], "brick", "lm_1")
            .unwrap();
        array
    }

    fn total_area(array: &TriangleArray) -> f32 {
        array.iter().map(|triangle| triangle.area()).sum()
    }

    #[test]
    fn flat_plane_split() {
        let array = make_triangle([[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]]);
        let plane = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 1.0);

        let (front, back) = array.triangle(0).split(&plane).unwrap();

        // x > 1 is a single corner, x < 1 is a quad fanned into two triangles
        assert_eq!(front.len(), 1);
        assert_eq!(back.len(), 2);

        for triangle in front.iter() {
            assert!(triangle.positions().iter().all(|p| p.x >= 1.0 - 1e-5));
        }
        for triangle in back.iter() {
            assert!(triangle.positions().iter().all(|p| p.x <= 1.0 + 1e-5));
        }
        assert!(back.iter().any(|t| t.positions().contains(&Point3::origin())));

        assert_relative_eq!(total_area(&front), 0.5, epsilon = 1e-5);
        assert_relative_eq!(total_area(&front) + total_area(&back), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn split_interpolates_every_stream() {
        let array = make_triangle([[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]]);
        let plane = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 1.0);

        let (front, back) = array.triangle(0).split(&plane).unwrap();

        for piece in front.iter().chain(back.iter()) {
            assert_eq!(piece.material(), "brick");
            assert_eq!(piece.lightmap(), "lm_1");

            for v in 0..3 {
                let position = piece.position(v);
                let uv: [f32; 2] = bytemuck::pod_read_unaligned(&piece.vertex_data(v)[12..20]);
                assert_relative_eq!(uv[0], position.x, epsilon = 1e-5);
                assert_relative_eq!(uv[1], position.y, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn split_keeps_winding() {
        let array = make_triangle([[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]]);
        let normal = array.triangle(0).normal();
        let plane = Plane3D::new(Vector3::new(1.0, 1.0, 0.0), 1.0);

        let (front, back) = array.triangle(0).split(&plane).unwrap();
        for piece in front.iter().chain(back.iter()) {
            assert_relative_eq!(piece.normal(), normal, epsilon = 1e-4);
        }
    }

    #[test]
    fn area_is_conserved() {
        let array = make_triangle([[-3.0, 1.0, 0.5], [4.0, -2.0, 1.5], [0.5, 5.0, -2.0]]);
        let original = array.triangle(0).area();

        let planes = [
            Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 0.3),
            Plane3D::new(Vector3::new(0.0, 1.0, 0.0), 1.7),
            Plane3D::new(Vector3::new(1.0, -2.0, 0.5), -0.25),
        ];

        for plane in &planes {
            let (front, back) = array.triangle(0).split(plane).unwrap();
            assert!(front.len() + back.len() == 3);
            assert_relative_eq!(
                total_area(&front) + total_area(&back),
                original,
                max_relative = 1e-4
            );
        }
    }

    #[test]
    fn vertex_on_plane_gives_two_pieces() {
        let array = make_triangle([[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
        let plane = Plane3D::new(Vector3::new(1.0, 0.0, 0.0), 1.0);

        let (front, back) = array.triangle(0).split(&plane).unwrap();

        assert_eq!(front.len(), 1);
        assert_eq!(back.len(), 1);
        assert_relative_eq!(total_area(&front), 1.0, epsilon = 1e-5);
        assert_relative_eq!(total_area(&back), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn position_only_layout_splits() {
        let mut array = TriangleArray::with_layout(VertexLayout::position_only()).unwrap();
        let records: Vec<Vec<u8>> = [[0.0, 0.0, 0.0], [0.0, 0.0, 4.0], [0.0, 4.0, 0.0]]
            .iter()
            .map(|&[x, y, z]| {
                let mut record = vec![0u8; 12];
                write_point(&mut record, 0, Point3::new(x, y, z));
                record
            })
            .collect();
        array
            .add_triangle(&records[0], &records[1], &records[2], "", "")
            .unwrap();

        let plane = Plane3D::new(Vector3::new(0.0, 0.0, 1.0), 2.0);
        let (front, back) = array.triangle(0).split(&plane).unwrap();

        assert_eq!(front.len(), 1);
        assert_eq!(back.len(), 2);
        assert_eq!(front.layout(), array.layout());
    }
}
