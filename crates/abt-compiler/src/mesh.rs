//! Compiling triangle sets into indexed meshes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Aabb, Progress, RawIndexedTriangle, TriangleArray, TriangleArraySet, VertexLayout};

/// Directory embedded meshes are stored under.
pub const MESH_DIRECTORY: &str = "Meshes/";

/// File extension of embedded meshes.
pub const MESH_EXTENSION: &str = ".mesh";

/// Returns the resource path an embedded mesh called `name` is stored at.
pub fn mesh_resource_path(name: &str) -> String {
    format!("{MESH_DIRECTORY}{name}{MESH_EXTENSION}")
}

/// Errors reported by a [`MeshCompiler`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A vertex position was NaN or infinite
    #[error("triangle {triangle} has a non-finite vertex position")]
    NonFiniteVertex {
        /// Index of the triangle within its array
        triangle: usize,
    },

    /// The mesh needs more vertices than a 32 bit index can address
    #[error("mesh vertex count exceeds the 32 bit index range")]
    VertexCountOverflow,

    /// Compilation was cancelled
    #[error("mesh compilation cancelled")]
    Cancelled,

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

/// Turns a set of triangles into a renderable mesh.
pub trait MeshCompiler {
    /// Compiles every triangle in `triangles` into one mesh.
    ///
    /// Implementations should poll `progress` and return [`MeshError::Cancelled`]
    /// once cancellation is requested.
    fn compile(
        &mut self,
        triangles: &TriangleArraySet,
        progress: &mut Progress,
    ) -> Result<CompiledMesh, MeshError>;
}

impl<F> MeshCompiler for F
where
    F: FnMut(&TriangleArraySet, &mut Progress) -> Result<CompiledMesh, MeshError>,
{
    fn compile(
        &mut self,
        triangles: &TriangleArraySet,
        progress: &mut Progress,
    ) -> Result<CompiledMesh, MeshError> {
        self(triangles, progress)
    }
}

/// A range of indices drawn with one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawItem {
    pub material: String,
    pub index_start: u32,
    pub index_count: u32,
}

/// Indexed geometry sharing a single vertex layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryChunk {
    pub layout: VertexLayout,
    pub vertex_data: Vec<u8>,
    pub vertex_count: u32,
    pub indices: Vec<u32>,
    pub draw_items: Vec<DrawItem>,
}

/// A compiled mesh: geometry chunks plus named string parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledMesh {
    pub chunks: Vec<GeometryChunk>,
    pub bounds: Option<Aabb>,
    parameters: BTreeMap<String, String>,
}

impl CompiledMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a named parameter, replacing any earlier value.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Returns the number of triangles across every chunk.
    pub fn triangle_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.indices.len() / 3).sum()
    }

    /// Returns the number of unique vertices across every chunk.
    pub fn vertex_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.vertex_count as usize).sum()
    }
}

/// Reference mesh compiler producing one indexed chunk per vertex layout.
///
/// Byte-identical vertex records are welded into one vertex. Triangles are
/// grouped into draw items by material in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedMeshCompiler;

impl IndexedMeshCompiler {
    pub fn new() -> Self {
        Self
    }

    fn compile_array(
        array: &TriangleArray,
        bounds: &mut Option<Aabb>,
        progress: &mut Progress,
    ) -> Result<GeometryChunk, MeshError> {
        let mut vertex_data = Vec::new();
        let mut welded: HashMap<&[u8], u32> = HashMap::new();
        let mut groups: Vec<(&str, Vec<RawIndexedTriangle>)> = Vec::new();
        let total = array.len();

        for (i, triangle) in array.iter().enumerate() {
            if progress.set_task_progress(i, total) {
                return Err(MeshError::Cancelled);
            }
            if !triangle.is_finite() {
                return Err(MeshError::NonFiniteVertex { triangle: i });
            }

            let mut indexed = RawIndexedTriangle::default();
            for v in 0..3 {
                let record = triangle.vertex_data(v);
                let next = welded.len();
                let index = match welded.get(record) {
                    Some(&index) => index,
                    None => {
                        let index =
                            u32::try_from(next).map_err(|_| MeshError::VertexCountOverflow)?;
                        welded.insert(record, index);
                        vertex_data.extend_from_slice(record);

                        let position = triangle.position(v);
                        match bounds {
                            Some(aabb) => aabb.add_point(position),
                            None => *bounds = Some(Aabb::from_point(position)),
                        }
                        index
                    }
                };
                indexed.set_index(v, index);
            }

            let material = triangle.material();
            match groups.iter_mut().find(|(name, _)| *name == material) {
                Some((_, triangles)) => triangles.push(indexed),
                None => groups.push((material, vec![indexed])),
            }
        }

        let mut indices = Vec::with_capacity(total * 3);
        let mut draw_items = Vec::with_capacity(groups.len());

        for (material, triangles) in groups {
            let index_start = indices.len() as u32;
            indices.extend(triangles.iter().flat_map(RawIndexedTriangle::indices));
            draw_items.push(DrawItem {
                material: material.to_string(),
                index_start,
                index_count: indices.len() as u32 - index_start,
            });
        }

        Ok(GeometryChunk {
            layout: array.layout().clone(),
            vertex_count: welded.len() as u32,
            vertex_data,
            indices,
            draw_items,
        })
    }
}

impl MeshCompiler for IndexedMeshCompiler {
    fn compile(
        &mut self,
        triangles: &TriangleArraySet,
        progress: &mut Progress,
    ) -> Result<CompiledMesh, MeshError> {
        let mut mesh = CompiledMesh::new();
        let arrays: Vec<&TriangleArray> = triangles.iter().filter(|a| !a.is_empty()).collect();
        let weight = 100.0 / arrays.len().max(1) as f32;

        for array in arrays {
            progress.begin_task("building mesh", weight);
            let chunk = Self::compile_array(array, &mut mesh.bounds, progress);
            progress.end_task();
            mesh.chunks.push(chunk?);
        }

        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::write_point;
    use nalgebra::Point3;

    fn record(x: f32, y: f32, z: f32) -> Vec<u8> {
        let mut record = vec![0u8; 12];
        write_point(&mut record, 0, Point3::new(x, y, z));
        record
    }

    fn quad() -> TriangleArraySet {
        let mut array = TriangleArray::with_layout(VertexLayout::position_only()).unwrap();
        let (a, b, c, d) = (
            record(0.0, 0.0, 0.0),
            record(1.0, 0.0, 0.0),
            record(1.0, 1.0, 0.0),
            record(0.0, 1.0, 0.0),
        );
        array.add_triangle(&a, &b, &c, "floor", "").unwrap();
        array.add_triangle(&a, &c, &d, "floor", "").unwrap();
        array.add_triangle(&a, &b, &d, "trim", "").unwrap();
        TriangleArraySet::from(array)
    }

    #[test]
    fn resource_paths() {
        assert_eq!(mesh_resource_path("3_1"), "Meshes/3_1.mesh");
    }

    #[test]
    fn welds_vertices_and_groups_materials() {
        let mesh = IndexedMeshCompiler
            .compile(&quad(), &mut Progress::new())
            .unwrap();

        assert_eq!(mesh.chunks.len(), 1);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 3);

        let chunk = &mesh.chunks[0];
        assert_eq!(chunk.vertex_data.len(), 4 * 12);
        assert_eq!(chunk.indices, vec![0, 1, 2, 0, 2, 3, 0, 1, 3]);
        assert_eq!(
            chunk.draw_items,
            vec![
                DrawItem { material: "floor".into(), index_start: 0, index_count: 6 },
                DrawItem { material: "trim".into(), index_start: 6, index_count: 3 },
            ]
        );

        let bounds = mesh.bounds.unwrap();
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        let mut array = TriangleArray::with_layout(VertexLayout::position_only()).unwrap();
        let (a, b) = (record(0.0, 0.0, 0.0), record(f32::NAN, 0.0, 0.0));
        array.add_triangle(&a, &b, &a, "", "").unwrap();

        let err = IndexedMeshCompiler
            .compile(&TriangleArraySet::from(array), &mut Progress::new())
            .unwrap_err();
        assert_eq!(err, MeshError::NonFiniteVertex { triangle: 0 });
    }

    #[test]
    fn cancellation_stops_compilation() {
        let mut progress = Progress::new();
        progress.cancel();
        let err = IndexedMeshCompiler.compile(&quad(), &mut progress).unwrap_err();
        assert_eq!(err, MeshError::Cancelled);
        assert_eq!(progress.depth(), 0);
    }

    #[test]
    fn closures_are_mesh_compilers() {
        let mut calls = 0;
        let mut compiler = |set: &TriangleArraySet, _: &mut Progress| {
            calls += 1;
            let mut mesh = CompiledMesh::new();
            mesh.set_parameter("triangles", set.triangle_count().to_string());
            Ok::<_, MeshError>(mesh)
        };

        let mesh = compiler.compile(&quad(), &mut Progress::new()).unwrap();
        assert_eq!(mesh.parameter("triangles"), Some("3"));
        assert_eq!(mesh.parameter("lightMap"), None);
        assert_eq!(calls, 1);
    }
}
