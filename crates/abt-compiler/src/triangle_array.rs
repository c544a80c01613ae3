//! Triangle soup storage for a single vertex layout.

use nalgebra::{Matrix4, Point3};

use crate::error::{Error, Result};
use crate::vertex::{read_point, write_point};
use crate::{Progress, Triangle, TriangleRef, VertexLayout};

/// Minimum vertex capacity allocated once the buffer first grows.
const MIN_VERTEX_CAPACITY: u32 = 64;

/// An array of triangles that all share one vertex layout.
///
/// Vertex records live in a single byte buffer. Triangles appended with raw
/// vertex data always add three fresh records, so the used vertex count is a
/// multiple of three and every triangle index is below it.
#[derive(Debug, Clone, Default)]
pub struct TriangleArray {
    layout: VertexLayout,
    vertex_size: usize,
    position_offset: Option<usize>,
    vertex_data: Vec<u8>,
    vertex_capacity: u32,
    used_vertex_count: u32,
    triangles: Vec<Triangle>,
}

impl TriangleArray {
    /// Creates an empty array with no vertex layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty array using the given vertex layout.
    pub fn with_layout(layout: VertexLayout) -> Result<Self> {
        let mut array = Self::new();
        array.set_vertex_streams(layout)?;
        Ok(array)
    }

    /// Returns the vertex layout used by every triangle in this array.
    #[inline]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Sets the vertex layout. Only allowed while the array holds no triangles.
    pub fn set_vertex_streams(&mut self, layout: VertexLayout) -> Result<()> {
        if !self.triangles.is_empty() {
            return Err(Error::LayoutLocked);
        }

        let position_offset = layout.position_offset().ok_or(Error::MissingPositionStream)?;

        self.vertex_size = layout.vertex_size();
        self.position_offset = Some(position_offset);
        self.layout = layout;
        self.vertex_data.clear();
        self.vertex_capacity = 0;
        self.used_vertex_count = 0;

        Ok(())
    }

    /// Erases all triangles and vertex data, keeping the layout.
    pub fn clear(&mut self) {
        self.triangles.clear();
        self.vertex_data = Vec::new();
        self.vertex_capacity = 0;
        self.used_vertex_count = 0;
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns the number of vertex records in use.
    #[inline]
    pub fn used_vertex_count(&self) -> u32 {
        self.used_vertex_count
    }

    /// Returns the number of vertex records the buffer can hold before growing.
    #[inline]
    pub fn vertex_capacity(&self) -> u32 {
        self.vertex_capacity
    }

    /// Returns the triangle record at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    /// Returns a mutable triangle record, for retagging materials and lightmaps.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Triangle> {
        self.triangles.get_mut(index)
    }

    /// Returns a view of the triangle at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn triangle(&self, index: usize) -> TriangleRef<'_> {
        TriangleRef {
            array: self,
            triangle: &self.triangles[index],
        }
    }

    /// Iterates over views of every triangle.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = TriangleRef<'_>> + '_ {
        self.triangles.iter().map(move |triangle| TriangleRef {
            array: self,
            triangle,
        })
    }

    /// Returns the vertex record at `index`, or `None` if it is not in use.
    pub fn vertex_data(&self, index: u32) -> Option<&[u8]> {
        (index < self.used_vertex_count).then(|| self.vertex_bytes(index))
    }

    pub(crate) fn vertex_bytes(&self, index: u32) -> &[u8] {
        let start = index as usize * self.vertex_size;
        &self.vertex_data[start..start + self.vertex_size]
    }

    pub(crate) fn vertex_position(&self, index: u32) -> Point3<f32> {
        let offset = self.position_offset.unwrap_or_default();
        read_point(self.vertex_bytes(index), offset)
    }

    /// Adds a triangle over three vertex records that are already in the array.
    pub fn add_triangle_indexed(
        &mut self,
        index0: u32,
        index1: u32,
        index2: u32,
        material: &str,
        lightmap: &str,
    ) -> Result<()> {
        let used = self.used_vertex_count;
        if let Some(&index) = [index0, index1, index2].iter().find(|&&i| i >= used) {
            log::error!("Vertex index out of range");
            return Err(Error::VertexIndexOutOfRange { index, used });
        }

        self.triangles
            .push(Triangle::new([index0, index1, index2], material, lightmap));
        Ok(())
    }

    /// Adds a triangle by copying three raw vertex records laid out with this
    /// array's layout.
    pub fn add_triangle(
        &mut self,
        v0: &[u8],
        v1: &[u8],
        v2: &[u8],
        material: &str,
        lightmap: &str,
    ) -> Result<()> {
        if self.position_offset.is_none() {
            return Err(Error::MissingPositionStream);
        }
        for vertex in [v0, v1, v2] {
            if vertex.len() != self.vertex_size {
                return Err(Error::VertexSizeMismatch {
                    expected: self.vertex_size,
                    actual: vertex.len(),
                });
            }
        }

        self.reserve_vertices(3)?;

        for vertex in [v0, v1, v2] {
            self.vertex_data.extend_from_slice(vertex);
        }

        let first = self.used_vertex_count;
        self.used_vertex_count += 3;
        self.triangles.push(Triangle::new(
            [first, first + 1, first + 2],
            material,
            lightmap,
        ));

        Ok(())
    }

    /// Adds a copy of a triangle from another array with an identical layout.
    pub fn add_triangle_from(&mut self, triangle: &TriangleRef<'_>) -> Result<()> {
        if self.layout != *triangle.array().layout() {
            log::error!("Vertex stream layout mismatch, can't add triangle to array");
            return Err(Error::LayoutMismatch);
        }

        self.add_triangle(
            triangle.vertex_data(0),
            triangle.vertex_data(1),
            triangle.vertex_data(2),
            triangle.material(),
            triangle.lightmap(),
        )
    }

    /// Appends copies of every triangle in `other`, which must share this layout.
    pub fn append(&mut self, other: &TriangleArray) -> Result<()> {
        if self.layout != other.layout {
            return Err(Error::LayoutMismatch);
        }

        self.reserve(other.len());
        for triangle in other.iter() {
            self.add_triangle_from(&triangle)?;
        }
        Ok(())
    }

    /// Hints that `additional` more triangles are about to be added.
    pub fn reserve(&mut self, additional: usize) {
        self.triangles.reserve(additional);
    }

    /// Erases and returns the triangle at `index`. Its vertex records stay in the buffer.
    pub fn erase(&mut self, index: usize) -> Triangle {
        self.triangles.remove(index)
    }

    /// Keeps only the triangles for which `keep` returns `true`, preserving order.
    pub fn retain_triangles<F>(&mut self, mut keep: F)
    where
        F: FnMut(&TriangleRef<'_>) -> bool,
    {
        let flags: Vec<bool> = self.iter().map(|triangle| keep(&triangle)).collect();
        let mut flags = flags.into_iter();
        self.triangles.retain(|_| flags.next().unwrap_or(true));
    }

    /// Removes zero-area and non-finite triangles, returning how many were removed.
    ///
    /// Polls `progress` once per triangle; a cancellation leaves the array untouched.
    pub fn remove_degenerate_triangles(&mut self, progress: &mut Progress) -> Result<usize> {
        let total = self.len();
        let mut keep = Vec::with_capacity(total);

        for (i, triangle) in self.iter().enumerate() {
            keep.push(!triangle.is_degenerate());

            if progress.set_task_progress(i + 1, total) {
                return Err(Error::Cancelled);
            }
        }

        let removed = keep.iter().filter(|&&kept| !kept).count();
        if removed > 0 {
            let mut keep = keep.into_iter();
            self.triangles.retain(|_| keep.next().unwrap_or(true));
            log::info!("Removed {} degenerate triangles from array", removed);
        }

        Ok(removed)
    }

    /// Transforms every vertex position by a 4x4 matrix.
    pub fn transform_positions(&mut self, transform: &Matrix4<f32>) {
        let Some(offset) = self.position_offset else {
            return;
        };

        for record in self.vertex_data.chunks_exact_mut(self.vertex_size) {
            let position = read_point(record, offset);
            write_point(record, offset, transform.transform_point(&position));
        }
    }

    /// Returns the unique material names used by the triangles, in first-seen order.
    pub fn materials(&self) -> Vec<String> {
        unique(self.triangles.iter().map(Triangle::material))
    }

    /// Returns the unique lightmap names used by the triangles, in first-seen order.
    pub fn lightmaps(&self) -> Vec<String> {
        unique(self.triangles.iter().map(Triangle::lightmap))
    }

    fn reserve_vertices(&mut self, count: u32) -> Result<()> {
        let needed = self
            .used_vertex_count
            .checked_add(count)
            .ok_or(Error::VertexCountOverflow)?;

        if needed > self.vertex_capacity {
            let capacity = self
                .vertex_capacity
                .saturating_mul(2)
                .max(MIN_VERTEX_CAPACITY)
                .max(needed);

            let additional = (capacity - self.used_vertex_count) as usize * self.vertex_size;
            if let Err(err) = self.vertex_data.try_reserve_exact(additional) {
                log::error!("Failed changing vertex count");
                return Err(err.into());
            }
            self.vertex_capacity = capacity;
        }

        Ok(())
    }
}

pub(crate) fn unique<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for name in names {
        if !result.iter().any(|existing| existing == name) {
            result.push(name.to_string());
        }
    }
    result
}
