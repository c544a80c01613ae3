//! A set of triangle arrays, one per distinct vertex layout.

use std::ops::{Index, IndexMut};

use nalgebra::Matrix4;

use crate::error::Result;
use crate::triangle_array::unique;
use crate::{Aabb, Progress, TriangleArray, VertexLayout};

/// Triangle soup spread over arrays with distinct vertex layouts.
///
/// No two arrays in a set share a layout, so every triangle with a given
/// layout lives in exactly one array.
#[derive(Debug, Clone, Default)]
pub struct TriangleArraySet {
    arrays: Vec<TriangleArray>,
}

impl TriangleArraySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of arrays.
    #[inline]
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Returns the total number of triangles across every array.
    pub fn triangle_count(&self) -> usize {
        self.arrays.iter().map(TriangleArray::len).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TriangleArray> {
        self.arrays.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TriangleArray> {
        self.arrays.iter_mut()
    }

    /// Returns the index of the array using `layout`, if there is one.
    pub fn position_of(&self, layout: &VertexLayout) -> Option<usize> {
        self.arrays.iter().position(|array| array.layout() == layout)
    }

    /// Returns the index of the array using `layout`, creating an empty one if needed.
    pub fn find_or_create_index(&mut self, layout: &VertexLayout) -> Result<usize> {
        if let Some(index) = self.position_of(layout) {
            return Ok(index);
        }

        self.arrays.push(TriangleArray::with_layout(layout.clone())?);
        Ok(self.arrays.len() - 1)
    }

    /// Returns the array using `layout`, creating an empty one if needed.
    pub fn find_or_create_by_layout(
        &mut self,
        layout: &VertexLayout,
    ) -> Result<&mut TriangleArray> {
        let index = self.find_or_create_index(layout)?;
        Ok(&mut self.arrays[index])
    }

    /// Adds an array, merging it into an existing array with the same layout.
    pub fn push(&mut self, array: TriangleArray) -> Result<()> {
        match self.position_of(array.layout()) {
            Some(index) => self.arrays[index].append(&array),
            None => {
                self.arrays.push(array);
                Ok(())
            }
        }
    }

    /// Removes and returns the array at `index`.
    pub fn remove(&mut self, index: usize) -> TriangleArray {
        self.arrays.remove(index)
    }

    /// Drops arrays that hold no triangles.
    pub fn remove_empty_arrays(&mut self) {
        self.arrays.retain(|array| !array.is_empty());
    }

    pub fn clear(&mut self) {
        self.arrays.clear();
    }

    /// Moves every array out of this set, leaving it empty.
    pub fn transfer(&mut self) -> TriangleArraySet {
        std::mem::take(self)
    }

    /// Returns the unique material names across every array, in first-seen order.
    pub fn materials(&self) -> Vec<String> {
        unique(
            self.arrays
                .iter()
                .flat_map(|array| array.iter().map(|triangle| triangle.material())),
        )
    }

    /// Returns the unique lightmap names across every array, in first-seen order.
    pub fn lightmaps(&self) -> Vec<String> {
        unique(
            self.arrays
                .iter()
                .flat_map(|array| array.iter().map(|triangle| triangle.lightmap())),
        )
    }

    /// Returns the bounding box of every triangle corner, or `None` for an empty set.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(
            self.arrays
                .iter()
                .flat_map(|array| array.iter())
                .flat_map(|triangle| triangle.positions()),
        )
    }

    /// Transforms every vertex position of every array.
    pub fn transform_positions(&mut self, transform: &Matrix4<f32>) {
        for array in &mut self.arrays {
            array.transform_positions(transform);
        }
    }

    /// Removes degenerate triangles from every array, returning the total removed.
    pub fn remove_degenerate_triangles(&mut self, progress: &mut Progress) -> Result<usize> {
        let mut removed = 0;
        let count = self.arrays.len() as f32;

        for array in &mut self.arrays {
            progress.begin_task("removing degenerate triangles", 100.0 / count);
            let result = array.remove_degenerate_triangles(progress);
            progress.end_task();
            removed += result?;
        }

        Ok(removed)
    }
}

impl Index<usize> for TriangleArraySet {
    type Output = TriangleArray;

    fn index(&self, index: usize) -> &Self::Output {
        &self.arrays[index]
    }
}

impl IndexMut<usize> for TriangleArraySet {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.arrays[index]
    }
}

impl<'a> IntoIterator for &'a TriangleArraySet {
    type Item = &'a TriangleArray;
    type IntoIter = std::slice::Iter<'a, TriangleArray>;

    fn into_iter(self) -> Self::IntoIter {
        self.arrays.iter()
    }
}

impl From<TriangleArray> for TriangleArraySet {
    fn from(array: TriangleArray) -> Self {
        Self {
            arrays: vec![array],
        }
    }
}
