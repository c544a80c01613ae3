//! Error types for triangle containers and scene compilation.

use std::collections::TryReserveError;

use crate::mesh::MeshError;

/// Errors raised while building triangle containers or compiling a scene.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A triangle referenced a vertex that has not been added yet
    #[error("vertex index {index} out of range, {used} vertices in use")]
    VertexIndexOutOfRange {
        /// The offending index
        index: u32,
        /// The number of vertices currently in use
        used: u32,
    },

    /// Two containers with different vertex stream layouts were combined
    #[error("vertex stream layout mismatch, can't add triangle to array")]
    LayoutMismatch,

    /// The layout of a container that already holds triangles was changed
    #[error("vertex streams can only be changed on an empty triangle array")]
    LayoutLocked,

    /// A layout without a three component float position stream was used
    #[error("vertex layout has no 3 component float position stream")]
    MissingPositionStream,

    /// Raw vertex data did not match the layout's vertex size
    #[error("vertex data is {actual} bytes, the layout requires {expected}")]
    VertexSizeMismatch {
        /// The vertex size of the layout
        expected: usize,
        /// The size of the supplied vertex record
        actual: usize,
    },

    /// Growing the vertex buffer failed
    #[error("failed growing vertex buffer: {0}")]
    Allocation(#[from] TryReserveError),

    /// The vertex count no longer fits in a 32 bit index
    #[error("vertex count exceeds the 32 bit index range")]
    VertexCountOverflow,

    /// The mesh compiler rejected a leaf's triangles
    #[error("mesh setup failed on node {leaf}: {source}")]
    MeshCompile {
        /// One-based index of the leaf being compiled
        leaf: usize,
        /// The mesh compiler's error
        #[source]
        source: MeshError,
    },

    /// A BSP node referenced a child that is missing or not after it in the arena
    #[error("BSP node {node} has invalid child index {child}")]
    InvalidBspChild {
        /// Arena index of the parent node
        node: usize,
        /// The offending child index
        child: usize,
    },

    /// The operation was cancelled through its progress context
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns whether this is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
