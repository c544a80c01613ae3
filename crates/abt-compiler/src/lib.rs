//! ABT (adaptive binary tree) scene compiler.
//!
//! Turns a soup of triangles into a hierarchy of culling nodes. Leaves carry
//! meshes built from the triangles that fall inside them. Triangles whose
//! material marks them as a region are collected into closed volumes that
//! answer point containment queries through a BSP tree.
//!
//! The main entry points are [`TriangleArray`] / [`TriangleArraySet`] for the
//! input geometry, [`AbtCompiler`] for the compile itself, and
//! [`CullingScene`] as an in-memory [`SceneGraph`] receiving the result.

mod aabb;
pub mod compiler;
pub mod config;
mod error;
pub mod mesh;
mod plane;
mod progress;
pub mod region;
pub mod scene;
mod split;
mod triangle;
mod triangle_array;
mod triangle_set;
mod vertex;

pub use aabb::Aabb;
pub use compiler::{AbtCompiler, CompileNode, CompileReport};
pub use config::{CompilerConfig, Config, ConfigError, LightingType};
pub use error::{Error, Result};
pub use mesh::{CompiledMesh, DrawItem, GeometryChunk, IndexedMeshCompiler, MeshCompiler, MeshError};
pub use plane::{Classification, Plane3D, PlaneSide, PLANE_EPSILON};
pub use progress::{CancelToken, Progress};
pub use region::{Region, REGION_MATERIAL_PREFIX};
pub use scene::{CullingScene, NodeHandle, SceneGraph};
pub use triangle::{RawIndexedTriangle, RawTriangle, Triangle, TriangleRef, DEGENERATE_AREA};
pub use triangle_array::TriangleArray;
pub use triangle_set::TriangleArraySet;
pub use vertex::{DataType, StreamKind, VertexLayout, VertexStream};
