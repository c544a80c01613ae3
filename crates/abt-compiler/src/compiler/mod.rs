//! Compiling triangle soup into a culling hierarchy.
//!
//! [`AbtCompiler::compile`] runs the whole pipeline:
//!
//! 1. Triangles with a region material are pulled out of the soup and grouped
//!    into one [`Region`] per material.
//! 2. The rest is recursively divided by axis aligned planes into an adaptive
//!    binary tree of culling nodes until each leaf holds few enough triangles.
//! 3. Each leaf's triangles are handed to a [`MeshCompiler`] and the resulting
//!    meshes are embedded in the scene and attached to the leaf's node.
//!
//! ```
//! use abt_compiler::{AbtCompiler, CompilerConfig, CullingScene, IndexedMeshCompiler};
//! use abt_compiler::{Progress, TriangleArraySet};
//!
//! let compiler = AbtCompiler::new(CompilerConfig::default());
//! let mut scene = CullingScene::new();
//! let mut progress = Progress::new();
//!
//! let report = compiler
//!     .compile(&mut scene, TriangleArraySet::new(), &mut IndexedMeshCompiler, &mut progress)
//!     .unwrap();
//! assert_eq!(report.leaf_count, 0);
//! ```

mod nodes;
mod subdivide;

pub use nodes::LIGHTMAP_PARAMETER;
pub use subdivide::{choose_split_plane, divide_triangles, overgrowth_limit, CompileNode};

use std::collections::BTreeMap;

use crate::config::CompilerConfig;
use crate::error::Result;
use crate::region::{is_region_material, Region};
use crate::scene::{NodeHandle, SceneGraph};
use crate::{MeshCompiler, Progress, RawTriangle, TriangleArraySet};

use subdivide::Subdivider;

/// Summary of a finished compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Identifier embedded in every mesh name of this compile
    pub guid: String,
    /// Triangles in the soup before anything was removed
    pub input_triangle_count: usize,
    /// Degenerate triangles dropped before subdividing
    pub degenerate_triangles_removed: usize,
    /// Leaves of the culling tree
    pub leaf_count: usize,
    /// Triangles across all leaves, including split pieces
    pub leaf_triangle_count: usize,
    /// Meshes embedded in the scene
    pub mesh_count: usize,
    /// Regions added to the scene
    pub region_count: usize,
}

/// The ABT scene compiler.
#[derive(Debug, Clone, Default)]
pub struct AbtCompiler {
    config: CompilerConfig,
}

impl AbtCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut CompilerConfig {
        &mut self.config
    }

    /// Compiles `soup` into `scene`.
    ///
    /// The scene is cleared first. On failure the scene keeps whatever was
    /// added before the error. Cancellation is reported as
    /// [`Error::Cancelled`](crate::Error::Cancelled) and is not logged as an error.
    pub fn compile<S, M>(
        &self,
        scene: &mut S,
        soup: TriangleArraySet,
        mesh_compiler: &mut M,
        progress: &mut Progress,
    ) -> Result<CompileReport>
    where
        S: SceneGraph + ?Sized,
        M: MeshCompiler + ?Sized,
    {
        let result = self.run(scene, soup, mesh_compiler, progress);

        if let Err(err) = &result {
            if !err.is_cancelled() {
                log::error!("{}", err);
            }
        }

        result
    }

    /// Subdivides `triangles` below `node` and returns the resulting leaves.
    ///
    /// New child nodes are created in `scene` as needed; front children are
    /// created before back children.
    pub fn subdivide<S>(
        &self,
        scene: &mut S,
        node: NodeHandle,
        triangles: TriangleArraySet,
        progress: &mut Progress,
    ) -> Result<Vec<CompileNode>>
    where
        S: SceneGraph + ?Sized,
    {
        let mut subdivider = Subdivider::new(
            self.config.triangle_recursion_threshold(),
            self.config.max_overgrowth,
            triangles.triangle_count(),
        );
        subdivider.subdivide(scene, node, triangles, progress)?;
        Ok(subdivider.into_leaves())
    }

    fn run<S, M>(
        &self,
        scene: &mut S,
        mut soup: TriangleArraySet,
        mesh_compiler: &mut M,
        progress: &mut Progress,
    ) -> Result<CompileReport>
    where
        S: SceneGraph + ?Sized,
        M: MeshCompiler + ?Sized,
    {
        scene.clear();

        let mut report = CompileReport {
            guid: create_guid(),
            input_triangle_count: soup.triangle_count(),
            ..CompileReport::default()
        };

        if report.input_triangle_count == 0 {
            return Ok(report);
        }

        progress.begin_task("extracting regions", 5.0);

        progress.begin_task("collecting region triangles", 50.0);
        let regions = extract_regions(&mut soup, progress)?;
        progress.end_task();

        if self.config.remove_degenerate_triangles {
            progress.begin_task("cleaning up", 50.0);
            report.degenerate_triangles_removed = soup.remove_degenerate_triangles(progress)?;
            progress.end_task();
            soup.remove_empty_arrays();
        }

        progress.end_task();

        progress.begin_task("subdividing", 15.0);
        let root = scene.create_culling_node(None);
        let leaves = self.subdivide(scene, root, soup, progress)?;
        progress.end_task();

        report.leaf_count = leaves.len();
        report.leaf_triangle_count = leaves.iter().map(CompileNode::triangle_count).sum();

        report.mesh_count = nodes::compile_nodes(
            scene,
            leaves,
            &report.guid,
            self.config.lighting_type,
            mesh_compiler,
            progress,
        )?;

        for (name, triangles) in regions {
            progress.check()?;
            log::info!("Compiling region: '{}' with {} triangles", name, triangles.len());
            scene.add_region(Region::from_raw_triangles(name, triangles));
            report.region_count += 1;
        }

        log::info!(
            "Compiled {} triangles into {} leaves with {} meshes",
            report.input_triangle_count,
            report.leaf_count,
            report.mesh_count
        );

        Ok(report)
    }
}

/// Removes region triangles from the soup, grouped by material name.
fn extract_regions(
    soup: &mut TriangleArraySet,
    progress: &mut Progress,
) -> Result<BTreeMap<String, Vec<RawTriangle>>> {
    let mut regions: BTreeMap<String, Vec<RawTriangle>> = BTreeMap::new();
    let total = soup.len();

    for (i, array) in soup.iter_mut().enumerate() {
        for triangle in array.iter() {
            progress.check()?;

            if is_region_material(triangle.material()) {
                regions
                    .entry(triangle.material().to_string())
                    .or_default()
                    .push(triangle.raw());
            }
        }

        array.retain_triangles(|triangle| !is_region_material(triangle.material()));
        progress.set_task_progress(i + 1, total);
    }

    soup.remove_empty_arrays();
    Ok(regions)
}

fn create_guid() -> String {
    let bits: u128 = rand::random();
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        bits >> 96,
        (bits >> 80) & 0xffff,
        (bits >> 64) & 0xffff,
        (bits >> 48) & 0xffff,
        bits & 0xffff_ffff_ffff
    )
}
