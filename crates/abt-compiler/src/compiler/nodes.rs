//! Compiling leaf triangles into meshes attached to culling nodes.

use crate::config::LightingType;
use crate::error::{Error, Result};
use crate::mesh::mesh_resource_path;
use crate::scene::SceneGraph;
use crate::{CompiledMesh, MeshCompiler, MeshError, Progress, TriangleArraySet};

use super::subdivide::CompileNode;

/// Share of the whole compile spent building meshes.
const NODE_COMPILE_PERCENTAGE: f32 = 80.0;

/// Parameter naming the lightmap texture of a mesh.
pub const LIGHTMAP_PARAMETER: &str = "lightMap";

/// Builds and attaches the meshes of every leaf, in leaf order.
///
/// Returns the number of meshes embedded in the scene. The first failure
/// aborts the whole run; meshes attached before it stay in the scene.
pub(crate) fn compile_nodes<S, M>(
    scene: &mut S,
    leaves: Vec<CompileNode>,
    guid: &str,
    lighting_type: LightingType,
    mesh_compiler: &mut M,
    progress: &mut Progress,
) -> Result<usize>
where
    S: SceneGraph + ?Sized,
    M: MeshCompiler + ?Sized,
{
    let total: usize = leaves.iter().map(CompileNode::triangle_count).sum();
    let leaf_count = leaves.len();
    let mut mesh_count = 0;

    for (i, leaf) in leaves.into_iter().enumerate() {
        progress.check()?;

        let count = leaf.triangle_count();
        if count == 0 {
            log::debug!("Skipping node {} with no triangles", i + 1);
            continue;
        }

        progress.begin_task(
            format!("node {}/{} with {} triangles", i + 1, leaf_count, count),
            NODE_COMPILE_PERCENTAGE * count as f32 / total as f32,
        );

        let compiled = match lighting_type {
            LightingType::PerPixel => {
                compile_per_pixel(scene, &leaf, i, guid, mesh_compiler, progress)
            }
            LightingType::Lightmap => {
                compile_per_lightmap(scene, &leaf, i, guid, mesh_compiler, progress)
            }
        };

        progress.end_task();
        mesh_count += compiled?;
    }

    Ok(mesh_count)
}

fn compile_per_pixel<S, M>(
    scene: &mut S,
    leaf: &CompileNode,
    index: usize,
    guid: &str,
    mesh_compiler: &mut M,
    progress: &mut Progress,
) -> Result<usize>
where
    S: SceneGraph + ?Sized,
    M: MeshCompiler + ?Sized,
{
    let mesh = build_mesh(mesh_compiler, leaf.triangles(), index, progress)?;

    embed(scene, leaf, format!(".scene/{guid}/{index}"), mesh);
    Ok(1)
}

fn compile_per_lightmap<S, M>(
    scene: &mut S,
    leaf: &CompileNode,
    index: usize,
    guid: &str,
    mesh_compiler: &mut M,
    progress: &mut Progress,
) -> Result<usize>
where
    S: SceneGraph + ?Sized,
    M: MeshCompiler + ?Sized,
{
    let lightmaps = leaf.triangles().lightmaps();
    let weight = 100.0 / lightmaps.len().max(1) as f32;

    for (k, lightmap) in lightmaps.iter().enumerate() {
        progress.check()?;

        // One sub-set per lightmap, spanning every vertex layout in the leaf
        let mut triangles = TriangleArraySet::new();
        for array in leaf.triangles() {
            for triangle in array.iter().filter(|t| t.lightmap() == lightmap) {
                triangles
                    .find_or_create_by_layout(array.layout())?
                    .add_triangle_from(&triangle)?;
            }
        }

        progress.begin_task(format!("lightmap {}", lightmap), weight);
        let built = build_mesh(mesh_compiler, &triangles, index, progress);
        progress.end_task();

        let mut mesh = built?;
        mesh.set_parameter(LIGHTMAP_PARAMETER, lightmap);

        embed(scene, leaf, format!(".scene/{guid}/{index}_{k}"), mesh);
    }

    Ok(lightmaps.len())
}

fn build_mesh<M>(
    mesh_compiler: &mut M,
    triangles: &TriangleArraySet,
    index: usize,
    progress: &mut Progress,
) -> Result<CompiledMesh>
where
    M: MeshCompiler + ?Sized,
{
    mesh_compiler
        .compile(triangles, progress)
        .map_err(|source| match source {
            MeshError::Cancelled => Error::Cancelled,
            source => Error::MeshCompile {
                leaf: index + 1,
                source,
            },
        })
}

fn embed<S>(scene: &mut S, leaf: &CompileNode, name: String, mesh: CompiledMesh)
where
    S: SceneGraph + ?Sized,
{
    log::trace!("Embedding mesh {} with {} triangles", name, mesh.triangle_count());
    scene.add_embedded_mesh(mesh_resource_path(&name), mesh);
    scene.attach_mesh(leaf.node(), &name);
}
