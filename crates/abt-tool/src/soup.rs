//! Triangle soup files and random demo soups.

use std::path::Path;

use abt_compiler::{TriangleArray, TriangleArraySet, VertexLayout};
use anyhow::{Context, Result};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const DEMO_MATERIALS: [&str; 3] = ["stone", "metal", "glass"];
const DEMO_LIGHTMAPS: usize = 4;
const DEMO_EXTENT: f32 = 200.0;

/// A triangle as written in a soup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoupTriangle {
    pub positions: [[f32; 3]; 3],
    pub material: String,
    #[serde(default)]
    pub lightmap: String,
}

/// Position-only triangle soup, stored as RON.
///
/// ```ron
/// (triangles: [
///     (positions: ((0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)), material: "stone"),
/// ])
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoupFile {
    #[serde(default)]
    pub triangles: Vec<SoupTriangle>,
}

impl SoupFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read soup: {}", path.display()))?;

        ron::from_str(&text).with_context(|| format!("Failed to parse soup: {}", path.display()))
    }

    /// Scattered small triangles plus one region box in the middle.
    pub fn demo(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut triangles = Vec::with_capacity(count + 12);

        for i in 0..count {
            let origin = Point3::new(
                rng.gen_range(0.0..DEMO_EXTENT),
                rng.gen_range(0.0..DEMO_EXTENT),
                rng.gen_range(0.0..DEMO_EXTENT),
            );
            let mut corner = || {
                let offset = Vector3::<f32>::new(
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                    0.0,
                );
                origin + offset
            };
            let (b, c) = (corner(), corner());

            triangles.push(SoupTriangle {
                positions: [origin, b, c].map(|p| [p.x, p.y, p.z]),
                material: DEMO_MATERIALS[i % DEMO_MATERIALS.len()].to_string(),
                lightmap: format!("lm_{}", i % DEMO_LIGHTMAPS),
            });
        }

        let centre = Point3::from([DEMO_EXTENT / 2.0; 3]);
        triangles.extend(box_triangles(centre, 10.0, "tools.region.demo"));

        Self { triangles }
    }

    /// Packs the soup into a single position-only array.
    pub fn into_triangles(self) -> Result<TriangleArraySet> {
        let mut array = TriangleArray::with_layout(VertexLayout::position_only())?;
        array.reserve(self.triangles.len());

        for triangle in &self.triangles {
            let [a, b, c] = &triangle.positions;
            array.add_triangle(
                bytemuck::bytes_of(a),
                bytemuck::bytes_of(b),
                bytemuck::bytes_of(c),
                &triangle.material,
                &triangle.lightmap,
            )?;
        }

        Ok(TriangleArraySet::from(array))
    }
}

/// Axis aligned box, faces counter-clockwise seen from outside.
fn box_triangles(centre: Point3<f32>, half: f32, material: &str) -> Vec<SoupTriangle> {
    let corner = |i: usize| {
        let sign = |bit: usize| if i & bit == 0 { -half } else { half };
        let p = centre + Vector3::new(sign(1), sign(2), sign(4));
        [p.x, p.y, p.z]
    };

    [[0, 2, 3, 1], [4, 5, 7, 6], [0, 1, 5, 4], [2, 6, 7, 3], [0, 4, 6, 2], [1, 3, 7, 5]]
        .iter()
        .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
        .map(|face| SoupTriangle {
            positions: face.map(&corner),
            material: material.to_string(),
            lightmap: String::new(),
        })
        .collect()
}
