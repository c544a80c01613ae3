//! Command line front end for the ABT scene compiler.
//!
//! Compiles a RON triangle soup (or a random demo soup) into an in-memory
//! culling scene and reports what was built.

mod soup;

use std::path::{Path, PathBuf};

use abt_compiler::scene::{CullingNode, FnVisitor};
use abt_compiler::{
    AbtCompiler, CompileReport, CompilerConfig, Config, CullingScene, IndexedMeshCompiler,
    LightingType, Progress,
};
use anyhow::{bail, Context, Result};
use clap::Parser;

use soup::SoupFile;

/// Compiles triangle soup into an adaptive binary tree of culling nodes.
#[derive(Parser, Debug)]
#[command(name = "abt-tool")]
#[command(about = "Compiles triangle soup into an adaptive binary tree of culling nodes")]
struct Args {
    /// Triangle soup to compile (RON).
    input: Option<PathBuf>,

    /// Compile a random soup with this many triangles instead of reading a file.
    #[arg(long, conflicts_with = "input")]
    demo: Option<usize>,

    /// Seed of the demo soup.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Compiler configuration (.toml or .ron).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the triangle recursion threshold.
    #[arg(long)]
    threshold: Option<u32>,

    /// Override the maximum overgrowth.
    #[arg(long)]
    overgrowth: Option<f32>,

    /// Build one mesh per lightmap instead of one per leaf.
    #[arg(long)]
    lightmap: bool,

    /// Keep degenerate triangles.
    #[arg(long)]
    keep_degenerate: bool,

    /// Write the effective configuration to this file (.toml or .ron).
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Write the compiled regions to this RON file.
    #[arg(long)]
    regions_out: Option<PathBuf>,

    /// Print the culling tree.
    #[arg(long)]
    tree: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if let Some(path) = &args.save_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to save config: {}", path.display()))?;
        log::info!("Configuration written to {}", path.display());
    }

    let soup = match (&args.input, args.demo) {
        (Some(path), _) => SoupFile::load(path)?,
        (None, Some(count)) => SoupFile::demo(count, args.seed),
        (None, None) => bail!("Nothing to compile: pass a soup file or --demo <COUNT>"),
    };
    let triangles = soup.into_triangles().context("Building triangle soup")?;

    let compiler = AbtCompiler::new(config);
    let mut scene = CullingScene::new();
    let mut progress = Progress::new().on_update(progress_logger());

    let report = compiler
        .compile(&mut scene, triangles, &mut IndexedMeshCompiler::new(), &mut progress)
        .context("Compiling scene")?;

    print_report(&report, &scene);

    if args.tree {
        print_tree(&scene);
    }

    if let Some(path) = &args.regions_out {
        write_regions(&scene, path)?;
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<CompilerConfig> {
    let mut config = match &args.config {
        Some(path) => CompilerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CompilerConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.set_triangle_recursion_threshold(threshold);
    }
    if let Some(overgrowth) = args.overgrowth {
        config.max_overgrowth = overgrowth;
    }
    if args.lightmap {
        config.lighting_type = LightingType::Lightmap;
    }
    if args.keep_degenerate {
        config.remove_degenerate_triangles = false;
    }

    log::debug!("Using {:?}", config);
    Ok(config)
}

/// Logs once per whole percent.
fn progress_logger() -> impl FnMut(f32, &str) + Send + 'static {
    let mut last = -1;
    move |percentage: f32, task: &str| {
        let whole = percentage as i32;
        if whole != last {
            last = whole;
            log::debug!("{:3}% {}", whole, task);
        }
    }
}

fn print_report(report: &CompileReport, scene: &CullingScene) {
    println!("Scene {}", report.guid);
    println!("  input triangles:      {}", report.input_triangle_count);
    println!("  degenerate removed:   {}", report.degenerate_triangles_removed);
    println!("  leaves:               {}", report.leaf_count);
    println!("  leaf triangles:       {}", report.leaf_triangle_count);
    println!("  meshes:               {}", report.mesh_count);
    println!("  regions:              {}", report.region_count);
    println!("  culling nodes:        {}", scene.node_count());
    println!("  tree depth:           {}", scene.depth());
}

fn print_tree(scene: &CullingScene) {
    scene.traverse(&mut FnVisitor::new(|handle, node: &CullingNode, depth| {
        let triangles: usize = scene
            .meshes_for(handle)
            .iter()
            .map(|mesh| mesh.triangle_count())
            .sum();

        if node.is_leaf() {
            println!(
                "{:indent$}leaf: {} meshes, {} triangles",
                "",
                node.meshes().len(),
                triangles,
                indent = depth * 2
            );
        } else {
            println!("{:indent$}node", "", indent = depth * 2);
        }
    }));

    for region in scene.regions() {
        println!(
            "region '{}': {} triangles, {} BSP nodes",
            region.name(),
            region.triangles().len(),
            region.bsp_nodes().len()
        );
    }
}

fn write_regions(scene: &CullingScene, path: &Path) -> Result<()> {
    let text = ron::ser::to_string_pretty(scene.regions(), ron::ser::PrettyConfig::default())
        .context("Serializing regions")?;

    std::fs::write(path, text)
        .with_context(|| format!("Failed to write regions: {}", path.display()))?;

    log::info!("{} regions written to {}", scene.regions().len(), path.display());
    Ok(())
}
