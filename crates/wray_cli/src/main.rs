//! Build the demo scene and its BVH, then dump every GPU buffer to disk.
//!
//! Run with: cargo run --release -- [config.json]

mod config;

use std::env;
use std::path::Path;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use wray_bvh::{demo_scene, walk_flat, BuildConfig, Bvh};

use crate::config::CliConfig;

/// Write `data` as little-endian f32.
fn write_f32s(dir: &Path, name: &str, data: &[f32]) -> Result<()> {
    let path = dir.join(name);
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {} ({} floats)", path.display(), data.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [config.json]", args[0]);
        std::process::exit(1);
    }

    let config = match args.get(1) {
        Some(path) => CliConfig::load(Path::new(path))?,
        None => CliConfig::default(),
    };

    let scene = demo_scene(&config.scene);
    log::info!(
        "Scene: {} objects, {} triangles",
        scene.object_count(),
        scene.triangle_count()
    );

    let start = Instant::now();
    let build_config = BuildConfig::from_camera(&config.scene.camera);
    let bvh = Bvh::build(&scene.geometries, &scene.indices, &build_config)
        .context("building BVH")?;
    log::info!("BVH built in {:.2?}: {}", start.elapsed(), bvh.stats());

    let nodes = bvh.flatten();
    let walked = walk_flat(&nodes).context("walking flattened BVH")?;
    ensure!(
        walked == bvh.leaf_triangles(),
        "flattened BVH visits leaves in a different order than the tree"
    );

    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let geometry: Vec<f32> = scene.geometries.iter().map(|&v| v as f32).collect();
    write_f32s(output_dir, "geometry.bin", &geometry)?;
    write_f32s(output_dir, "bvh.bin", &bvh.to_f32_array())?;
    write_f32s(output_dir, "camera.bin", &config.scene.camera.to_buffer())?;
    write_f32s(output_dir, "materials.bin", &scene.materials)?;

    Ok(())
}
