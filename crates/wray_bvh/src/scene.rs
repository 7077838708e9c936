//! Demo scene generation.
//!
//! Produces the geometry buffer the renderer ships with: a ground quad plus a
//! field of randomly placed cubes, along with the per-object material records
//! the shaders index by triangle range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use wray_math::{Camera, DVec3};

use crate::triangle::{TRIANGLE_STRIDE, VERTEX_STRIDE};

/// Triangles per generated cube.
pub const CUBE_TRIANGLES: usize = 12;

/// Scalars per material record.
pub const MATERIAL_STRIDE: usize = 8;

/// Number of textures the renderer binds.
const TEXTURE_COUNT: u32 = 11;

/// Corner signs and UV of every cube vertex, two triangles per face.
#[rustfmt::skip]
const CUBE_VERTICES: [([f64; 3], [f64; 2]); CUBE_TRIANGLES * 3] = [
    // Front face
    ([ 1.0, -1.0,  1.0], [1.0, 0.0]), ([ 1.0,  1.0,  1.0], [1.0, 1.0]), ([-1.0, -1.0,  1.0], [0.0, 0.0]),
    ([-1.0,  1.0,  1.0], [0.0, 1.0]), ([-1.0, -1.0,  1.0], [0.0, 0.0]), ([ 1.0,  1.0,  1.0], [1.0, 1.0]),
    // Back face
    ([-1.0, -1.0, -1.0], [1.0, 0.0]), ([-1.0,  1.0, -1.0], [1.0, 1.0]), ([ 1.0, -1.0, -1.0], [0.0, 0.0]),
    ([ 1.0,  1.0, -1.0], [0.0, 1.0]), ([ 1.0, -1.0, -1.0], [0.0, 0.0]), ([-1.0,  1.0, -1.0], [1.0, 1.0]),
    // Top face
    ([ 1.0,  1.0,  1.0], [1.0, 0.0]), ([ 1.0,  1.0, -1.0], [1.0, 1.0]), ([-1.0,  1.0,  1.0], [0.0, 0.0]),
    ([-1.0,  1.0, -1.0], [0.0, 1.0]), ([-1.0,  1.0,  1.0], [0.0, 0.0]), ([ 1.0,  1.0, -1.0], [1.0, 1.0]),
    // Bottom face
    ([ 1.0, -1.0,  1.0], [0.0, 0.0]), ([-1.0, -1.0,  1.0], [1.0, 0.0]), ([ 1.0, -1.0, -1.0], [0.0, 1.0]),
    ([-1.0, -1.0, -1.0], [1.0, 1.0]), ([ 1.0, -1.0, -1.0], [0.0, 1.0]), ([-1.0, -1.0,  1.0], [1.0, 0.0]),
    // Left face
    ([-1.0, -1.0,  1.0], [1.0, 0.0]), ([-1.0,  1.0,  1.0], [1.0, 1.0]), ([-1.0, -1.0, -1.0], [0.0, 0.0]),
    ([-1.0,  1.0, -1.0], [0.0, 1.0]), ([-1.0, -1.0, -1.0], [0.0, 0.0]), ([-1.0,  1.0,  1.0], [1.0, 1.0]),
    // Right face
    ([ 1.0, -1.0, -1.0], [1.0, 0.0]), ([ 1.0,  1.0, -1.0], [1.0, 1.0]), ([ 1.0, -1.0,  1.0], [0.0, 0.0]),
    ([ 1.0,  1.0,  1.0], [0.0, 1.0]), ([ 1.0, -1.0,  1.0], [0.0, 0.0]), ([ 1.0,  1.0, -1.0], [1.0, 1.0]),
];

/// Ground quad at y = -0.5, two triangles.
#[rustfmt::skip]
const GROUND_VERTICES: [([f64; 3], [f64; 2]); 6] = [
    ([ 2.0, -0.5,  2.0], [1.0, 0.0]), ([ 2.0, -0.5, -2.0], [1.0, 1.0]), ([-2.0, -0.5,  2.0], [0.0, 0.0]),
    ([-2.0, -0.5, -2.0], [0.0, 1.0]), ([-2.0, -0.5,  2.0], [0.0, 0.0]), ([ 2.0, -0.5, -2.0], [1.0, 1.0]),
];

/// Ground material: yellow, untextured.
const GROUND_COLOR: [f32; 3] = [0.8, 0.8, 0.0];

/// Scene generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub cube_count: usize,
    /// Half the edge length of every cube
    pub cube_radius: f64,
    /// Cube centres are drawn from [-spread, spread] on x and z
    pub horizontal_spread: f64,
    /// Cube centres are drawn from [-spread, spread] on y
    pub vertical_spread: f64,
    pub seed: u64,
    pub include_ground: bool,
    pub camera: Camera,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            cube_count: 400,
            cube_radius: 0.25,
            horizontal_spread: 5.0,
            vertical_spread: 0.5,
            seed: 0,
            include_ground: true,
            camera: Camera::default(),
        }
    }
}

/// Generated geometry plus everything the renderer uploads next to it.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Flat triangle buffer, `TRIANGLE_STRIDE` scalars per triangle
    pub geometries: Vec<f64>,
    /// Every triangle, numbered contiguously from 0
    pub indices: Vec<u32>,
    /// `[first_triangle, triangle_count, texture, 0, r, g, b, 0]` per object
    pub materials: Vec<f32>,
}

impl Scene {
    pub fn triangle_count(&self) -> usize {
        self.geometries.len() / TRIANGLE_STRIDE
    }

    pub fn object_count(&self) -> usize {
        self.materials.len() / MATERIAL_STRIDE
    }

    /// Append one object and its material record.
    fn push_object(&mut self, geometry: &[f64], texture: u32, color: [f32; 3]) {
        let first = self.triangle_count();
        let count = geometry.len() / TRIANGLE_STRIDE;

        self.geometries.extend_from_slice(geometry);
        self.indices.extend((first..first + count).map(|i| i as u32));
        self.materials.extend_from_slice(&[
            first as f32,
            count as f32,
            texture as f32,
            0.0,
            color[0],
            color[1],
            color[2],
            0.0,
        ]);
    }
}

fn push_vertex(out: &mut Vec<f64>, position: DVec3, uv: [f64; 2]) {
    let mut vertex = [0.0; VERTEX_STRIDE];
    vertex[..3].copy_from_slice(&position.to_array());
    vertex[4..6].copy_from_slice(&uv);
    out.extend_from_slice(&vertex);
}

/// Axis-aligned cube around `center`, outward facing, 12 triangles.
pub fn create_cube(center: DVec3, radius: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(CUBE_TRIANGLES * TRIANGLE_STRIDE);
    for (corner, uv) in CUBE_VERTICES {
        push_vertex(&mut out, center + DVec3::from_array(corner) * radius, uv);
    }
    out
}

/// The 4x4 ground quad.
pub fn ground_plane() -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * TRIANGLE_STRIDE);
    for (position, uv) in GROUND_VERTICES {
        push_vertex(&mut out, DVec3::from_array(position), uv);
    }
    out
}

/// Ground quad followed by `cube_count` random cubes, reproducible from `seed`.
pub fn demo_scene(config: &SceneConfig) -> Scene {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut scene = Scene::default();

    if config.include_ground {
        scene.push_object(&ground_plane(), 0, GROUND_COLOR);
    }

    for _ in 0..config.cube_count {
        let center = DVec3::new(
            random_between(&mut rng, config.horizontal_spread),
            random_between(&mut rng, config.vertical_spread),
            random_between(&mut rng, config.horizontal_spread),
        );
        let color = [rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>()];
        let texture = rng.gen_range(0..TEXTURE_COUNT);

        scene.push_object(&create_cube(center, config.cube_radius), texture, color);
    }

    log::debug!(
        "Generated scene: {} objects, {} triangles",
        scene.object_count(),
        scene.triangle_count()
    );

    scene
}

fn random_between(rng: &mut StdRng, spread: f64) -> f64 {
    if spread > 0.0 {
        rng.gen_range(-spread..spread)
    } else {
        0.0
    }
}
