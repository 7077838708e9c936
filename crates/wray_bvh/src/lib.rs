//! WRAY BVH - Surface Area Heuristic BVH for GPU ray traversal.
//!
//! This crate provides:
//!
//! - **Triangle preprocessing**: reading a flat triangle soup, backface culling
//! - **SAH builder**: binary tree of `Aabb`s over the surviving triangles
//! - **Flattener**: pre-order, pointer-free node array ready for a storage buffer
//! - **Demo scenes**: the ground plane plus random cubes the renderer ships with
//!
//! # Example
//!
//! ```ignore
//! use wray_bvh::{Bvh, BuildConfig};
//!
//! let bvh = Bvh::build(&geometries, &indices, &BuildConfig::default())?;
//! let nodes: Vec<f32> = bvh.to_f32_array();
//! println!("{} nodes, {}", bvh.node_count(), bvh.stats());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod flatten;
pub mod scene;
pub mod stats;
pub mod triangle;

// Re-export commonly used types
pub use builder::{Bvh, BvhNode, NodeId, EMPTY_LEAF_INDEX};
pub use config::BuildConfig;
pub use error::InvalidInputError;
pub use flatten::{
    nodes_from_scalars, walk_flat, FlatLayoutError, FlatNode, FlatNodeKind, FLAT_NODE_SCALARS,
};
pub use scene::{demo_scene, Scene, SceneConfig};
pub use stats::BuildStats;
pub use triangle::{TriangleRecord, TriangleSoup, TRIANGLE_STRIDE, VERTEX_STRIDE};
