// Re-export glam for convenience
pub use glam::*;

// WRAY math types
mod aabb;
mod camera;
pub mod vector;

pub use aabb::Aabb;
pub use camera::{Camera, CameraFrame};
