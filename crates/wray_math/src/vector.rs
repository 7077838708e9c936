//! Small vector helpers over `DVec3`.
//!
//! Thin wrappers so the triangle preprocessing and camera code read the same
//! way the GPU side does (`sub`, `cross`, `dot`, ...).

use glam::DVec3;

#[inline]
pub fn sub(a: DVec3, b: DVec3) -> DVec3 {
    a - b
}

#[inline]
pub fn add(a: DVec3, b: DVec3) -> DVec3 {
    a + b
}

#[inline]
pub fn cross(a: DVec3, b: DVec3) -> DVec3 {
    a.cross(b)
}

#[inline]
pub fn dot(a: DVec3, b: DVec3) -> f64 {
    a.dot(b)
}

#[inline]
pub fn scale(a: DVec3, scalar: f64) -> DVec3 {
    a * scalar
}

#[inline]
pub fn length(a: DVec3) -> f64 {
    a.length()
}

/// Normalize `a`. A zero vector yields NaN components, same as dividing by
/// its zero length.
#[inline]
pub fn normalize(a: DVec3) -> DVec3 {
    a / a.length()
}

/// Read a point from three consecutive scalars starting at `offset`.
#[inline]
pub fn point_at(data: &[f64], offset: usize) -> DVec3 {
    DVec3::new(data[offset], data[offset + 1], data[offset + 2])
}
