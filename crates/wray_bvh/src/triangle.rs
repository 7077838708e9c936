//! Triangle soup access and build-time preprocessing.
//!
//! The geometry buffer is the same flat array the shaders read: every triangle
//! occupies [`TRIANGLE_STRIDE`] scalars, split into three vertices of
//! [`VERTEX_STRIDE`] scalars each. Only the first three scalars of a vertex
//! (its position) matter here; the rest carry shading attributes.

use wray_math::{vector, Aabb, DVec3};

use crate::error::InvalidInputError;

/// Scalars per triangle in the geometry buffer.
pub const TRIANGLE_STRIDE: usize = 24;

/// Scalars per vertex in the geometry buffer.
pub const VERTEX_STRIDE: usize = 8;

/// Validated view over a flat triangle geometry buffer.
#[derive(Clone, Copy, Debug)]
pub struct TriangleSoup<'a> {
    geometries: &'a [f64],
}

impl<'a> TriangleSoup<'a> {
    /// Wrap `geometries`, rejecting buffers that are not whole triangles.
    pub fn new(geometries: &'a [f64]) -> Result<Self, InvalidInputError> {
        if geometries.len() % TRIANGLE_STRIDE != 0 {
            return Err(InvalidInputError::GeometryLength {
                len: geometries.len(),
                stride: TRIANGLE_STRIDE,
            });
        }
        Ok(Self { geometries })
    }

    pub fn triangle_count(&self) -> usize {
        self.geometries.len() / TRIANGLE_STRIDE
    }

    /// Check that every index names a triangle of this soup.
    pub fn check_indices(&self, indices: &[u32]) -> Result<(), InvalidInputError> {
        let triangle_count = self.triangle_count();
        match indices.iter().find(|&&i| i as usize >= triangle_count) {
            Some(&index) => Err(InvalidInputError::IndexOutOfRange {
                index,
                triangle_count,
            }),
            None => Ok(()),
        }
    }

    /// Vertex positions of triangle `index`.
    ///
    /// Panics if `index` is out of range; use [`TriangleSoup::check_indices`] first.
    pub fn vertices(&self, index: u32) -> [DVec3; 3] {
        let base = index as usize * TRIANGLE_STRIDE;
        [
            vector::point_at(self.geometries, base),
            vector::point_at(self.geometries, base + VERTEX_STRIDE),
            vector::point_at(self.geometries, base + 2 * VERTEX_STRIDE),
        ]
    }

    /// Geometric normal `cross(p1 - p0, p2 - p0)`, not normalized.
    pub fn normal(&self, index: u32) -> DVec3 {
        let [p0, p1, p2] = self.vertices(index);
        vector::cross(vector::sub(p1, p0), vector::sub(p2, p0))
    }

    /// True if the triangle faces away from a viewer looking along `view_direction`.
    pub fn is_backfacing(&self, index: u32, view_direction: DVec3) -> bool {
        vector::dot(self.normal(index), view_direction) > 0.0
    }

    /// Drop back-facing triangles, keeping the order of the survivors.
    pub fn cull_backfacing(&self, indices: &[u32], view_direction: DVec3) -> Vec<u32> {
        indices
            .iter()
            .copied()
            .filter(|&i| !self.is_backfacing(i, view_direction))
            .collect()
    }

    pub fn record(&self, index: u32) -> TriangleRecord {
        TriangleRecord::new(index, self.vertices(index))
    }

    /// Build-time records for `indices`, in the same order.
    pub fn records(&self, indices: &[u32]) -> Vec<TriangleRecord> {
        indices.iter().map(|&i| self.record(i)).collect()
    }
}

/// Per-triangle data used while partitioning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleRecord {
    /// Position of the triangle in the geometry buffer
    pub index: u32,
    pub bounds: Aabb,
    /// Mean of the three vertices
    pub centroid: DVec3,
}

impl TriangleRecord {
    pub fn new(index: u32, vertices: [DVec3; 3]) -> Self {
        let [p0, p1, p2] = vertices;
        Self {
            index,
            bounds: Aabb::from_points(vertices),
            centroid: (p0 + p1 + p2) / 3.0,
        }
    }
}

/// Pack three positions into one geometry block with zeroed attributes.
pub fn pack_triangle(vertices: [DVec3; 3]) -> [f64; TRIANGLE_STRIDE] {
    let mut block = [0.0; TRIANGLE_STRIDE];
    for (i, v) in vertices.iter().enumerate() {
        block[i * VERTEX_STRIDE..i * VERTEX_STRIDE + 3].copy_from_slice(&v.to_array());
    }
    block
}
