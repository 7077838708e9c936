use glam::DVec3;

/// Axis-Aligned Bounding Box used by the BVH builder.
///
/// An AABB is defined by its `min` and `max` corners. The empty box
/// (`min = +inf`, `max = -inf`) is the identity of [`Aabb::expand_by_box`]
/// and is only ever used as a union operand.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// The empty box (contains nothing).
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    /// Create an AABB from explicit corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create the smallest AABB containing every point of `points`.
    ///
    /// Returns [`Aabb::EMPTY`] for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut acc, p| {
            acc.expand_by_point(p);
            acc
        })
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        let mut aabb = *box0;
        aabb.expand_by_box(box1);
        aabb
    }

    /// Grow the box component-wise so it contains `p`.
    pub fn expand_by_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box so it contains both corners of `other`.
    pub fn expand_by_box(&mut self, other: &Aabb) {
        self.expand_by_point(other.min);
        self.expand_by_point(other.max);
    }

    /// Size of the box along each axis (`max - min`).
    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the largest extent.
    /// Ties resolve to the lowest index.
    pub fn largest_extent_axis(&self) -> usize {
        let ext = self.extent();

        if ext.x >= ext.y && ext.x >= ext.z {
            0
        } else if ext.y >= ext.z {
            1
        } else {
            2
        }
    }

    /// Surface area `2 * (dx*dy + dy*dz + dz*dx)`.
    ///
    /// Degenerate boxes (one or more zero extents) give a finite, possibly
    /// zero area. Not meaningful for the empty box.
    pub fn surface_area(&self) -> f64 {
        let ext = self.extent();
        2.0 * (ext.x * ext.y + ext.y * ext.z + ext.z * ext.x)
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// True if the box has not been expanded by anything yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
