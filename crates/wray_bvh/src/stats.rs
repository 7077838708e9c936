use std::fmt::Display;

/// Summary of a single BVH build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub interior_count: usize,
    /// Depth of the deepest leaf, the root being depth 0
    pub max_depth: usize,
    /// Triangles removed by the backface cull
    pub culled_triangles: usize,
    /// Leaves created because no split had a finite SAH cost
    pub forced_leaves: usize,
}

impl BuildStats {
    pub(crate) fn add_leaf(&mut self, depth: usize) {
        self.node_count += 1;
        self.leaf_count += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    pub(crate) fn add_interior(&mut self) {
        self.node_count += 1;
        self.interior_count += 1;
    }
}

impl Display for BuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes ({} leaves, {} interior); depth {}; {} culled; {} forced leaves",
            self.node_count,
            self.leaf_count,
            self.interior_count,
            self.max_depth,
            self.culled_triangles,
            self.forced_leaves
        )
    }
}
