//! Bounding Volume Hierarchy (BVH) construction.
//!
//! Binary tree over the surviving triangles of a soup, split with the Surface
//! Area Heuristic. Nodes live in an arena addressed by [`NodeId`]; nodes are
//! created in pre-order, so the arena order is the order of the flat array
//! produced by [`Bvh::flatten`](crate::flatten).

use wray_math::Aabb;

use crate::config::BuildConfig;
use crate::error::InvalidInputError;
use crate::stats::BuildStats;
use crate::triangle::{TriangleRecord, TriangleSoup};

/// Triangle index stored in the single leaf of a tree without triangles.
pub const EMPTY_LEAF_INDEX: u32 = u32::MAX;

/// Maximum triangles per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 1;

/// Largest triangle index an f32 node field holds exactly.
const F32_EXACT_INDEX_LIMIT: u32 = 1 << 24;

/// Handle of a node in the [`Bvh`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        NodeId(raw)
    }
}

/// BVH node - either an interior node with two children or a leaf with one triangle.
#[derive(Clone, Debug, PartialEq)]
pub enum BvhNode {
    Leaf {
        bounds: Aabb,
        /// Index into the geometry buffer, or [`EMPTY_LEAF_INDEX`]
        triangle_index: u32,
    },
    Interior {
        bounds: Aabb,
        left: NodeId,
        right: NodeId,
    },
}

impl BvhNode {
    pub fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Interior { bounds, .. } => bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }
}

/// A built, immutable BVH.
#[derive(Clone, Debug)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    /// Number of nodes in the subtree rooted at each arena entry
    subtree_sizes: Vec<u32>,
    stats: BuildStats,
}

#[derive(Clone, Copy, Debug)]
enum Side {
    Left,
    Right,
}

/// Pending node: the triangles it covers and where to link it.
struct BuildTask {
    indices: Vec<u32>,
    parent: Option<(NodeId, Side)>,
    depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Split {
    axis: usize,
    /// Number of triangles going to the left child
    position: usize,
    cost: f64,
}

impl Bvh {
    /// Build a BVH over the triangles of `geometries` named by `indices`.
    ///
    /// Inputs are validated before any bounds are computed. Back-facing
    /// triangles (see [`BuildConfig::view_direction`]) are dropped up front
    /// and never appear in the tree.
    pub fn build(
        geometries: &[f64],
        indices: &[u32],
        config: &BuildConfig,
    ) -> Result<Self, InvalidInputError> {
        let soup = TriangleSoup::new(geometries)?;
        soup.check_indices(indices)?;
        Ok(Self::build_from_soup(&soup, indices, config))
    }

    /// Build from an already validated soup.
    ///
    /// Panics if an index is out of range for `soup`.
    pub fn build_from_soup(soup: &TriangleSoup, indices: &[u32], config: &BuildConfig) -> Self {
        let survivors = soup.cull_backfacing(indices, config.view_direction);
        let survivor_count = survivors.len();

        let mut stats = BuildStats {
            culled_triangles: indices.len() - survivor_count,
            ..Default::default()
        };
        log::debug!(
            "Culled {} of {} triangles facing away from {:?}",
            stats.culled_triangles,
            indices.len(),
            config.view_direction
        );

        if survivors.iter().any(|&i| i > F32_EXACT_INDEX_LIMIT) {
            log::warn!(
                "Triangle indices above {} are not exact in the f32 node array",
                F32_EXACT_INDEX_LIMIT
            );
        }

        let mut nodes: Vec<BvhNode> = Vec::with_capacity((2 * survivor_count).max(1));
        let mut stack = vec![BuildTask {
            indices: survivors,
            parent: None,
            depth: 0,
        }];

        while let Some(task) = stack.pop() {
            let id = NodeId(nodes.len() as u32);
            if let Some((parent, side)) = task.parent {
                link_child(&mut nodes[parent.index()], side, id);
            }

            let mut records = soup.records(&task.indices);
            let bounds = records
                .iter()
                .fold(Aabb::EMPTY, |acc, r| Aabb::surrounding(&acc, &r.bounds));

            if records.len() <= LEAF_MAX_SIZE {
                stats.add_leaf(task.depth);
                nodes.push(BvhNode::Leaf {
                    bounds,
                    triangle_index: task.indices.first().copied().unwrap_or(EMPTY_LEAF_INDEX),
                });
                continue;
            }

            let Some(split) = find_best_split(&mut records, bounds.surface_area()) else {
                // Zero-area node: every SAH cost is NaN. Only the first
                // triangle is kept.
                log::warn!(
                    "Degenerate node with {} triangles collapsed into a leaf for triangle {}",
                    records.len(),
                    task.indices[0]
                );
                stats.add_leaf(task.depth);
                stats.forced_leaves += 1;
                nodes.push(BvhNode::Leaf {
                    bounds,
                    triangle_index: task.indices[0],
                });
                continue;
            };

            log::trace!(
                "Node {} splits {} triangles on axis {} at {} (cost {:.3})",
                id.raw(),
                records.len(),
                split.axis,
                split.position,
                split.cost
            );
            sort_by_centroid(&mut records, split.axis);
            let (left, right) = records.split_at(split.position);

            stats.add_interior();
            // Children are linked when they get created.
            nodes.push(BvhNode::Interior {
                bounds,
                left: id,
                right: id,
            });

            // Right goes on the stack first so the whole left subtree is
            // created before it.
            stack.push(BuildTask {
                indices: right.iter().map(|r| r.index).collect(),
                parent: Some((id, Side::Right)),
                depth: task.depth + 1,
            });
            stack.push(BuildTask {
                indices: left.iter().map(|r| r.index).collect(),
                parent: Some((id, Side::Left)),
                depth: task.depth + 1,
            });
        }

        let subtree_sizes = subtree_sizes(&nodes);

        log::info!("Built BVH over {} triangles: {}", survivor_count, stats);

        Self {
            nodes,
            subtree_sizes,
            stats,
        }
    }

    pub fn root(&self) -> &BvhNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> &BvhNode {
        &self.nodes[id.index()]
    }

    /// All nodes in pre-order; index `k` is `NodeId` `k`.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes in the subtree rooted at `id`, including `id` itself.
    pub fn subtree_size(&self, id: NodeId) -> u32 {
        self.subtree_sizes[id.index()]
    }

    /// Bounds of the root, the union of every surviving triangle.
    pub fn bounds(&self) -> Aabb {
        *self.root().bounds()
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Triangle indices of all leaves, walking the tree left to right.
    pub fn leaf_triangles(&self) -> Vec<u32> {
        let mut triangles = Vec::with_capacity(self.stats.leaf_count);
        let mut stack = vec![NodeId::ROOT];

        while let Some(id) = stack.pop() {
            match self.node(id) {
                BvhNode::Leaf { triangle_index, .. } => triangles.push(*triangle_index),
                BvhNode::Interior { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        triangles
    }
}

fn link_child(parent: &mut BvhNode, side: Side, child: NodeId) {
    if let BvhNode::Interior { left, right, .. } = parent {
        match side {
            Side::Left => *left = child,
            Side::Right => *right = child,
        }
    }
}

/// Children always sit after their parent in the arena, so one backwards
/// pass is enough.
fn subtree_sizes(nodes: &[BvhNode]) -> Vec<u32> {
    let mut sizes = vec![1u32; nodes.len()];
    for i in (0..nodes.len()).rev() {
        if let BvhNode::Interior { left, right, .. } = &nodes[i] {
            sizes[i] = 1 + sizes[left.index()] + sizes[right.index()];
        }
    }
    sizes
}

/// Sort by centroid coordinate on `axis`, ties broken by ascending triangle index.
fn sort_by_centroid(records: &mut [TriangleRecord], axis: usize) {
    records.sort_unstable_by(|a, b| {
        // Adding zero folds -0.0 into 0.0.
        let a_key = a.centroid[axis] + 0.0;
        let b_key = b.centroid[axis] + 0.0;
        a_key.total_cmp(&b_key).then(a.index.cmp(&b.index))
    });
}

/// SAH cost of putting `split` of `count` triangles on the left.
fn sah_cost(left_area: f64, right_area: f64, total_area: f64, split: usize, count: usize) -> f64 {
    (left_area / total_area) * split as f64 + (right_area / total_area) * (count - split) as f64
}

/// Cheapest split over all axes and positions, first minimum winning ties.
///
/// Leaves `records` sorted along the last axis tried. Returns `None` when no
/// cost is below infinity, which includes every zero-area node.
fn find_best_split(records: &mut [TriangleRecord], total_area: f64) -> Option<Split> {
    let count = records.len();
    let mut best: Option<Split> = None;
    let mut best_cost = f64::INFINITY;

    // right_areas[s] is the area of records[s..]
    let mut right_areas = vec![0.0; count];

    for axis in 0..3 {
        sort_by_centroid(records, axis);

        let mut right_bounds = Aabb::EMPTY;
        for s in (1..count).rev() {
            right_bounds.expand_by_box(&records[s].bounds);
            right_areas[s] = right_bounds.surface_area();
        }

        let mut left_bounds = Aabb::EMPTY;
        for s in 1..count {
            left_bounds.expand_by_box(&records[s - 1].bounds);
            let cost = sah_cost(left_bounds.surface_area(), right_areas[s], total_area, s, count);

            if cost < best_cost {
                best_cost = cost;
                best = Some(Split {
                    axis,
                    position: s,
                    cost,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::pack_triangle;
    use proptest::prelude::*;
    use wray_math::DVec3;

    fn soup_of(triangles: &[[DVec3; 3]]) -> Vec<f64> {
        triangles.iter().flat_map(|t| pack_triangle(*t)).collect()
    }

    /// Camera-facing triangle with its lower-left corner at `origin`.
    fn facing(origin: DVec3) -> [DVec3; 3] {
        [origin, origin + DVec3::X, origin + DVec3::Y]
    }

    fn all_indices(geometries: &[f64]) -> Vec<u32> {
        (0..(geometries.len() / crate::TRIANGLE_STRIDE) as u32).collect()
    }

    /// Split selection that rescans both partitions at every position.
    fn find_best_split_rescan(records: &mut [TriangleRecord], total_area: f64) -> Option<Split> {
        let count = records.len();
        let mut best = None;
        let mut best_cost = f64::INFINITY;

        for axis in 0..3 {
            sort_by_centroid(records, axis);
            for s in 1..count {
                let left = records[..s]
                    .iter()
                    .fold(Aabb::EMPTY, |acc, r| Aabb::surrounding(&acc, &r.bounds));
                let right = records[s..]
                    .iter()
                    .fold(Aabb::EMPTY, |acc, r| Aabb::surrounding(&acc, &r.bounds));
                let cost = sah_cost(left.surface_area(), right.surface_area(), total_area, s, count);
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(Split {
                        axis,
                        position: s,
                        cost,
                    });
                }
            }
        }
        best
    }

    #[test]
    fn test_empty_indices_gives_sentinel_leaf() {
        let geometries = soup_of(&[facing(DVec3::ZERO)]);
        let bvh = Bvh::build(&geometries, &[], &BuildConfig::default()).unwrap();

        assert_eq!(bvh.node_count(), 1);
        assert_eq!(
            bvh.root(),
            &BvhNode::Leaf {
                bounds: Aabb::EMPTY,
                triangle_index: EMPTY_LEAF_INDEX
            }
        );
    }

    #[test]
    fn test_single_triangle_is_leaf() {
        let geometries = soup_of(&[facing(DVec3::ZERO), facing(DVec3::new(0.0, 0.0, 2.0))]);
        let bvh = Bvh::build(&geometries, &[1], &BuildConfig::default()).unwrap();

        assert_eq!(bvh.node_count(), 1);
        let BvhNode::Leaf {
            bounds,
            triangle_index,
        } = bvh.root()
        else {
            panic!("expected leaf");
        };
        assert_eq!(*triangle_index, 1);
        assert_eq!(bounds.min, DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(bounds.max, DVec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn test_two_disjoint_triangles() {
        let geometries = soup_of(&[facing(DVec3::new(5.0, 0.0, 0.0)), facing(DVec3::ZERO)]);
        let bvh = Bvh::build(&geometries, &[0, 1], &BuildConfig::default()).unwrap();

        assert_eq!(bvh.node_count(), 3);
        let BvhNode::Interior { bounds, left, right } = bvh.root() else {
            panic!("expected interior root");
        };
        assert_eq!(bounds.min, DVec3::ZERO);
        assert_eq!(bounds.max, DVec3::new(6.0, 1.0, 0.0));
        assert_eq!(*left, NodeId(1));
        assert_eq!(*right, NodeId(2));

        // Sorted along x, so the triangle at the origin goes left.
        assert_eq!(bvh.leaf_triangles(), vec![1, 0]);
        assert_eq!(bvh.subtree_size(NodeId::ROOT), 3);
        assert_eq!(bvh.stats().max_depth, 1);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let geometries = soup_of(&[facing(DVec3::ZERO)]);

        assert!(matches!(
            Bvh::build(&geometries[..23], &[0], &BuildConfig::default()),
            Err(InvalidInputError::GeometryLength { len: 23, .. })
        ));
        assert!(matches!(
            Bvh::build(&geometries, &[0, 1], &BuildConfig::default()),
            Err(InvalidInputError::IndexOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_degenerate_node_collapses_to_first_index() {
        // Three collinear, zero-area triangles on the x axis.
        let line = |x: f64| {
            [
                DVec3::new(x, 0.0, 0.0),
                DVec3::new(x + 1.0, 0.0, 0.0),
                DVec3::new(x + 2.0, 0.0, 0.0),
            ]
        };
        let geometries = soup_of(&[line(0.0), line(1.0), line(2.0)]);
        let bvh = Bvh::build(&geometries, &[2, 0, 1], &BuildConfig::default()).unwrap();

        assert_eq!(bvh.node_count(), 1);
        let BvhNode::Leaf {
            bounds,
            triangle_index,
        } = bvh.root()
        else {
            panic!("expected forced leaf");
        };
        assert_eq!(*triangle_index, 2);
        assert_eq!(bounds.min, DVec3::ZERO);
        assert_eq!(bounds.max, DVec3::new(4.0, 0.0, 0.0));
        assert_eq!(bvh.stats().forced_leaves, 1);
    }

    #[test]
    fn test_sort_ties_break_on_index() {
        let geometries = soup_of(&[
            facing(DVec3::new(1.0, 0.0, 0.0)),
            facing(DVec3::ZERO),
            facing(DVec3::new(0.0, 3.0, 0.0)),
        ]);
        let soup = TriangleSoup::new(&geometries).unwrap();
        let mut records = soup.records(&[2, 1, 0]);

        // Triangles 1 and 2 share an x centroid.
        sort_by_centroid(&mut records, 0);
        let order: Vec<u32> = records.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_sort_treats_negative_zero_as_zero() {
        let mut records = vec![
            TriangleRecord::new(1, [DVec3::ZERO; 3]),
            TriangleRecord::new(0, [DVec3::ZERO; 3]),
        ];
        records[0].centroid = DVec3::new(-0.0, 0.0, 0.0);

        // total_cmp alone would put -0.0 (triangle 1) first.
        sort_by_centroid(&mut records, 0);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].index, 1);
    }

    #[test]
    fn test_split_prefers_lowest_axis_on_ties() {
        // Symmetric diagonal layout: x, y and z splits all cost the same.
        let geometries = soup_of(&[
            [DVec3::ZERO, DVec3::X, DVec3::Y],
            [DVec3::splat(4.0), DVec3::new(5.0, 4.0, 4.0), DVec3::new(4.0, 5.0, 4.0)],
        ]);
        let soup = TriangleSoup::new(&geometries).unwrap();
        let mut records = soup.records(&[0, 1]);
        let total = records
            .iter()
            .fold(Aabb::EMPTY, |acc, r| Aabb::surrounding(&acc, &r.bounds));

        let split = find_best_split(&mut records, total.surface_area()).unwrap();
        assert_eq!(split.axis, 0);
        assert_eq!(split.position, 1);
    }

    #[test]
    fn test_large_grid_builds() {
        let triangles: Vec<[DVec3; 3]> = (0..40)
            .flat_map(|x| (0..40).map(move |y| facing(DVec3::new(x as f64 * 2.0, y as f64 * 2.0, 0.0))))
            .collect();
        let geometries = soup_of(&triangles);
        let indices = all_indices(&geometries);
        let bvh = Bvh::build(&geometries, &indices, &BuildConfig::default()).unwrap();

        assert_eq!(bvh.stats().leaf_count, 1600);
        assert_eq!(bvh.node_count(), 2 * 1600 - 1);
        assert_eq!(bvh.subtree_size(NodeId::ROOT) as usize, bvh.node_count());
    }

    #[test]
    fn test_build_is_deterministic() {
        let triangles: Vec<[DVec3; 3]> = (0..50)
            .map(|i| facing(DVec3::new((i * 7 % 13) as f64, (i * 3 % 5) as f64, 0.0)))
            .collect();
        let geometries = soup_of(&triangles);
        let indices = all_indices(&geometries);

        let a = Bvh::build(&geometries, &indices, &BuildConfig::default()).unwrap();
        let b = Bvh::build(&geometries, &indices, &BuildConfig::default()).unwrap();
        assert_eq!(a.nodes(), b.nodes());
    }

    fn coord() -> impl Strategy<Value = f64> {
        (-64i32..64).prop_map(|n| n as f64 * 0.5)
    }

    fn vertex() -> impl Strategy<Value = DVec3> {
        (coord(), coord(), coord()).prop_map(|(x, y, z)| DVec3::new(x, y, z))
    }

    fn triangle() -> impl Strategy<Value = [DVec3; 3]> {
        (vertex(), vertex(), vertex()).prop_map(|(a, b, c)| [a, b, c])
    }

    proptest! {
        #[test]
        fn incremental_split_matches_rescan(triangles in prop::collection::vec(triangle(), 2..24)) {
            let geometries = soup_of(&triangles);
            let soup = TriangleSoup::new(&geometries).unwrap();
            let indices = all_indices(&geometries);
            let mut records = soup.records(&indices);
            let total = records
                .iter()
                .fold(Aabb::EMPTY, |acc, r| Aabb::surrounding(&acc, &r.bounds))
                .surface_area();

            let mut rescan_records = records.clone();
            prop_assert_eq!(
                find_best_split(&mut records, total),
                find_best_split_rescan(&mut rescan_records, total)
            );
        }

        #[test]
        fn tree_partitions_survivors(triangles in prop::collection::vec(triangle(), 0..40)) {
            let geometries = soup_of(&triangles);
            let indices = all_indices(&geometries);
            let config = BuildConfig::default();
            let bvh = Bvh::build(&geometries, &indices, &config).unwrap();

            let soup = TriangleSoup::new(&geometries).unwrap();
            let survivors = soup.cull_backfacing(&indices, config.view_direction);

            // Coverage: the root holds every survivor.
            let expected_bounds = survivors
                .iter()
                .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &soup.record(i).bounds));
            prop_assert_eq!(bvh.bounds(), expected_bounds);

            let mut leaves = bvh.leaf_triangles();
            if survivors.is_empty() {
                prop_assert_eq!(leaves, vec![EMPTY_LEAF_INDEX]);
            } else if bvh.stats().forced_leaves == 0 {
                // Partition: every survivor exactly once.
                leaves.sort_unstable();
                let mut expected = survivors.clone();
                expected.sort_unstable();
                prop_assert_eq!(leaves, expected);
            } else {
                for leaf in &leaves {
                    prop_assert!(survivors.contains(leaf));
                }
            }

            // Binary shape and arena layout.
            for (k, node) in bvh.nodes().iter().enumerate() {
                if let BvhNode::Interior { left, right, bounds } = node {
                    prop_assert_eq!(left.index(), k + 1);
                    prop_assert_eq!(
                        right.index() as u32,
                        left.raw() + bvh.subtree_size(*left)
                    );
                    let children = Aabb::surrounding(
                        bvh.node(*left).bounds(),
                        bvh.node(*right).bounds(),
                    );
                    prop_assert_eq!(*bounds, children);
                }
            }
            prop_assert_eq!(bvh.subtree_size(NodeId::ROOT) as usize, bvh.node_count());
            prop_assert_eq!(bvh.stats().node_count, bvh.node_count());
        }
    }
}
