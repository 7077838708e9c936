//! Flat, pointer-free node array for GPU traversal.
//!
//! Each node is one 12-scalar record:
//!
//! | fields | leaf                   | interior               |
//! |--------|------------------------|------------------------|
//! | 0..4   | `min.xyz`, 0           | `min.xyz`, 0           |
//! | 4..8   | `max.xyz`, 0           | `max.xyz`, 0           |
//! | 8      | 1.0                    | 0.0                    |
//! | 9      | triangle index         | left child record      |
//! | 10     | 0                      | right child record     |
//! | 11     | 0                      | 0                      |
//!
//! Records are in pre-order, record 0 being the root, so the left child of an
//! interior record `k` is always `k + 1`.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;
use wray_math::Aabb;

use crate::builder::{Bvh, BvhNode};

/// Scalars per flat node record.
pub const FLAT_NODE_SCALARS: usize = 12;

const LEAF_FLAG: f32 = 1.0;
const INTERIOR_FLAG: f32 = 0.0;

/// One node record, laid out exactly as the shader struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FlatNode {
    pub min: [f32; 3],
    pub _pad_min: f32,
    pub max: [f32; 3],
    pub _pad_max: f32,
    /// 1.0 for leaves, 0.0 for interior nodes
    pub leaf: f32,
    /// Triangle index for leaves, left child record otherwise
    pub index: f32,
    /// Right child record for interior nodes
    pub right: f32,
    pub _pad: f32,
}

/// Decoded meaning of a [`FlatNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlatNodeKind {
    Leaf { triangle_index: u32 },
    Interior { left: u32, right: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlatLayoutError {
    #[error("Node array is empty")]
    Empty,

    #[error("Node array length {0} is not a whole number of 12-scalar records")]
    Length(usize),

    #[error("Record {record} links to child {child} outside of {len} records")]
    ChildOutOfRange { record: u32, child: u32, len: usize },

    #[error("Record {record} links backwards to {child}")]
    BackwardLink { record: u32, child: u32 },

    #[error("Record {0} is reachable more than once")]
    Revisited(u32),
}

impl FlatNode {
    pub fn leaf(bounds: &Aabb, triangle_index: u32) -> Self {
        Self::with_payload(bounds, LEAF_FLAG, triangle_index, 0)
    }

    pub fn interior(bounds: &Aabb, left: u32, right: u32) -> Self {
        Self::with_payload(bounds, INTERIOR_FLAG, left, right)
    }

    fn with_payload(bounds: &Aabb, flag: f32, index: u32, right: u32) -> Self {
        Self {
            min: bounds.min.as_vec3().to_array(),
            _pad_min: 0.0,
            max: bounds.max.as_vec3().to_array(),
            _pad_max: 0.0,
            leaf: flag,
            index: index as f32,
            right: right as f32,
            _pad: 0.0,
        }
    }

    /// Decode the record the way the traversal shader does, by testing field 8.
    pub fn decode(&self) -> FlatNodeKind {
        if self.leaf > 0.5 {
            FlatNodeKind::Leaf {
                triangle_index: self.index as u32,
            }
        } else {
            FlatNodeKind::Interior {
                left: self.index as u32,
                right: self.right as u32,
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.decode(), FlatNodeKind::Leaf { .. })
    }
}

/// View a scalar buffer as node records.
pub fn nodes_from_scalars(data: &[f32]) -> Result<&[FlatNode], FlatLayoutError> {
    bytemuck::try_cast_slice(data).map_err(|_| FlatLayoutError::Length(data.len()))
}

/// Walk the array from record 0 like the GPU traversal, returning the
/// triangle index of every leaf in visit order.
///
/// Every record must be reachable at most once and child links must point
/// forward, so malformed arrays are reported instead of looping.
pub fn walk_flat(nodes: &[FlatNode]) -> Result<Vec<u32>, FlatLayoutError> {
    if nodes.is_empty() {
        return Err(FlatLayoutError::Empty);
    }

    let mut visited = vec![false; nodes.len()];
    let mut triangles = Vec::new();
    let mut stack = vec![0u32];

    while let Some(record) = stack.pop() {
        if std::mem::replace(&mut visited[record as usize], true) {
            return Err(FlatLayoutError::Revisited(record));
        }

        match nodes[record as usize].decode() {
            FlatNodeKind::Leaf { triangle_index } => triangles.push(triangle_index),
            FlatNodeKind::Interior { left, right } => {
                for child in [left, right] {
                    if child as usize >= nodes.len() {
                        return Err(FlatLayoutError::ChildOutOfRange {
                            record,
                            child,
                            len: nodes.len(),
                        });
                    }
                    if child <= record {
                        return Err(FlatLayoutError::BackwardLink { record, child });
                    }
                }
                stack.push(right);
                stack.push(left);
            }
        }
    }

    Ok(triangles)
}

impl Bvh {
    /// Serialize the tree into pre-order node records.
    ///
    /// Child records come from subtree sizes: the left child of record `k` is
    /// `k + 1` and the right child follows the whole left subtree.
    pub fn flatten(&self) -> Vec<FlatNode> {
        self.nodes()
            .iter()
            .enumerate()
            .map(|(k, node)| match node {
                BvhNode::Leaf {
                    bounds,
                    triangle_index,
                } => FlatNode::leaf(bounds, *triangle_index),
                BvhNode::Interior { bounds, left, right } => {
                    let left_index = k as u32 + 1;
                    let right_index = left_index + self.subtree_size(*left);
                    debug_assert_eq!(left.raw(), left_index);
                    debug_assert_eq!(right.raw(), right_index);
                    FlatNode::interior(bounds, left_index, right_index)
                }
            })
            .collect()
    }

    /// Flattened tree as the raw scalar array, `FLAT_NODE_SCALARS` per node.
    pub fn to_f32_array(&self) -> Vec<f32> {
        bytemuck::cast_slice(&self.flatten()).to_vec()
    }
}
