use thiserror::Error;

/// Caller errors detected before any bounds are computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("Geometry length {len} is not a multiple of the {stride}-scalar triangle stride")]
    GeometryLength { len: usize, stride: usize },

    #[error("Triangle index {index} out of range ({triangle_count} triangles in geometry)")]
    IndexOutOfRange { index: u32, triangle_count: usize },
}
