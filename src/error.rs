//! Crate-wide error taxonomy (spec.md §7).
//!
//! Each concern gets its own `thiserror` enum (mirrors the teacher's
//! `topo/world/chunk_manager/error.rs` / `topo/error.rs` split). Every public
//! API returns the narrowest of these that applies to it rather than a
//! single blanket error type.

use thiserror::Error;

use crate::coords::ChunkPos;

/// Errors raised by [`crate::store::VoxelStore`] writes and batch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("local position ({0}, {1}, {2}) is out of range for this chunk")]
    OutOfRange(i32, i32, i32),
    #[error("set_voxel_batch received {points} points but {materials} materials")]
    LengthMismatch { points: usize, materials: usize },
}

/// Errors raised by the chunk component's state machine (spec.md §4.5, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk is already meshing")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    MeshValidation(#[from] MeshValidationError),
}

/// Errors raised by the quad-to-mesh converter's validation pass (spec.md §4.4).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshValidationError {
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("vertex attribute arrays have mismatched lengths: positions={positions} normals={normals} uvs={uvs} tangents={tangents} colors={colors}")]
    AttributeLengthMismatch {
        positions: usize,
        normals: usize,
        uvs: usize,
        tangents: usize,
        colors: usize,
    },
    #[error("vertex position {0:?} has a coordinate outside [-{1}, {1}]")]
    PositionOutOfBounds([f32; 3], f32),
    #[error("normal at vertex {0} is the zero vector")]
    ZeroNormal(usize),
}

/// Errors raised by the world manager (spec.md §4.6, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("chunk pool is exhausted and a fresh allocation also failed")]
    PoolExhausted,
    #[error("chunk position {0} has z != 0 but flat_world_mode is enabled")]
    FlatWorldRejected(ChunkPos),
    #[error("chunk {0} is not loaded")]
    NotLoaded(ChunkPos),
}

/// Errors raised by the template loader (spec.md §4.8, §6.2, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("no template entry for chunk {0}")]
    ChunkMissing(ChunkPos),
    #[error("decompressed size {actual} does not match expected volume {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("failed to decompress template bytes: {0}")]
    Decompress(String),
    #[error("failed to decode template: {0}")]
    Decode(String),
}

/// Errors surfaced by a mesh worker job (spec.md §4.7, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error(transparent)]
    Validation(#[from] MeshValidationError),
    #[error("worker encountered a fatal internal error: {0}")]
    Fatal(String),
}
