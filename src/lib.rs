//! Core of a chunked voxel world engine: the voxel store, the basic and
//! greedy mesh generators, the quad-to-mesh converter, the chunk lifecycle
//! state machine, the worker pool, the world manager's streaming/dispatch
//! loop, and the template loader with deterministic seed variation.
//!
//! The host scene graph, asset registry, and editor UI are external
//! collaborators; this crate only produces mesh buffers and exposes the
//! hooks they're applied through.

pub mod component;
pub mod config;
pub mod coords;
pub mod error;
pub mod lod;
pub mod mesh;
pub mod stats;
pub mod store;
pub mod sync;
pub mod template;
pub mod voxel;
pub mod worker;
pub mod world;

pub use component::{ApplyOutcome, ChunkCell, ChunkState, LodChange};
pub use config::{ConfigError, WorldConfig};
pub use coords::{ChunkPos, ChunkSize};
pub use error::{ChunkError, MeshValidationError, StoreError, TemplateError, WorldError, WorkerError};
pub use lod::{select_lod, Lod};
pub use mesh::{Face, GreedyQuad, MeshData};
pub use stats::WorldStats;
pub use store::VoxelStore;
pub use voxel::{Material, Voxel};
pub use worker::{MeshJob, MesherOutput, MeshWorkerPool};
pub use world::WorldManager;
