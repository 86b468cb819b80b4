//! World configuration (spec.md §4.6's option table, §6.3), plus the
//! construction-time validation the teacher applies in `ChunkData::new`'s
//! `assert!`s and `nebula-config`'s config loader (SPEC_FULL.md §9).

use serde::{Deserialize, Serialize};

use crate::coords::ChunkSize;

/// Every recognized streaming/generation option, settable before the world
/// starts streaming (spec.md §6.3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Cube edge length in voxels (16 mobile / 32 desktop).
    pub chunk_size: ChunkSize,
    /// Voxel edge length in host world units (`E` in spec.md §6.4).
    pub voxel_edge: f32,
    /// Radius in chunks around the viewer for loading.
    pub view_distance_chunks: i32,
    /// Pre-allocated chunk pool capacity.
    pub chunk_pool_size: usize,
    /// If `false`, all meshing runs synchronously on the main sequence.
    pub use_multithreading: bool,
    /// Worker thread count when `use_multithreading` is enabled.
    pub worker_count: usize,
    /// Upper bound on in-flight mesh jobs.
    pub max_concurrent_chunk_generations: usize,
    /// Upper bound on jobs dispatched per streaming tick.
    pub max_dispatch_per_tick: usize,
    pub mobile_memory_budget_mb: f32,
    pub pc_memory_budget_mb: f32,
    /// Which of the two memory budgets above is enforced.
    pub use_mobile_budget: bool,
    /// On startup, adopt pre-existing chunks in the scene as `authored`.
    pub preserve_editor_chunks: bool,
    /// When true, the streaming loop does not create new chunks.
    pub disable_dynamic_generation: bool,
    /// When true, reject any request to create a chunk with `z != 0`.
    pub flat_world_mode: bool,
    /// World seed used to derive per-chunk RNGs for seed variation.
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::DESKTOP,
            voxel_edge: 25.0,
            view_distance_chunks: 4,
            chunk_pool_size: 64,
            use_multithreading: true,
            worker_count: 4,
            max_concurrent_chunk_generations: 8,
            max_dispatch_per_tick: 5,
            mobile_memory_budget_mb: 256.0,
            pc_memory_budget_mb: 1024.0,
            use_mobile_budget: false,
            preserve_editor_chunks: false,
            disable_dynamic_generation: false,
            flat_world_mode: false,
            seed: 0,
        }
    }
}

impl WorldConfig {
    #[inline]
    pub fn active_memory_budget_mb(&self) -> f32 {
        if self.use_mobile_budget {
            self.mobile_memory_budget_mb
        } else {
            self.pc_memory_budget_mb
        }
    }

    /// Rejects nonsensical combinations before a world is ever constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size.volume() == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.view_distance_chunks <= 0 {
            return Err(ConfigError::ZeroViewDistance);
        }
        if self.max_concurrent_chunk_generations == 0 {
            return Err(ConfigError::ZeroConcurrentGenerations);
        }
        if self.voxel_edge <= 0.0 {
            return Err(ConfigError::NonPositiveVoxelEdge);
        }
        if self.active_memory_budget_mb() <= 0.0 {
            return Err(ConfigError::NonPositiveMemoryBudget);
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_size has zero volume")]
    ZeroChunkSize,
    #[error("view_distance_chunks must be positive")]
    ZeroViewDistance,
    #[error("max_concurrent_chunk_generations must be nonzero")]
    ZeroConcurrentGenerations,
    #[error("voxel_edge must be positive")]
    NonPositiveVoxelEdge,
    #[error("the active memory budget must be positive")]
    NonPositiveMemoryBudget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut cfg = WorldConfig::default();
        cfg.chunk_size = ChunkSize::new(0, 16, 16);
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::ZeroChunkSize);
    }

    #[test]
    fn zero_view_distance_is_rejected() {
        let mut cfg = WorldConfig::default();
        cfg.view_distance_chunks = 0;
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::ZeroViewDistance);
    }

    #[test]
    fn zero_concurrent_generations_is_rejected() {
        let mut cfg = WorldConfig::default();
        cfg.max_concurrent_chunk_generations = 0;
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::ZeroConcurrentGenerations
        );
    }

    #[test]
    fn mobile_budget_is_selected_when_flagged() {
        let mut cfg = WorldConfig::default();
        cfg.use_mobile_budget = true;
        assert_eq!(cfg.active_memory_budget_mb(), cfg.mobile_memory_budget_mb);
    }
}
