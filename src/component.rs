//! Chunk component (spec.md §4.5, component C5): the state machine owning
//! one chunk's voxels and latest mesh.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::coords::{ChunkPos, ChunkSize};
use crate::error::ChunkError;
use crate::lod::Lod;
use crate::mesh::{basic, convert, greedy, MeshData};
use crate::store::VoxelStore;
use crate::voxel::{Material, Voxel};
use crate::worker::{MeshJob, MesherOutput};

/// `Uninitialized → Generating → Generated → Meshing → Ready`, with
/// `Ready → Meshing` on a dirty remesh and `Unloading` as the soft-cancel
/// state for a chunk whose in-flight job result will be discarded
/// (spec.md §4.5, §5).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ChunkState {
    #[default]
    Uninitialized,
    Generating,
    Generated,
    Meshing,
    Ready,
    Unloading,
}

/// Outcome of [`ChunkCell::set_lod`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LodChange {
    /// `Lod::Unloaded` was requested; the mesh was cleared.
    Cleared,
    /// The chunk is dirty or not `Ready`; the caller should enqueue a mesh job.
    NeedsMesh,
    /// Nothing to do.
    Unchanged,
}

/// What happened when a worker's [`MesherOutput`] was handed back to its chunk.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ApplyOutcome {
    /// Applied; the chunk is now `Ready`.
    Applied,
    /// The result's generation didn't match the chunk's current generation;
    /// a newer job has since been dispatched, so this one is discarded
    /// (spec.md §5 "Ordering guarantees").
    Stale,
    /// The mesh failed validation; the chunk falls back to `Generated` for a
    /// future retry (spec.md §7 `MeshValidationFailed` policy).
    ValidationFailed,
}

/// One chunk's voxel data, mesh, and lifecycle state (spec.md §3 "Chunk",
/// §4.5 "Chunk component").
pub struct ChunkCell {
    chunk_pos: ChunkPos,
    size: ChunkSize,
    voxels: VoxelStore,
    authored: bool,
    state: ChunkState,
    lod: Lod,
    mesh: MeshData,
    generation: AtomicU64,
}

impl ChunkCell {
    /// A pooled, uninitialized cell with no backing storage allocated yet.
    pub fn empty(size: ChunkSize) -> Self {
        Self {
            chunk_pos: ChunkPos::ZERO,
            size,
            voxels: VoxelStore::new(size),
            authored: false,
            state: ChunkState::Uninitialized,
            lod: Lod::Unloaded,
            mesh: MeshData::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// `init`: claims this cell for `pos`, resets its voxels, and transitions
    /// to `Generating`.
    pub fn init(&mut self, pos: ChunkPos, size: ChunkSize) {
        self.chunk_pos = pos;
        self.size = size;
        self.voxels = VoxelStore::new(size);
        self.authored = false;
        self.state = ChunkState::Generating;
        self.mesh = MeshData::default();
    }

    #[inline]
    pub fn chunk_pos(&self) -> ChunkPos {
        self.chunk_pos
    }

    #[inline]
    pub fn size(&self) -> ChunkSize {
        self.size
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    #[inline]
    pub fn lod(&self) -> Lod {
        self.lod
    }

    #[inline]
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    #[inline]
    pub fn voxels(&self) -> &VoxelStore {
        &self.voxels
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.voxels.dirty()
    }

    /// `fill done`: the template loader or procedural generator finished
    /// writing voxels; moves `Generating → Generated`.
    pub fn mark_generated(&mut self) {
        if self.state == ChunkState::Generating {
            self.state = ChunkState::Generated;
        }
    }

    pub fn mark_authored(&mut self) {
        self.authored = true;
    }

    /// Replaces the voxel array wholesale with `materials` (template load or
    /// procedural fill). Marks the store clean — a fresh fill is not a dirty
    /// edit, it's the chunk's first content.
    pub fn load_materials(&mut self, materials: Vec<Material>) {
        self.voxels = VoxelStore::from_materials(self.size, materials);
    }

    #[inline]
    pub fn is_authored(&self) -> bool {
        self.authored
    }

    /// Direct voxel read; out-of-range returns `Air` (delegates to
    /// [`VoxelStore::get`]).
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> Voxel {
        self.voxels.get(x, y, z)
    }

    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, material: Material) -> Result<(), ChunkError> {
        self.voxels.set(x, y, z, Voxel::new(material))?;
        Ok(())
    }

    pub fn set_voxel_batch(
        &mut self,
        points: &[(i32, i32, i32)],
        materials: &[Material],
    ) -> Result<(), ChunkError> {
        self.voxels.set_batch(points, materials)?;
        Ok(())
    }

    pub fn fill_region(&mut self, min: (i32, i32, i32), max: (i32, i32, i32), material: Material) {
        self.voxels.fill_region(min, max, material);
    }

    /// `set_lod`: clears the mesh on `Unloaded`, otherwise reports whether a
    /// mesh job is needed. Does not itself enqueue anything — the world
    /// manager owns the work queue.
    pub fn set_lod(&mut self, lod: Lod) -> LodChange {
        self.lod = lod;
        if lod == Lod::Unloaded {
            self.mesh = MeshData::default();
            self.state = ChunkState::Uninitialized;
            return LodChange::Cleared;
        }
        if self.voxels.dirty() || self.state != ChunkState::Ready {
            LodChange::NeedsMesh
        } else {
            LodChange::Unchanged
        }
    }

    /// Synchronous meshing: used when `use_multithreading` is off, and by
    /// tests. Runs in place and applies the result immediately.
    pub fn generate_mesh_sync(&mut self, edge: f32, bound: f32) -> Result<(), ChunkError> {
        if self.state == ChunkState::Meshing {
            return Err(ChunkError::Busy);
        }
        self.generation.fetch_add(1, Ordering::Relaxed);
        self.state = ChunkState::Meshing;

        let result = if self.lod.uses_basic_mesher() {
            let half_res = self.voxels.downsample_2x();
            basic::generate_basic_mesh(&half_res, edge * 2.0, bound)
        } else {
            let quads = greedy::generate_greedy_quads(&self.voxels);
            convert::quads_to_mesh(&quads, edge, bound)
        };

        match result {
            Ok(mesh) => {
                self.mesh = mesh;
                self.voxels.clear_dirty();
                self.state = ChunkState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ChunkState::Generated;
                Err(ChunkError::MeshValidation(e))
            }
        }
    }

    /// Begins an asynchronous mesh job: bumps the generation counter,
    /// transitions to `Meshing`, and returns a snapshot for the worker pool
    /// to run off the main sequence (spec.md §5 "Snapshots").
    pub fn begin_async_mesh(&mut self, edge: f32, bound: f32) -> Result<MeshJob, ChunkError> {
        if self.state == ChunkState::Meshing {
            return Err(ChunkError::Busy);
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.state = ChunkState::Meshing;

        Ok(MeshJob {
            chunk_pos: self.chunk_pos,
            generation,
            size: self.size,
            voxels: self.voxels.raw().to_vec(),
            lod: self.lod,
            greedy: !self.lod.uses_basic_mesher(),
            edge,
            bound,
        })
    }

    /// Applies a worker's result, discarding it if stale (spec.md §5
    /// "Ordering guarantees").
    pub fn apply_mesh_result(&mut self, output: MesherOutput) -> ApplyOutcome {
        if output.generation != self.generation() {
            return ApplyOutcome::Stale;
        }
        match output.result {
            Ok(mesh) => {
                self.mesh = mesh;
                self.voxels.clear_dirty();
                self.state = ChunkState::Ready;
                ApplyOutcome::Applied
            }
            Err(e) => {
                tracing::error!(chunk_pos = %self.chunk_pos, error = %e, "mesh validation failed");
                self.state = ChunkState::Generated;
                ApplyOutcome::ValidationFailed
            }
        }
    }

    /// Soft-cancels any in-flight job for this chunk: its eventual result
    /// will already fail the generation check once the chunk is reused, but
    /// marking `Unloading` documents intent (spec.md §5 "Cancellation").
    pub fn begin_unload(&mut self) {
        if self.state == ChunkState::Meshing {
            self.state = ChunkState::Unloading;
        }
    }

    /// `return_to_pool`: resets to a pristine, unpositioned cell.
    pub fn return_to_pool(&mut self) {
        self.chunk_pos = ChunkPos::ZERO;
        self.voxels.clear();
        self.authored = false;
        self.state = ChunkState::Uninitialized;
        self.lod = Lod::Unloaded;
        self.mesh = MeshData::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_chunk(size: ChunkSize) -> ChunkCell {
        let mut cell = ChunkCell::empty(size);
        cell.init(ChunkPos::new(0, 0, 0), size);
        cell.fill_region((0, 0, 0), (size.x as i32, size.y as i32, size.z as i32), Material::STONE);
        cell.mark_generated();
        cell.generate_mesh_sync(1.0, 1.0e5).unwrap();
        cell
    }

    #[test]
    fn init_sets_generating_state() {
        let mut cell = ChunkCell::empty(ChunkSize::cubic(4));
        cell.init(ChunkPos::new(1, 2, 3), ChunkSize::cubic(4));
        assert_eq!(cell.state(), ChunkState::Generating);
        assert_eq!(cell.chunk_pos(), ChunkPos::new(1, 2, 3));
    }

    #[test]
    fn generate_mesh_sync_reaches_ready() {
        let cell = ready_chunk(ChunkSize::cubic(4));
        assert_eq!(cell.state(), ChunkState::Ready);
        assert!(!cell.mesh().is_empty());
    }

    #[test]
    fn generate_mesh_while_meshing_is_rejected() {
        let mut cell = ChunkCell::empty(ChunkSize::cubic(4));
        cell.init(ChunkPos::ZERO, ChunkSize::cubic(4));
        cell.mark_generated();
        // begin_async_mesh transitions to Meshing without completing it.
        let _job = cell.begin_async_mesh(1.0, 1.0e5).unwrap();
        assert_eq!(cell.state(), ChunkState::Meshing);
        let err = cell.generate_mesh_sync(1.0, 1.0e5).unwrap_err();
        assert_eq!(err, ChunkError::Busy);
    }

    #[test]
    fn set_lod_unloaded_clears_mesh() {
        let mut cell = ready_chunk(ChunkSize::cubic(4));
        let change = cell.set_lod(Lod::Unloaded);
        assert_eq!(change, LodChange::Cleared);
        assert!(cell.mesh().is_empty());
        assert_eq!(cell.state(), ChunkState::Uninitialized);
    }

    #[test]
    fn stale_mesh_result_is_discarded() {
        let mut cell = ChunkCell::empty(ChunkSize::cubic(4));
        cell.init(ChunkPos::ZERO, ChunkSize::cubic(4));
        cell.mark_generated();
        let job1 = cell.begin_async_mesh(1.0, 1.0e5).unwrap();
        // a second dispatch would need state back to Generated; simulate by
        // resetting state directly as the world manager would after forcing
        // a fresh dirty flip.
        cell.return_to_pool();
        cell.init(ChunkPos::ZERO, ChunkSize::cubic(4));
        cell.mark_generated();
        let _job2 = cell.begin_async_mesh(1.0, 1.0e5).unwrap();

        let stale_output = MesherOutput {
            chunk_pos: job1.chunk_pos,
            generation: job1.generation,
            result: Ok(MeshData::default()),
        };
        assert_eq!(cell.apply_mesh_result(stale_output), ApplyOutcome::Stale);
    }

    #[test]
    fn authored_flag_round_trips() {
        let mut cell = ChunkCell::empty(ChunkSize::cubic(4));
        cell.init(ChunkPos::ZERO, ChunkSize::cubic(4));
        assert!(!cell.is_authored());
        cell.mark_authored();
        assert!(cell.is_authored());
    }
}
