//! World manager (spec.md §4.6, component C6): active chunk map, pool,
//! viewer-centric streaming, work queue dispatch, and memory budget
//! enforcement. Owns all mutable chunk state on the main sequence (spec.md
//! §5 "Active chunk map: main-sequence only"); the work queue is the one
//! piece guarded by a lock, per the same section.

pub mod budget;
pub mod queue;

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, MutexGuard};

use crate::component::{ChunkCell, LodChange};
use crate::config::{ConfigError, WorldConfig};
use crate::coords::{world_to_chunk, world_to_local, ChunkPos, ChunkSize};
use crate::error::WorldError;
use crate::stats::WorldStats;
use crate::sync::{LockStrategy, StrategicWriteLock};
use crate::template::format::Template;
use crate::voxel::Material;
use crate::worker::MeshWorkerPool;
use queue::WorkQueue;

/// The Z-range added to the viewer's chunk coordinate to build the required
/// set when `flat_world_mode` is off (spec.md §4.6 step 2).
const VERTICAL_RANGE: std::ops::RangeInclusive<i32> = -2..=2;

pub struct WorldManager {
    config: WorldConfig,
    active: HashMap<ChunkPos, ChunkCell>,
    pool: Vec<ChunkCell>,
    queue: Mutex<WorkQueue>,
    workers: Option<MeshWorkerPool>,
    budget: budget::BudgetMonitor,
    stats: WorldStats,
    template: Option<Template>,
}

impl WorldManager {
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = (0..config.chunk_pool_size)
            .map(|_| ChunkCell::empty(config.chunk_size))
            .collect();
        let workers = config
            .use_multithreading
            .then(|| MeshWorkerPool::new(config.worker_count));

        Ok(Self {
            active: HashMap::new(),
            pool,
            queue: Mutex::new(WorkQueue::new()),
            workers,
            budget: budget::BudgetMonitor::new(),
            stats: WorldStats::default(),
            template: None,
            config,
        })
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&ChunkCell> {
        self.active.get(&pos)
    }

    pub fn active_chunk_count(&self) -> usize {
        self.active.len()
    }

    pub fn pooled_chunk_count(&self) -> usize {
        self.pool.len()
    }

    pub fn stats(&self) -> WorldStats {
        self.stats
    }

    /// All work-queue access goes through here rather than calling
    /// `parking_lot` directly (see [`crate::sync`]). Blocking never fails.
    fn queue_mut(&self) -> MutexGuard<'_, WorkQueue> {
        self.queue
            .strategic_write(LockStrategy::Blocking)
            .expect("blocking strategy never fails")
    }

    /// Adopts a chunk that already existed in the host scene as `authored`
    /// (spec.md §4.6 `preserve_editor_chunks`). The caller decides when this
    /// applies; this method itself doesn't consult the flag.
    pub fn adopt_editor_chunk(&mut self, pos: ChunkPos, materials: Vec<Material>) -> Result<(), WorldError> {
        if self.config.flat_world_mode && pos.z != 0 {
            return Err(WorldError::FlatWorldRejected(pos));
        }
        let mut cell = self.take_pooled_or_new();
        cell.init(pos, self.config.chunk_size);
        cell.load_materials(materials);
        cell.set_lod(crate::lod::Lod::Lod0);
        cell.mark_authored();
        cell.mark_generated();
        self.active.insert(pos, cell);
        Ok(())
    }

    /// Viewer-centric streaming step (spec.md §4.6, run at `chunk_update_interval`).
    pub fn tick_streaming(&mut self, viewer_world_pos: glam::Vec3A) {
        let size = self.config.chunk_size;
        let edge = self.config.voxel_edge;
        let viewer_chunk = world_to_chunk(viewer_world_pos, size, edge);
        let view_distance = self.config.view_distance_chunks;

        let required = self.required_set(viewer_chunk, view_distance);

        if !self.config.disable_dynamic_generation {
            let to_load: Vec<ChunkPos> = required
                .iter()
                .copied()
                .filter(|p| !self.active.contains_key(p))
                .collect();
            for pos in to_load {
                self.load_chunk_at(pos, viewer_world_pos);
            }
        }

        let to_unload: Vec<ChunkPos> = self
            .active
            .keys()
            .copied()
            .filter(|p| !required.contains(p))
            .collect();
        for pos in to_unload {
            self.unload_chunk(pos);
        }
    }

    fn required_set(&self, viewer_chunk: ChunkPos, view_distance: i32) -> HashSet<ChunkPos> {
        let mut required = HashSet::new();
        let z_range: Vec<i32> = if self.config.flat_world_mode {
            vec![0]
        } else {
            VERTICAL_RANGE.collect()
        };
        for dx in -view_distance..=view_distance {
            for dy in -view_distance..=view_distance {
                for &dz in &z_range {
                    required.insert(ChunkPos::new(
                        viewer_chunk.x + dx,
                        viewer_chunk.y + dy,
                        viewer_chunk.z + dz,
                    ));
                }
            }
        }
        required
    }

    fn load_chunk_at(&mut self, pos: ChunkPos, viewer_world_pos: glam::Vec3A) {
        if self.config.flat_world_mode && pos.z != 0 {
            return;
        }
        let mut cell = self.take_pooled_or_new();
        cell.init(pos, self.config.chunk_size);
        // A freshly streamed-in chunk starts at full detail; `refresh_lod`
        // corrects this on its next pass based on actual viewer distance.
        cell.set_lod(crate::lod::Lod::Lod0);
        self.populate_chunk(&mut cell);
        cell.mark_generated();
        let priority = self.priority_for(pos, viewer_world_pos);
        self.queue_mut().push(pos, priority, false);
        self.active.insert(pos, cell);
    }

    fn take_pooled_or_new(&mut self) -> ChunkCell {
        self.pool
            .pop()
            .unwrap_or_else(|| ChunkCell::empty(self.config.chunk_size))
    }

    fn unload_chunk(&mut self, pos: ChunkPos) {
        if let Some(mut cell) = self.active.remove(&pos) {
            cell.begin_unload();
            cell.return_to_pool();
            self.pool.push(cell);
        }
    }

    /// Fills a freshly-initialized chunk's voxels from the template (if one
    /// covers `pos`) or the procedural fallback, unless the chunk is
    /// `authored` — authored chunks are never procedurally overwritten
    /// (spec.md §1 "protection of manually-authored chunks").
    fn populate_chunk(&self, cell: &mut ChunkCell) {
        if cell.is_authored() {
            return;
        }
        let pos = cell.chunk_pos();
        let size = cell.size();
        let materials = self
            .template
            .as_ref()
            .and_then(|template| {
                crate::template::load_chunk(template, pos, size).ok().map(|mut mats| {
                    crate::template::apply_seed_variation(
                        &mut mats,
                        size,
                        template,
                        self.config.seed,
                        pos,
                        self.config.voxel_edge,
                    );
                    mats
                })
            })
            .unwrap_or_else(|| {
                crate::template::generate_procedural_chunk(size, pos, self.config.seed, 0.03, 10.0, 10.0)
            });
        cell.load_materials(materials);
    }

    fn priority_for(&self, pos: ChunkPos, viewer_world_pos: glam::Vec3A) -> i32 {
        let center = pos.world_center(self.config.chunk_size, self.config.voxel_edge);
        ((center - viewer_world_pos).length() / 1000.0).floor() as i32
    }

    fn mesh_bound(&self) -> f32 {
        let size = self.config.chunk_size;
        let max_extent = size.x.max(size.y).max(size.z) as f32;
        2.0 * max_extent * self.config.voxel_edge
    }

    /// Dispatcher (spec.md §4.6 "A separate dispatcher processes the
    /// queue"): pops up to `max_dispatch_per_tick` tasks, respecting
    /// `max_concurrent_chunk_generations`, and dispatches any that still
    /// need meshing.
    pub fn dispatch_tick(&mut self) {
        let mut processed = 0usize;
        let bound = self.mesh_bound();
        let edge = self.config.voxel_edge;

        while processed < self.config.max_dispatch_per_tick {
            let in_flight = self.workers.as_ref().map_or(0, |w| w.in_flight());
            if in_flight >= self.config.max_concurrent_chunk_generations {
                break;
            }
            let Some((pos, _priority, is_regeneration)) = self.queue_mut().pop() else {
                break;
            };
            let Some(cell) = self.active.get_mut(&pos) else {
                continue;
            };
            if cell.state() == crate::component::ChunkState::Ready && !is_regeneration {
                continue;
            }
            processed += 1;

            if let Some(workers) = &self.workers {
                if let Ok(job) = cell.begin_async_mesh(edge, bound) {
                    workers.submit(job);
                }
            } else {
                let _ = cell.generate_mesh_sync(edge, bound);
            }
        }
    }

    /// Drains every finished worker result and applies it to its chunk
    /// (spec.md §4.7 "Application ... and transition to Ready happen on the
    /// main sequence only").
    pub fn collect_completions(&mut self) {
        if let Some(workers) = &self.workers {
            for output in workers.collect_ready() {
                if let Some(cell) = self.active.get_mut(&output.chunk_pos) {
                    cell.apply_mesh_result(output);
                }
            }
        }
    }

    /// Memory budget enforcement (spec.md §4.6, run at `memory_check_interval`).
    /// Returns `true` exactly on the tick the budget first goes over cap.
    pub fn enforce_budget(&mut self, viewer_world_pos: glam::Vec3A) -> bool {
        let total_vertices: usize = self.active.values().map(|c| c.mesh().vertex_count()).sum();
        let total_triangles: usize = self.active.values().map(|c| c.mesh().triangle_count()).sum();
        let used_mb = budget::estimate_memory_mb(self.active.len(), total_vertices, total_triangles);
        let cap_mb = self.config.active_memory_budget_mb();
        let just_exceeded = self.budget.check(used_mb, cap_mb);

        let mut evicted = 0usize;
        if used_mb > cap_mb {
            let mut by_distance: Vec<(ChunkPos, f32)> = self
                .active
                .keys()
                .map(|&pos| {
                    let center = pos.world_center(self.config.chunk_size, self.config.voxel_edge);
                    (pos, (center - viewer_world_pos).length())
                })
                .collect();
            by_distance.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            let n = budget::eviction_count(self.active.len());
            for (pos, _) in by_distance.into_iter().take(n) {
                self.unload_chunk(pos);
                evicted += 1;
            }
        }

        self.stats = WorldStats {
            active_chunks: self.active.len(),
            pooled_chunks: self.pool.len(),
            in_flight_jobs: self.workers.as_ref().map_or(0, |w| w.in_flight()),
            queued_jobs: self.queue_mut().len(),
            last_budget_eviction_count: evicted,
            estimated_memory_mb: used_mb,
            last_weld_efficiency: self.stats.last_weld_efficiency,
        };
        just_exceeded
    }

    /// `world.set_voxel` (spec.md §4.6 "Set-voxel side effects"): get-or-create
    /// the owning chunk, write the voxel, and if it sits on a chunk face,
    /// enqueue the existing 26-neighbourhood for regeneration at priority 1.
    pub fn set_voxel(&mut self, world_pos: glam::Vec3A, material: Material) -> Result<(), WorldError> {
        let size = self.config.chunk_size;
        let edge = self.config.voxel_edge;
        let chunk_pos = world_to_chunk(world_pos, size, edge);
        if self.config.flat_world_mode && chunk_pos.z != 0 {
            return Err(WorldError::FlatWorldRejected(chunk_pos));
        }
        let local = world_to_local(world_pos, chunk_pos, size, edge);

        if !self.active.contains_key(&chunk_pos) {
            let mut cell = self.take_pooled_or_new();
            cell.init(chunk_pos, size);
            cell.set_lod(crate::lod::Lod::Lod0);
            self.populate_chunk(&mut cell);
            cell.mark_generated();
            self.active.insert(chunk_pos, cell);
        }

        let cell = self.active.get_mut(&chunk_pos).expect("just inserted above");
        cell.set_voxel(local.0, local.1, local.2, material)
            .expect("world_to_local always yields coordinates in range for its own chunk_pos");

        if is_on_chunk_face(local, size) {
            self.enqueue_neighbour_regeneration(chunk_pos);
        }
        Ok(())
    }

    /// LOD recomputation (component C9, spec.md §4.9 data flow "C9 LOD ->
    /// chunk.state=Meshing -> C7 worker pool"): recomputes each active
    /// chunk's distance band and enqueues any whose new LOD needs a mesh.
    pub fn refresh_lod(&mut self, viewer_world_pos: glam::Vec3A) {
        let updates: Vec<(ChunkPos, crate::lod::Lod)> = self
            .active
            .keys()
            .map(|&pos| {
                let center = pos.world_center(self.config.chunk_size, self.config.voxel_edge);
                let distance = (center - viewer_world_pos).length();
                (pos, crate::lod::select_lod(distance))
            })
            .collect();

        for (pos, lod) in updates {
            if self.active.get(&pos).map(|c| c.lod()) == Some(lod) {
                continue;
            }
            let Some(cell) = self.active.get_mut(&pos) else {
                continue;
            };
            if let LodChange::NeedsMesh = cell.set_lod(lod) {
                let priority = self.priority_for(pos, viewer_world_pos);
                self.queue_mut().push(pos, priority, true);
            }
        }
    }

    /// Periodic dirty sweep (spec.md §4.5 `Ready --set_voxel/dirty--> Meshing`):
    /// a single `set_voxel` only enqueues the 26-neighbourhood directly
    /// (spec.md §4.6); the edited chunk itself picks up its own remesh here,
    /// the next time this runs. Intended to run alongside the LOD refresh
    /// (component C9, spec.md §4.9 "triggers regeneration").
    pub fn enqueue_dirty_chunks(&mut self, viewer_world_pos: glam::Vec3A) {
        let dirty: Vec<ChunkPos> = self
            .active
            .iter()
            .filter(|(_, cell)| cell.state() == crate::component::ChunkState::Ready && cell.is_dirty())
            .map(|(&pos, _)| pos)
            .collect();
        for pos in dirty {
            let priority = self.priority_for(pos, viewer_world_pos);
            self.queue_mut().push(pos, priority, true);
        }
    }

    fn enqueue_neighbour_regeneration(&mut self, chunk_pos: ChunkPos) {
        let mut queue = self.queue_mut();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let neighbour = ChunkPos::new(chunk_pos.x + dx, chunk_pos.y + dy, chunk_pos.z + dz);
                    if self.active.contains_key(&neighbour) {
                        queue.push(neighbour, 1, true);
                    }
                }
            }
        }
    }

    /// Bulk sphere edit (spec.md §4.6 "Sphere/box bulk edits"): every voxel
    /// center within `radius` of `center`, deduplicated per chunk, each
    /// enqueued once at priority 0.
    pub fn edit_sphere(&mut self, center: glam::Vec3A, radius: f32, material: Material) -> Result<(), WorldError> {
        let edge = self.config.voxel_edge;
        let steps = (radius / edge).ceil() as i32 + 1;
        let mut touched = HashSet::new();
        for dz in -steps..=steps {
            for dy in -steps..=steps {
                for dx in -steps..=steps {
                    let offset = glam::Vec3A::new(dx as f32, dy as f32, dz as f32) * edge;
                    if offset.length() > radius {
                        continue;
                    }
                    let world_pos = center + offset;
                    let chunk_pos = world_to_chunk(world_pos, self.config.chunk_size, edge);
                    if self.config.flat_world_mode && chunk_pos.z != 0 {
                        continue;
                    }
                    self.set_voxel(world_pos, material)?;
                    touched.insert(chunk_pos);
                }
            }
        }
        self.enqueue_bulk_regeneration(touched);
        Ok(())
    }

    /// Bulk box edit, same dedup/priority treatment as [`Self::edit_sphere`].
    pub fn edit_box(&mut self, min: glam::Vec3A, max: glam::Vec3A, material: Material) -> Result<(), WorldError> {
        let edge = self.config.voxel_edge;
        let nx = (((max.x - min.x) / edge).ceil() as i32).max(1);
        let ny = (((max.y - min.y) / edge).ceil() as i32).max(1);
        let nz = (((max.z - min.z) / edge).ceil() as i32).max(1);
        let mut touched = HashSet::new();
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let world_pos = min + glam::Vec3A::new(ix as f32, iy as f32, iz as f32) * edge;
                    let chunk_pos = world_to_chunk(world_pos, self.config.chunk_size, edge);
                    if self.config.flat_world_mode && chunk_pos.z != 0 {
                        continue;
                    }
                    self.set_voxel(world_pos, material)?;
                    touched.insert(chunk_pos);
                }
            }
        }
        self.enqueue_bulk_regeneration(touched);
        Ok(())
    }

    fn enqueue_bulk_regeneration(&mut self, touched: HashSet<ChunkPos>) {
        let mut queue = self.queue_mut();
        for pos in touched {
            queue.push(pos, 0, true);
        }
    }

    pub fn shutdown(self) {
        if let Some(workers) = self.workers {
            workers.shutdown();
        }
    }
}

fn is_on_chunk_face(local: (i32, i32, i32), size: ChunkSize) -> bool {
    local.0 == 0
        || local.0 == size.x as i32 - 1
        || local.1 == 0
        || local.1 == size.y as i32 - 1
        || local.2 == 0
        || local.2 == size.z as i32 - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ChunkState;

    fn test_config() -> WorldConfig {
        WorldConfig {
            chunk_size: ChunkSize::cubic(8),
            voxel_edge: 1.0,
            view_distance_chunks: 1,
            chunk_pool_size: 4,
            use_multithreading: false,
            worker_count: 1,
            max_concurrent_chunk_generations: 8,
            max_dispatch_per_tick: 5,
            mobile_memory_budget_mb: 256.0,
            pc_memory_budget_mb: 1024.0,
            use_mobile_budget: false,
            preserve_editor_chunks: false,
            disable_dynamic_generation: false,
            flat_world_mode: false,
            seed: 1,
        }
    }

    #[test]
    fn streaming_loads_required_set_and_unloads_the_rest() {
        let mut world = WorldManager::new(test_config()).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        // view_distance=1, vertical range -2..=2: (2*1+1)^2 * 5 = 45 chunks.
        assert_eq!(world.active_chunk_count(), 45);

        world.tick_streaming(glam::Vec3A::new(10_000.0, 10_000.0, 0.0));
        assert_eq!(world.active_chunk_count(), 45);
        assert!(world.pooled_chunk_count() > 0);
    }

    #[test]
    fn flat_world_mode_restricts_to_z_zero() {
        let mut config = test_config();
        config.flat_world_mode = true;
        let mut world = WorldManager::new(config).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        assert!(world.active.keys().all(|p| p.z == 0));

        let err = world
            .set_voxel(glam::Vec3A::new(0.0, 0.0, 100.0), Material::STONE)
            .unwrap_err();
        assert!(matches!(err, WorldError::FlatWorldRejected(_)));
    }

    #[test]
    fn disable_dynamic_generation_prevents_new_chunks() {
        let mut config = test_config();
        config.disable_dynamic_generation = true;
        let mut world = WorldManager::new(config).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        assert_eq!(world.active_chunk_count(), 0);
    }

    #[test]
    fn set_voxel_on_chunk_face_enqueues_existing_neighbours() {
        let mut world = WorldManager::new(test_config()).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        // x=0 is the first voxel of chunk (0,0,0); its -X neighbour (-1,0,0)
        // is within the loaded required set.
        world.set_voxel(glam::Vec3A::new(0.0, 1.0, 1.0), Material::STONE).unwrap();
        assert!(world.queue_mut().len() > 0);
    }

    #[test]
    fn dispatch_and_collect_drives_a_chunk_to_ready() {
        let mut world = WorldManager::new(test_config()).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        for _ in 0..20 {
            world.dispatch_tick();
            world.collect_completions();
        }
        let ready = world
            .active
            .values()
            .filter(|c| c.state() == ChunkState::Ready)
            .count();
        assert_eq!(ready, world.active_chunk_count());
    }

    #[test]
    fn edit_sphere_touches_and_enqueues_affected_chunks() {
        let mut world = WorldManager::new(test_config()).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        world.edit_sphere(glam::Vec3A::new(4.0, 4.0, 4.0), 3.0, Material::WATER).unwrap();
        assert!(world.queue_mut().len() > 0);
    }

    #[test]
    fn authored_chunk_survives_restreaming_without_procedural_overwrite() {
        let mut world = WorldManager::new(test_config()).unwrap();
        let materials = vec![Material::WOOD; test_config().chunk_size.volume()];
        world.adopt_editor_chunk(ChunkPos::ZERO, materials.clone()).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        let cell = world.chunk(ChunkPos::ZERO).unwrap();
        assert!(cell.is_authored());
        for x in 0..cell.size().x as i32 {
            assert_eq!(cell.get_voxel(x, 0, 0).material(), Material::WOOD);
        }
    }

    #[test]
    fn budget_enforcement_evicts_farthest_chunks_when_over_cap() {
        let mut config = test_config();
        config.pc_memory_budget_mb = 0.0001;
        let mut world = WorldManager::new(config).unwrap();
        world.tick_streaming(glam::Vec3A::ZERO);
        let before = world.active_chunk_count();
        let just_exceeded = world.enforce_budget(glam::Vec3A::ZERO);
        assert!(just_exceeded);
        assert!(world.active_chunk_count() < before);
    }
}
