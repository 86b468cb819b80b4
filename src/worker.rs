//! Worker pool & job runtime (spec.md §4.7, component C7).
//!
//! Generalizes the teacher's `render/meshing/workers.rs` `Worker`/
//! `MeshWorkerPool`/`FinishedChunks` trio: its `bevy::tasks::TaskPool` task
//! becomes a plain `std::thread` loop (no ECS task pool to borrow here), and
//! its `DashMap<ChunkPos, MesherOutput>` "finished" table is kept verbatim.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;

use crate::coords::{ChunkPos, ChunkSize};
use crate::error::MeshValidationError;
use crate::lod::Lod;
use crate::mesh::{basic, convert, greedy, MeshData};
use crate::voxel::Material;

/// A snapshot of one chunk's voxels, handed to a worker by value so the main
/// sequence is free to keep mutating the live chunk after dispatch (spec.md
/// §5 "Snapshots").
#[derive(Clone, Debug)]
pub struct MeshJob {
    pub chunk_pos: ChunkPos,
    /// The chunk's generation counter at dispatch time; carried back on the
    /// result so stale completions can be detected (spec.md §5 "Ordering
    /// guarantees").
    pub generation: u64,
    pub size: ChunkSize,
    pub voxels: Vec<Material>,
    pub lod: Lod,
    /// `true` to run the greedy mesher (LOD0), `false` for the basic mesher
    /// at doubled voxel scale (LOD1/LOD2, spec.md §4.9).
    pub greedy: bool,
    pub edge: f32,
    pub bound: f32,
}

/// What a worker sends back for one [`MeshJob`].
#[derive(Clone, Debug)]
pub struct MesherOutput {
    pub chunk_pos: ChunkPos,
    pub generation: u64,
    pub result: Result<MeshData, MeshValidationError>,
}

/// Shared, cloneable handle to the finished-job table (teacher's
/// `FinishedChunks(DashMap<...>)`).
#[derive(Clone, Default)]
struct FinishedJobs(Arc<DashMap<ChunkPos, MesherOutput>>);

struct Worker {
    handle: Option<JoinHandle<()>>,
    interrupt: Arc<AtomicBool>,
}

impl Worker {
    fn spawn(label: String, jobs: Receiver<MeshJob>, finished: FinishedJobs) -> Self {
        let interrupt = Arc::new(AtomicBool::new(false));
        let worker_interrupt = interrupt.clone();

        let handle = std::thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                while !worker_interrupt.load(Ordering::Relaxed) {
                    match jobs.recv_timeout(Duration::from_millis(500)) {
                        Ok(job) => {
                            let chunk_pos = job.chunk_pos;
                            let generation = job.generation;
                            let result = run_job(job);
                            if let Err(ref e) = result {
                                tracing::error!(%chunk_pos, error = %e, "mesh job failed validation");
                            }
                            finished.0.insert(
                                chunk_pos,
                                MesherOutput {
                                    chunk_pos,
                                    generation,
                                    result,
                                },
                            );
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => {
                            tracing::warn!(worker = %label, "job channel disconnected, worker shutting down");
                            return;
                        }
                    }
                }
                tracing::info!(worker = %label, "worker interrupted, shutting down");
            })
            .expect("failed to spawn mesh worker thread");

        Self {
            handle: Some(handle),
            interrupt,
        }
    }

    fn stop(mut self) {
        self.interrupt.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_job(job: MeshJob) -> Result<MeshData, MeshValidationError> {
    let store = crate::store::VoxelStore::from_materials(job.size, job.voxels);

    if job.greedy {
        let quads = greedy::generate_greedy_quads(&store);
        convert::quads_to_mesh(&quads, job.edge, job.bound)
    } else {
        let half_res = store.downsample_2x();
        let doubled_edge = job.edge * 2.0;
        basic::generate_basic_mesh(&half_res, doubled_edge, job.bound)
    }
}

/// A fixed-size pool of threads draining a shared job channel into a shared
/// finished-job table, generalized from the teacher's `MeshWorkerPool`.
pub struct MeshWorkerPool {
    workers: Vec<Worker>,
    jobs_tx: Sender<MeshJob>,
    finished: FinishedJobs,
    in_flight: Arc<AtomicUsize>,
}

impl MeshWorkerPool {
    pub fn new(worker_count: usize) -> Self {
        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<MeshJob>();
        let finished = FinishedJobs::default();
        let workers = (0..worker_count.max(1))
            .map(|i| Worker::spawn(format!("mesh-worker-{i}"), jobs_rx.clone(), finished.clone()))
            .collect();

        Self {
            workers,
            jobs_tx,
            finished,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current count of jobs dispatched but not yet collected.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Submits a job. Removes any stale pending result for the same chunk
    /// first, matching the teacher's `queue_job` (which clears `finished`
    /// before sending, so a worker's race with an old result can't surface).
    pub fn submit(&self, job: MeshJob) {
        self.finished.0.remove(&job.chunk_pos);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        tracing::info!(chunk_pos = %job.chunk_pos, generation = job.generation, "mesh job dispatched");
        self.jobs_tx.send(job).expect("mesh worker channel closed");
    }

    /// Removes and returns a finished result for `chunk_pos`, if any.
    pub fn collect(&self, chunk_pos: ChunkPos) -> Option<MesherOutput> {
        let out = self.finished.0.remove(&chunk_pos).map(|(_, v)| v);
        if out.is_some() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
        }
        out
    }

    /// Drains every finished result currently available, for the world
    /// manager's once-per-tick collection step.
    pub fn collect_ready(&self) -> Vec<MesherOutput> {
        let keys: Vec<ChunkPos> = self.finished.0.iter().map(|e| *e.key()).collect();
        keys.into_iter().filter_map(|k| self.collect(k)).collect()
    }

    pub fn shutdown(self) {
        for worker in self.workers {
            worker.stop();
        }
    }
}
