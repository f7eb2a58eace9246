//! # Task Management System
//!
//! This module runs terrain generation and meshing on one dedicated background
//! thread, the terrain worker, so the main thread never waits on either.
//!
//! ## Architecture Overview
//!
//! - [`TerrainWorker`]: owns the worker thread and the shared job state
//! - [`Task`]: a unit of work with an owned input and a plain-data output
//! - Two FIFO input queues (generation and meshing) behind one mutex
//! - Two finished lists behind a second mutex
//!
//! ## Job Lifecycle
//! 1. The world enqueues a job with `enqueue_generation` or `enqueue_meshing`
//! 2. The worker wakes, pops the next job (generation first) and runs it
//! 3. The output is appended to the matching finished list
//! 4. Once per frame the world calls `take_finished`, which swaps both lists out under
//!    the lock, and integrates the results after the lock is released
//!
//! ## Shutdown
//! Dropping the worker raises the stop flag, wakes the thread and joins it. A job that
//! is already running finishes first; jobs still queued are abandoned.

pub mod task;

use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Condvar, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{error, info};
use task::Task;

use super::{
    rendering::tasks::chunk_mesh_generation_task::{
        ChunkMeshGenerationTask, ChunkMeshGenerationTaskResult,
    },
    voxels::tasks::chunk_generation_task::{ChunkGenerationTask, ChunkGenerationTaskResult},
};

/// Jobs waiting for the worker.
#[derive(Default)]
struct JobQueues {
    generation: VecDeque<ChunkGenerationTask>,
    meshing: VecDeque<ChunkMeshGenerationTask>,
}

enum Job {
    Generate(ChunkGenerationTask),
    Mesh(ChunkMeshGenerationTask),
}

impl JobQueues {
    /// Generation jobs always go first.
    fn pop_next(&mut self) -> Option<Job> {
        self.generation
            .pop_front()
            .map(Job::Generate)
            .or_else(|| self.meshing.pop_front().map(Job::Mesh))
    }

    fn is_empty(&self) -> bool {
        self.generation.is_empty() && self.meshing.is_empty()
    }
}

/// Results waiting for the main thread.
#[derive(Default)]
pub struct FinishedJobs {
    /// Generated block data
    pub generated: Vec<ChunkGenerationTaskResult>,
    /// Generated meshes
    pub meshed: Vec<ChunkMeshGenerationTaskResult>,
}

impl FinishedJobs {
    /// `true` if there is nothing to integrate.
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty() && self.meshed.is_empty()
    }
}

/// State shared between the owner and the worker thread.
struct WorkerShared {
    queues: Mutex<JobQueues>,
    wake: Condvar,
    finished: Mutex<FinishedJobs>,
    stop: AtomicBool,
    in_flight: AtomicUsize,
}

/// Queue lengths of a worker, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Generation jobs not started yet
    pub queued_generation: usize,
    /// Meshing jobs not started yet
    pub queued_meshing: usize,
    /// Jobs currently running (0 or 1)
    pub in_flight: usize,
    /// Generation results not taken yet
    pub finished_generation: usize,
    /// Meshing results not taken yet
    pub finished_meshing: usize,
}

/// The dedicated terrain thread and its job queues.
///
/// # Thread Safety
/// Only the owner enqueues and takes results. Jobs carry their own data (chunk
/// handles plus snapshots) so the worker never needs the world.
pub struct TerrainWorker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

/// Locks a mutex, recovering the guard if a panic poisoned it. Queues stay
/// structurally valid because jobs run outside the locks.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TerrainWorker {
    /// Spawns the worker thread.
    ///
    /// `idle_sleep` bounds how long the thread waits for work before re-checking the
    /// stop flag.
    ///
    /// # Panics
    /// Panics if the operating system refuses to create the thread.
    pub fn new(idle_sleep: Duration) -> Self {
        let shared = Arc::new(WorkerShared {
            queues: Mutex::new(JobQueues::default()),
            wake: Condvar::new(),
            finished: Mutex::new(FinishedJobs::default()),
            stop: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("terrain-worker".to_string())
            .spawn(move || run_worker(&thread_shared, idle_sleep))
            .unwrap_or_else(|e| panic!("Failed to spawn terrain worker: {e}"));

        info!("Terrain worker started");
        TerrainWorker {
            shared,
            handle: Some(handle),
        }
    }

    /// Queues a generation job.
    pub fn enqueue_generation(&self, task: ChunkGenerationTask) {
        lock(&self.shared.queues).generation.push_back(task);
        self.shared.wake.notify_one();
    }

    /// Queues a meshing job.
    pub fn enqueue_meshing(&self, task: ChunkMeshGenerationTask) {
        lock(&self.shared.queues).meshing.push_back(task);
        self.shared.wake.notify_one();
    }

    /// Takes every finished result, leaving empty lists behind.
    ///
    /// The lock is held only for the swap; integrate the results after this returns.
    pub fn take_finished(&self) -> FinishedJobs {
        std::mem::take(&mut *lock(&self.shared.finished))
    }

    /// `true` if no job is queued or running. Finished results may still be waiting.
    pub fn is_idle(&self) -> bool {
        let queues = lock(&self.shared.queues);
        queues.is_empty() && self.shared.in_flight.load(Ordering::Acquire) == 0
    }

    /// Current queue lengths.
    pub fn stats(&self) -> WorkerStats {
        let (queued_generation, queued_meshing, in_flight) = {
            let queues = lock(&self.shared.queues);
            (
                queues.generation.len(),
                queues.meshing.len(),
                self.shared.in_flight.load(Ordering::Acquire),
            )
        };
        let finished = lock(&self.shared.finished);
        WorkerStats {
            queued_generation,
            queued_meshing,
            in_flight,
            finished_generation: finished.generated.len(),
            finished_meshing: finished.meshed.len(),
        }
    }

    /// Stops the thread and waits for it. A running job completes first; queued jobs
    /// are dropped. Calling this twice is harmless.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        {
            // taking the lock orders the flag before the worker's next wait
            let _queues = lock(&self.shared.queues);
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Terrain worker thread panicked");
            }
            let mut queues = lock(&self.shared.queues);
            let abandoned = queues.generation.len() + queues.meshing.len();
            *queues = JobQueues::default();
            info!("Terrain worker stopped, {} queued jobs abandoned", abandoned);
        }
    }
}

impl Drop for TerrainWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs one task, turning a panic into a logged `None`.
fn run_task<T: Task>(task: T, kind: &str) -> Option<T::Output> {
    match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
        Ok(output) => output,
        Err(_) => {
            error!("Terrain worker {} job panicked, dropping it", kind);
            None
        }
    }
}

fn run_worker(shared: &WorkerShared, idle_sleep: Duration) {
    while !shared.stop.load(Ordering::Acquire) {
        let job = {
            let mut queues = lock(&shared.queues);
            match queues.pop_next() {
                Some(job) => {
                    shared.in_flight.fetch_add(1, Ordering::AcqRel);
                    job
                }
                None => {
                    if !shared.stop.load(Ordering::Acquire) {
                        let _wait = shared
                            .wake
                            .wait_timeout(queues, idle_sleep)
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                    }
                    continue;
                }
            }
        };

        match job {
            Job::Generate(task) => {
                if let Some(result) = run_task(task, "generation") {
                    lock(&shared.finished).generated.push(result);
                }
            }
            Job::Mesh(task) => {
                if let Some(result) = run_task(task, "meshing") {
                    lock(&shared.finished).meshed.push(result);
                }
            }
        }
        shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
