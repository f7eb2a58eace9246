//! # Task System Core Trait
//!
//! This module defines the unit of work the terrain worker executes.
//!
//! ## Task Lifecycle
//! 1. A task is built on the main thread, owning everything it needs
//! 2. The task is queued on the [`TerrainWorker`](super::TerrainWorker)
//! 3. The task's `process()` method runs on the worker thread
//! 4. The output, if any, is parked in the worker's finished list
//! 5. The world takes the finished list and integrates each output on the main thread
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to the worker thread
//! - `Task::Output` must be `Send` to be transferred back to the main thread
//! - Outputs carry plain data only; buffer uploads happen on the main thread

/// A unit of work that can be executed on the terrain worker.
///
/// Tasks should own their input data. A task that only holds a snapshot never races
/// with the main thread editing the chunk it came from.
pub trait Task: Send {
    /// What a finished task hands back to the main thread.
    type Output: Send;

    /// Processes the task.
    ///
    /// Returns `None` if the work turned out to be unnecessary, in which case nothing
    /// is reported back.
    fn process(self) -> Option<Self::Output>;
}
