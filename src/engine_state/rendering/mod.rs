//! Rendering side of the voxel world.
//!
//! Turns chunk blocks into per-material, per-side vertex buckets. The meshing itself
//! is pure; the task wrapper lets the terrain worker run it off the main thread.

pub mod meshing;
pub mod tasks;
