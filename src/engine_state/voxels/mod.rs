//! # Voxel World
//!
//! This module contains the voxel world itself: how blocks are represented, how they
//! are grouped into chunks, where their data comes from, and how the world keeps the
//! chunks around the viewer generated and meshed.
//!
//! ## Architecture
//!
//! * **Block**: A single signed byte, plus the materials and face directions that give it meaning
//! * **Chunk**: A 32³ cube of blocks with its derived state (bounds, flags, meshes)
//! * **Generation**: Procedural terrain, run on the terrain worker
//! * **World**: Owns the chunks, streams them around the viewer and integrates worker results
//! * **Tasks**: The generation job handed to the terrain worker
//!
//! ## Data Flow
//!
//! 1. The viewer moves and the world creates missing chunk columns around it
//! 2. Each new chunk is generated on the worker and installed on the main thread
//! 3. Installing blocks (or editing them) marks chunks dirty
//! 4. Dirty chunks recompute their derived state within a per-frame budget and enqueue a mesh job
//! 5. Finished meshes replace the chunk's buffers, unless a newer edit made them stale
//!
//! ## Thread Safety
//!
//! Chunks are shared with the worker through [`MtResource`](crate::core::MtResource).
//! Only the main thread writes to a chunk; worker jobs read it and return their
//! results by value.

pub mod block;
pub mod bounds;
pub mod chunk;
pub mod generation;
pub mod tasks;
pub mod world;
