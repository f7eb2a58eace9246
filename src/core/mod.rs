//! # Core Module
//!
//! Shared-ownership containers used throughout the voxel world.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking.
//!   Chunks live in one so a meshing job on the terrain worker keeps its chunk alive
//!   even after the world has dropped it.
//! - `StSystem`: Single-threaded reference-counted system with interior mutability,
//!   used for main-thread-only state such as the buffer registry.
//!
//! ## Usage
//! ```rust
//! use voxel_world::core::{MtResource, StSystem};
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let system = StSystem::new(Box::new(42u32));
//! assert_eq!(**system.get(), 42);
//! ```

pub mod mt_resource;
pub mod st_system;

pub use mt_resource::MtResource;
pub use st_system::StSystem;
