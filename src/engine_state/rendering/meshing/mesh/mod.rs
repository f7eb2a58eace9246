//! Mesh generation for voxel terrain.
//!
//! This module converts a padded block neighborhood into per-(material, side) face
//! buckets with baked ambient occlusion and edge flags.
//!
//! # Architecture
//! - [`generate_terrain_meshes`]: the pure mesher, safe to call from the terrain worker
//! - [`Face`]: a single visible block face with its occlusion and edge data
//! - [`TerrainMeshData`]: worker output, plain vertex data per bucket
//! - [`TerrainMesh`]: an uploaded bucket owned by a chunk
//!
//! # Usage
//! ```
//! use voxel_world::engine_state::{
//!     rendering::meshing::generate_terrain_meshes,
//!     voxels::{block::Block, chunk::{padded_index, CHUNK_SIZE_WRAPPED}},
//! };
//! use cgmath::Point3;
//!
//! let mut padded = vec![Block::AIR; CHUNK_SIZE_WRAPPED];
//! padded[padded_index(1, 1, 1)] = Block::new(1);
//! let meshes = generate_terrain_meshes(&padded, Point3::new(0, 0, 0));
//! assert_eq!(meshes.len(), 6);
//! ```

mod face;
mod mesh;
mod mesher;

pub use face::{vertex_ao, Face, VertexDescriptor, VERTICES_PER_FACE};
pub use mesh::*;
pub use mesher::generate_terrain_meshes;
