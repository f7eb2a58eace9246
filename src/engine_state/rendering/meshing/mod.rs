//! Mesh generation for voxel rendering.
//!
//! Chunks are meshed face by face. Every visible face becomes two triangles carrying
//! a packed descriptor with its side, ambient occlusion and edge flags, and faces are
//! grouped into buckets by material and side so a renderer can cull whole buckets
//! that point away from the camera.
//!
//! # Architecture
//! - [`generate_terrain_meshes`]: Builds buckets from a padded 34³ block neighborhood
//! - [`TerrainMeshData`]: A bucket fresh out of the mesher
//! - [`TerrainMesh`]: A bucket after its data has been uploaded to the buffer registry
//! - [`Face`] / [`VertexDescriptor`]: Per-face occlusion and the vertex packing format

pub mod mesh;

pub use mesh::*;
