//! Task for generating mesh data for chunks in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask` which runs the mesher on a
//! padded neighborhood snapshot taken on the main thread. Each task carries the mesh
//! version its chunk had when the snapshot was taken; a task whose chunk has since
//! been re-requested does no work and reports nothing.

use cgmath::Point3;

use crate::{
    core::MtResource,
    engine_state::{
        rendering::meshing::{generate_terrain_meshes, TerrainMeshData},
        task_management::task::Task,
        voxels::{block::Block, chunk::Chunk},
    },
};

/// A task that generates mesh data for a chunk in a background thread.
pub struct ChunkMeshGenerationTask {
    /// The chunk the mesh is for
    chunk: MtResource<Chunk>,
    /// Deep copy of the chunk and its one-block halo
    neighborhood: Vec<Block>,
    /// World origin of the chunk
    origin: Point3<i32>,
    /// Mesh version of the chunk when the snapshot was taken
    version: u64,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `chunk` - The chunk that needs a mesh
    /// * `neighborhood` - Padded snapshot of the chunk and its halo
    /// * `origin` - World origin of the chunk
    /// * `version` - The chunk's mesh version after the request was stamped
    pub fn new(
        chunk: MtResource<Chunk>,
        neighborhood: Vec<Block>,
        origin: Point3<i32>,
        version: u64,
    ) -> Self {
        ChunkMeshGenerationTask {
            chunk,
            neighborhood,
            origin,
            version,
        }
    }

    /// The version this task was stamped with.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn is_stale(&self) -> bool {
        self.chunk.get().mesh_version() != self.version
    }
}

impl Task for ChunkMeshGenerationTask {
    type Output = ChunkMeshGenerationTaskResult;

    fn process(self) -> Option<ChunkMeshGenerationTaskResult> {
        if self.is_stale() {
            log::debug!(
                "Skipping stale mesh job for chunk {:?} (version {})",
                self.origin,
                self.version
            );
            return None;
        }

        let meshes = generate_terrain_meshes(&self.neighborhood, self.origin);
        Some(ChunkMeshGenerationTaskResult {
            chunk: self.chunk,
            version: self.version,
            meshes,
        })
    }
}

/// The result of a chunk mesh generation task.
pub struct ChunkMeshGenerationTaskResult {
    /// The chunk the mesh belongs to
    pub chunk: MtResource<Chunk>,
    /// The version the mesh was built for
    pub version: u64,
    /// One entry per visible (material, side) bucket
    pub meshes: Vec<TerrainMeshData>,
}

impl ChunkMeshGenerationTaskResult {
    /// `true` if the chunk has not requested a newer mesh since this one was built.
    pub fn is_current(&self) -> bool {
        self.chunk.get().mesh_version() == self.version
    }
}
