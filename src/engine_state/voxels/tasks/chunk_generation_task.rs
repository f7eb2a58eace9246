//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which computes the block data of a
//! new chunk on the terrain worker. The task never writes to the chunk itself: the
//! blocks travel back in the result and the world installs them on the main thread.

use std::sync::Arc;

use cgmath::Point3;

use crate::{
    core::MtResource,
    engine_state::{
        task_management::task::Task,
        voxels::{block::Block, chunk::Chunk, generation::TerrainGenerator},
    },
};

/// A task that generates the blocks of one chunk.
pub struct ChunkGenerationTask {
    /// The chunk the blocks are for
    chunk: MtResource<Chunk>,
    /// World origin of the chunk, copied so the task never has to lock it
    origin: Point3<i32>,
    /// Shared, thread-safe terrain generator
    generator: Arc<dyn TerrainGenerator>,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    pub fn new(chunk: MtResource<Chunk>, generator: Arc<dyn TerrainGenerator>) -> Self {
        let origin = chunk.get().position;
        ChunkGenerationTask {
            chunk,
            origin,
            generator,
        }
    }

    /// Origin of the chunk being generated.
    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }
}

impl Task for ChunkGenerationTask {
    type Output = ChunkGenerationTaskResult;

    fn process(self) -> Option<ChunkGenerationTaskResult> {
        let blocks = self.generator.generate(self.origin);
        Some(ChunkGenerationTaskResult {
            chunk: self.chunk,
            blocks,
        })
    }
}

/// The result of a chunk generation task.
pub struct ChunkGenerationTaskResult {
    /// The chunk the blocks belong to
    pub chunk: MtResource<Chunk>,
    /// The generated blocks in chunk order
    pub blocks: Vec<Block>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        block::material::MaterialRegistry, chunk::CHUNK_SIZE, generation::FlatTerrainGenerator,
    };

    #[test]
    fn generation_does_not_touch_the_chunk() {
        let materials = MaterialRegistry::default_materials();
        let generator = Arc::new(FlatTerrainGenerator::new(8, &materials));
        let chunk = MtResource::new(Chunk::new(Point3::new(0, 0, 0)));

        let task = ChunkGenerationTask::new(chunk.clone(), generator);
        let result = task.process().unwrap();

        assert_eq!(result.blocks.len(), CHUNK_SIZE as usize);
        assert!(result.chunk.ptr_eq(&chunk));
        assert!(!chunk.get().is_generated());
        assert!(chunk.get().blocks().iter().all(Block::is_invalid));
    }
}
