//! # Engine State Module
//!
//! The coordinator of the voxel world and everything around it.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container, driven once per frame
//! * `buffer_state` - Registry of the vertex buffers chunks upload their meshes to
//! * `config` - World tunables
//! * `rendering` - Face meshing and the background meshing task
//! * `task_management` - The terrain worker thread and its job queues
//! * `voxels` - Blocks, materials, chunks, terrain generation and the world
//!
//! ## Architecture
//!
//! `EngineState` owns the `World` and the viewer. Each frame it moves the viewer,
//! tells the world where the viewer is when it enters a new chunk, and lets the world
//! spend its frame budget on dirty chunks and finished worker jobs.

use std::{sync::Arc, time::Duration};

use cgmath::{InnerSpace, Point3, Vector3};

use crate::core::StSystem;
use buffer_state::BufferState;
use config::WorldConfig;
use voxels::{
    block::{block_side::BlockSide, material::MaterialRegistry},
    chunk::{block_position_of, chunk_origin_of},
    generation::TerrainGenerator,
    world::World,
};

pub mod buffer_state;
pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The main state container for the voxel world.
///
/// # Examples
///
/// ```
/// use std::{sync::Arc, time::Duration};
/// use cgmath::{Point3, Vector3};
/// use voxel_world::engine_state::{
///     config::WorldConfig, EngineState,
///     voxels::{block::material::MaterialRegistry, generation::FlatTerrainGenerator},
/// };
///
/// let materials = Arc::new(MaterialRegistry::default_materials());
/// let generator = Arc::new(FlatTerrainGenerator::new(8, &materials));
/// let mut engine_state = EngineState::new(
///     WorldConfig { render_distance: 32.0, ..WorldConfig::default() },
///     materials,
///     generator,
///     Point3::new(0.0, 12.0, 0.0),
///     Vector3::new(4.0, 0.0, 0.0),
/// );
///
/// engine_state.process_frame(Duration::from_millis(16));
/// assert!(engine_state.world.stats().chunks > 0);
/// ```
pub struct EngineState {
    /// The voxel world
    pub world: World,
    /// Buffer registry shared with the world's chunks
    pub buffer_state: StSystem<BufferState>,
    /// Current viewer position
    pub camera_position: Point3<f32>,
    /// Viewer movement in blocks per second
    pub camera_velocity: Vector3<f32>,
    /// Direction the viewer looks in
    pub view_direction: Vector3<f32>,
    /// Block sides that can face the viewer, for bucket culling
    pub visible_sides: Vec<BlockSide>,
    /// Chunk the viewer was in when the world was last notified
    current_player_chunk_position: Option<Point3<i32>>,
    frames: u64,
}

impl EngineState {
    /// Creates the world and places the viewer.
    pub fn new(
        config: WorldConfig,
        materials: Arc<MaterialRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        camera_position: Point3<f32>,
        camera_velocity: Vector3<f32>,
    ) -> Self {
        let buffer_state = StSystem::new(Box::new(BufferState::new()));
        let world = World::new(config, materials, generator, buffer_state.clone());
        let view_direction = Vector3::new(0.0, -0.5, -1.0).normalize();

        EngineState {
            world,
            buffer_state,
            camera_position,
            camera_velocity,
            view_direction,
            visible_sides: BlockSide::get_visible_sides(view_direction),
            current_player_chunk_position: None,
            frames: 0,
        }
    }

    /// Advances one frame.
    ///
    /// Moves the viewer, notifies the world when the viewer changes chunk and runs the
    /// world's per-frame update.
    pub fn process_frame(&mut self, delta: Duration) {
        let seconds = delta.as_secs_f32();
        self.camera_position += self.camera_velocity * seconds;
        if self.camera_velocity.magnitude2() > 0.0 {
            self.view_direction = self.camera_velocity.normalize();
            self.visible_sides = BlockSide::get_visible_sides(self.view_direction);
        }

        let chunk_position = chunk_origin_of(block_position_of(self.camera_position));
        if self.current_player_chunk_position != Some(chunk_position) {
            let render_distance = self.world.config().render_distance;
            self.world
                .notify_camera_position(self.camera_position, render_distance);
            self.current_player_chunk_position = Some(chunk_position);
        }

        self.world.update(seconds);
        self.frames += 1;
    }

    /// Number of frames processed.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mesh buckets a renderer would draw this frame: facing the viewer and within
    /// render distance.
    pub fn visible_buckets(&self) -> usize {
        let range = self.world.config().render_distance;
        let range_squared = range * range;
        self.world
            .chunks()
            .map(|chunk| {
                let chunk = chunk.get();
                if !chunk.is_generated() || chunk.is_fully_air() {
                    return 0;
                }
                chunk
                    .query_meshes()
                    .iter()
                    .filter(|mesh| self.visible_sides.contains(&mesh.side))
                    .filter(|mesh| mesh.aabb.distance_squared(self.camera_position) <= range_squared)
                    .count()
            })
            .sum()
    }

    /// Logs world and buffer statistics.
    pub fn log_stats(&self) {
        let stats = self.world.stats();
        let buffer_state = self.buffer_state.get();
        log::info!(
            "Frame {}: {} chunks ({} generated, {} dirty), {} mesh buckets ({} visible)",
            self.frames,
            stats.chunks,
            stats.generated_chunks,
            stats.dirty_chunks,
            stats.mesh_buckets,
            self.visible_buckets()
        );
        log::info!(
            "Buffers: {} live, {} bytes allocated, {} bytes used",
            buffer_state.buffer_count(),
            buffer_state.get_total_allocated_memory(),
            buffer_state.get_total_used_memory()
        );
        log::debug!("Worker: {:?}", stats.worker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::generation::FlatTerrainGenerator;

    fn engine(velocity: Vector3<f32>) -> EngineState {
        let materials = Arc::new(MaterialRegistry::default_materials());
        let generator = Arc::new(FlatTerrainGenerator::new(8, &materials));
        EngineState::new(
            WorldConfig {
                render_distance: 20.0,
                ..WorldConfig::default()
            },
            materials,
            generator,
            Point3::new(16.0, 12.0, 16.0),
            velocity,
        )
    }

    #[test]
    fn first_frame_requests_nearby_columns() {
        let mut engine_state = engine(Vector3::new(0.0, 0.0, 0.0));
        engine_state.process_frame(Duration::from_millis(16));

        // the center column and its four edge neighbors are within 20 blocks, the
        // diagonal ones are not
        let columns: std::collections::HashSet<_> = engine_state
            .world
            .chunks()
            .map(|chunk| {
                let position = chunk.get().position;
                (position.x, position.z)
            })
            .collect();
        assert_eq!(columns.len(), 5);
        assert!(columns.contains(&(-32, 0)));
        assert!(!columns.contains(&(-32, -32)));
        assert_eq!(engine_state.frames(), 1);
    }

    #[test]
    fn moving_viewer_requests_new_columns() {
        let mut engine_state = engine(Vector3::new(32.0, 0.0, 0.0));
        engine_state.process_frame(Duration::from_millis(0));
        let before = engine_state.world.stats().chunks;
        engine_state.process_frame(Duration::from_secs(1));
        assert!(engine_state.world.stats().chunks > before);
        assert!(engine_state.visible_sides.contains(&BlockSide::LEFT));
        assert!(!engine_state.visible_sides.contains(&BlockSide::RIGHT));
    }
}
