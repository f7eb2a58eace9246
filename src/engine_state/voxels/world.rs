//! # World Module
//!
//! This module provides the `World` struct which owns every live chunk and coordinates
//! their generation, CPU updates and meshing.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach: chunks exist only where the viewer has
//! been or where blocks were edited. Chunks are keyed by their origin and kept in
//! `MtResource`s, so jobs on the terrain worker can hold on to a chunk even after the
//! world has dropped it.
//!
//! ## Data Flow
//!
//! 1. `notify_camera_position` walks a square spiral of columns around the viewer and
//!    creates the missing ones, each with a generation job
//! 2. Finished generation installs the blocks, dirties the 26 neighbors and grows the
//!    column up or down as the terrain requires
//! 3. `update` recomputes dirty chunks within a per-frame budget and sends each one to
//!    the worker for meshing, with a padded snapshot and a fresh mesh version
//! 4. Finished meshes whose version is still current are uploaded by their chunk
//!
//! ## Thread Safety
//!
//! The world lives on the main thread. Only plain data and chunk handles cross to the
//! worker; the worker never writes to a chunk.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};
use log::{debug, error, info, warn};
use web_time::Instant;

use crate::{
    core::{MtResource, StSystem},
    engine_state::{
        buffer_state::BufferState,
        config::WorldConfig,
        rendering::tasks::chunk_mesh_generation_task::{
            ChunkMeshGenerationTask, ChunkMeshGenerationTaskResult,
        },
        task_management::{TerrainWorker, WorkerStats},
    },
};

use super::{
    block::{material::MaterialRegistry, Block},
    chunk::{
        block_position_of, chunk_origin_of,
        neighborhood::{copy_into_neighborhood, empty_neighborhood, neighborhood_offsets},
        Chunk, ChunkNeighborhood, CHUNK_DIMENSION,
    },
    generation::TerrainGenerator,
    tasks::chunk_generation_task::ChunkGenerationTask,
};

/// The result of a successful ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Where the ray entered the hit block
    pub position: Point3<f32>,
    /// The block that was hit
    pub block: Block,
    /// Grid coordinates of the hit block
    pub block_pos: Point3<i32>,
    /// Outward normal of the face the ray entered through. Zero if the ray started
    /// inside the block.
    pub normal: Vector3<i32>,
}

/// Counters describing the world, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Chunks in the chunk table
    pub chunks: usize,
    /// Chunks holding real block data
    pub generated_chunks: usize,
    /// Chunks waiting for a CPU update
    pub dirty_chunks: usize,
    /// Uploaded mesh buckets over all chunks
    pub mesh_buckets: usize,
    /// Terrain worker queues
    pub worker: WorkerStats,
}

/// Represents a voxel world composed of multiple chunks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cgmath::Point3;
/// use voxel_world::core::StSystem;
/// use voxel_world::engine_state::{
///     buffer_state::BufferState,
///     config::WorldConfig,
///     voxels::{block::{material::MaterialRegistry, Block}, generation::FlatTerrainGenerator, world::World},
/// };
///
/// let materials = Arc::new(MaterialRegistry::default_materials());
/// let generator = Arc::new(FlatTerrainGenerator::new(4, &materials));
/// let mut world = World::new(
///     WorldConfig::default(),
///     materials,
///     generator,
///     StSystem::new(Box::new(BufferState::new())),
/// );
///
/// world.set_block(Point3::new(1, 2, 3), Block::new(1));
/// assert_eq!(world.query_block(Point3::new(1, 2, 3)), Block::new(1));
/// assert!(world.query_block(Point3::new(100, 2, 3)).is_invalid());
/// ```
pub struct World {
    config: WorldConfig,
    materials: Arc<MaterialRegistry>,
    generator: Arc<dyn TerrainGenerator>,
    /// A mapping from chunk origins to chunks.
    chunks: HashMap<Point3<i32>, MtResource<Chunk>>,
    /// Chunks waiting for a CPU update and a mesh request, oldest first.
    dirty_chunks: VecDeque<MtResource<Chunk>>,
    buffer_state: StSystem<BufferState>,
    worker: TerrainWorker,
    elapsed_time: f64,
}

/// Column offsets, in chunks, of ring `r` around the center column.
///
/// The ring is walked as a square: top edge, right edge, bottom edge, left edge.
fn square_ring(r: i32) -> Vec<(i32, i32)> {
    if r == 0 {
        return vec![(0, 0)];
    }
    let mut ring = Vec::with_capacity(8 * r as usize);
    ring.extend((-r..r).map(|i| (i, -r)));
    ring.extend((-r..r).map(|i| (r, i)));
    ring.extend((-r + 1..=r).rev().map(|i| (i, r)));
    ring.extend((-r + 1..=r).rev().map(|i| (-r, i)));
    ring
}

/// Horizontal distance from `(x, z)` to the nearest point of the column whose origin
/// is `(ox, oz)`.
fn column_distance(x: f32, z: f32, ox: i32, oz: i32) -> f32 {
    let size = CHUNK_DIMENSION as f32;
    let (ox, oz) = (ox as f32, oz as f32);
    let dx = (ox - x).max(0.0).max(x - (ox + size));
    let dz = (oz - z).max(0.0).max(z - (oz + size));
    (dx * dx + dz * dz).sqrt()
}

impl World {
    /// Creates an empty world and starts its terrain worker.
    pub fn new(
        config: WorldConfig,
        materials: Arc<MaterialRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        buffer_state: StSystem<BufferState>,
    ) -> Self {
        let worker = TerrainWorker::new(config.worker_idle_sleep());
        World {
            config,
            materials,
            generator,
            chunks: HashMap::new(),
            dirty_chunks: VecDeque::new(),
            buffer_state,
            worker,
            elapsed_time: 0.0,
        }
    }

    /// The world's configuration.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Seconds passed to `update` so far.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// The origin of the chunk containing `pos`.
    pub fn chunk_pos(pos: Point3<i32>) -> Point3<i32> {
        chunk_origin_of(pos)
    }

    /// Retrieves the chunk with the given origin.
    pub fn get_chunk_at(&self, origin: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.chunks.get(&origin).cloned()
    }

    /// Every live chunk, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &MtResource<Chunk>> {
        self.chunks.values()
    }

    fn is_live(&self, chunk: &MtResource<Chunk>, origin: Point3<i32>) -> bool {
        self.chunks
            .get(&origin)
            .is_some_and(|live| live.ptr_eq(chunk))
    }

    /// Makes sure the chunk containing `pos` exists.
    ///
    /// A new chunk starts out invalid and gets a generation job on the terrain worker.
    pub fn ensure_chunk_at(&mut self, pos: Point3<i32>) -> MtResource<Chunk> {
        let origin = chunk_origin_of(pos);
        if let Some(chunk) = self.chunks.get(&origin) {
            return chunk.clone();
        }

        let chunk = MtResource::new(Chunk::new(origin));
        self.chunks.insert(origin, chunk.clone());
        self.worker
            .enqueue_generation(ChunkGenerationTask::new(chunk.clone(), self.generator.clone()));
        chunk
    }

    /// Creates every column within `render_distance` of the viewer.
    ///
    /// Columns are visited in square rings of growing radius at the viewer's chunk
    /// height; the rest of each column grows through generation cascading.
    pub fn notify_camera_position(&mut self, pos: Point3<f32>, render_distance: f32) {
        let center = chunk_origin_of(block_position_of(pos));
        let size = CHUNK_DIMENSION as f32;
        let max_ring = (render_distance / size).ceil() as i32 + 1;

        for r in 0..=max_ring {
            // every column of ring r is at least r - 1 columns away
            if (r - 1).max(0) as f32 * size > render_distance {
                break;
            }
            for (dx, dz) in square_ring(r) {
                let ox = center.x + dx * CHUNK_DIMENSION;
                let oz = center.z + dz * CHUNK_DIMENSION;
                if column_distance(pos.x, pos.z, ox, oz) <= render_distance {
                    self.ensure_chunk_at(Point3::new(ox, center.y, oz));
                }
            }
        }
    }

    /// Marks a chunk dirty and queues it on the first transition.
    fn mark_chunk_dirty(&mut self, chunk: &MtResource<Chunk>) {
        if chunk.get_mut().mark_dirty() {
            self.dirty_chunks.push_back(chunk.clone());
        }
    }

    /// Installs generated blocks into their chunk.
    ///
    /// Marks the chunk and its existing neighbors dirty, recomputes the chunk's flags
    /// right away and grows the column: upward unless the chunk is all air, downward unless it is
    /// all solid. Results for chunks that are no longer in the world are dropped.
    ///
    /// # Panics
    /// Panics if the column has grown beyond `max_vertical_chunks` chunks from zero.
    pub fn notify_chunk_generated(&mut self, chunk: MtResource<Chunk>, blocks: Vec<Block>) {
        let origin = chunk.get().position;
        if !self.is_live(&chunk, origin) {
            debug!("Dropping generated blocks for detached chunk {:?}", origin);
            return;
        }

        {
            let mut guard = chunk.get_mut();
            if guard.is_generated() {
                warn!("Chunk {:?} was already generated, keeping its blocks", origin);
                return;
            }
            if !guard.set_blocks(blocks) {
                return;
            }
            guard.set_generated();
        }

        self.mark_chunk_dirty(&chunk);
        let neighbors: Vec<_> = neighborhood_offsets()
            .filter(|offset| *offset != Vector3::new(0, 0, 0))
            .filter_map(|offset| self.chunks.get(&(origin + offset * CHUNK_DIMENSION)).cloned())
            .collect();
        for neighbor in &neighbors {
            self.mark_chunk_dirty(neighbor);
        }

        // the chunk stays queued until the next budgeted update meshes it
        chunk.get_mut().recompute(&*self);
        let (fully_air, fully_solid) = {
            let guard = chunk.get();
            (guard.is_fully_air(), guard.is_fully_solid())
        };

        let limit = self.config.max_vertical_chunks.saturating_mul(CHUNK_DIMENSION);
        if origin.y.abs() > limit {
            error!(
                "Runaway vertical generation at chunk {:?} (fully air: {}, fully solid: {}, {} chunks live)",
                origin,
                fully_air,
                fully_solid,
                self.chunks.len()
            );
            panic!("chunk column exceeded {} blocks at {:?}", limit, origin);
        }

        if !fully_air {
            self.ensure_chunk_at(origin + Vector3::new(0, CHUNK_DIMENSION, 0));
        }
        if !fully_solid {
            self.ensure_chunk_at(origin - Vector3::new(0, CHUNK_DIMENSION, 0));
        }
    }

    /// Installs a finished mesh if it is still the newest one requested for its chunk.
    ///
    /// Returns `true` if the mesh was applied.
    pub fn notify_chunk_meshed(&mut self, result: ChunkMeshGenerationTaskResult) -> bool {
        let origin = result.chunk.get().position;
        if !result.is_current() {
            debug!(
                "Discarding stale mesh for chunk {:?} (version {})",
                origin, result.version
            );
            return false;
        }
        if !self.is_live(&result.chunk, origin) {
            debug!("Discarding mesh for detached chunk {:?}", origin);
            return false;
        }

        let mut buffer_state = self.buffer_state.get_mut();
        result
            .chunk
            .get_mut()
            .notify_mesh_data(result.meshes, &mut buffer_state);
        true
    }

    /// Snapshots the chunk and its halo and queues a meshing job.
    ///
    /// Halo cells of neighbors that do not exist stay invalid, so faces toward them are
    /// kept. The chunk's mesh version is bumped and stamped on the job.
    pub fn trigger_mesh_update(&mut self, chunk: &MtResource<Chunk>) {
        let origin = chunk.get().position;
        let mut padded = empty_neighborhood();

        for offset in neighborhood_offsets() {
            if offset == Vector3::new(0, 0, 0) {
                copy_into_neighborhood(&mut padded, origin, &chunk.get());
            } else if let Some(neighbor) = self.chunks.get(&(origin + offset * CHUNK_DIMENSION)) {
                copy_into_neighborhood(&mut padded, origin, &neighbor.get());
            }
        }

        let version = chunk.get_mut().bump_mesh_version();
        self.worker
            .enqueue_meshing(ChunkMeshGenerationTask::new(chunk.clone(), padded, origin, version));
    }

    /// Per-frame work.
    ///
    /// Updates dirty chunks and requests their meshes until the frame budget is used
    /// up (at least one chunk per call), then integrates everything the worker has
    /// finished.
    pub fn update(&mut self, elapsed_seconds: f32) {
        self.elapsed_time += f64::from(elapsed_seconds);

        let budget = self.config.mesh_update_budget();
        let start = Instant::now();
        let mut processed = 0;
        while let Some(chunk) = self.dirty_chunks.pop_front() {
            chunk.get_mut().update(&*self);
            if chunk.get().is_generated() {
                self.trigger_mesh_update(&chunk);
            }
            processed += 1;
            if start.elapsed() >= budget {
                break;
            }
        }
        if !self.dirty_chunks.is_empty() {
            debug!(
                "Updated {} dirty chunks, {} left for the next frame",
                processed,
                self.dirty_chunks.len()
            );
        }

        let finished = self.worker.take_finished();
        for result in finished.generated {
            self.notify_chunk_generated(result.chunk, result.blocks);
        }
        for result in finished.meshed {
            self.notify_chunk_meshed(result);
        }
    }

    /// The block at `pos`, or [`Block::INVALID`] if its chunk does not exist.
    pub fn query_block(&self, pos: Point3<i32>) -> Block {
        match self.chunks.get(&chunk_origin_of(pos)) {
            Some(chunk) => {
                let chunk = chunk.get();
                chunk.block(Point3::from_vec(pos - chunk.position))
            }
            None => Block::INVALID,
        }
    }

    /// Runs `f` on the block at `pos`.
    ///
    /// A missing chunk is created on the spot, filled with air and marked generated,
    /// without going through the terrain generator. Call [`World::mark_dirty`]
    /// afterwards so the change shows up in the meshes.
    pub fn query_block_mut<R>(&mut self, pos: Point3<i32>, f: impl FnOnce(&mut Block) -> R) -> R {
        let origin = chunk_origin_of(pos);
        let chunk = self
            .chunks
            .entry(origin)
            .or_insert_with(|| {
                let mut chunk = Chunk::filled(origin, Block::AIR);
                chunk.set_generated();
                MtResource::new(chunk)
            })
            .clone();

        let mut guard = chunk.get_mut();
        f(guard.block_mut(Point3::from_vec(pos - origin)))
    }

    /// Sets one block and marks every chunk whose halo sees it dirty.
    pub fn set_block(&mut self, pos: Point3<i32>, block: Block) {
        self.query_block_mut(pos, |b| *b = block);
        self.mark_dirty(pos, 1);
    }

    /// Marks dirty every existing chunk that holds a block within `radius` of `pos` on
    /// each axis.
    pub fn mark_dirty(&mut self, pos: Point3<i32>, radius: i32) {
        let radius = radius.max(0);
        let lo = chunk_origin_of(pos - Vector3::new(radius, radius, radius));
        let hi = chunk_origin_of(pos + Vector3::new(radius, radius, radius));

        let mut z = lo.z;
        while z <= hi.z {
            let mut y = lo.y;
            while y <= hi.y {
                let mut x = lo.x;
                while x <= hi.x {
                    if let Some(chunk) = self.chunks.get(&Point3::new(x, y, z)).cloned() {
                        self.mark_chunk_dirty(&chunk);
                    }
                    x += CHUNK_DIMENSION;
                }
                y += CHUNK_DIMENSION;
            }
            z += CHUNK_DIMENSION;
        }
    }

    /// Walks the block grid from `origin` along `direction` and returns the first
    /// renderable block within `max_range`.
    ///
    /// Blocks of chunks that do not exist are skipped like air. A zero direction or a
    /// range that is not finite yields `None`.
    pub fn ray_cast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_range: f32,
    ) -> Option<RayHit> {
        if direction.magnitude2() == 0.0 || !direction.magnitude2().is_finite() {
            return None;
        }
        if !max_range.is_finite() {
            warn!("Ray cast with unbounded range {} ignored", max_range);
            return None;
        }
        let dir = direction.normalize();

        let mut cell = block_position_of(origin);
        let step = Vector3::new(
            dir.x.signum() as i32,
            dir.y.signum() as i32,
            dir.z.signum() as i32,
        );
        let boundary = |p: f32, c: i32, d: f32| -> f32 {
            if d > 0.0 {
                (c as f32 + 1.0 - p) / d
            } else if d < 0.0 {
                (c as f32 - p) / d
            } else {
                f32::INFINITY
            }
        };
        let mut t_max = [
            boundary(origin.x, cell.x, dir.x),
            boundary(origin.y, cell.y, dir.y),
            boundary(origin.z, cell.z, dir.z),
        ];
        let t_delta = [
            (1.0 / dir.x).abs(),
            (1.0 / dir.y).abs(),
            (1.0 / dir.z).abs(),
        ];

        let mut t = 0.0;
        let mut normal = Vector3::new(0, 0, 0);
        let mut cached: Option<MtResource<Chunk>> = None;

        loop {
            let chunk_origin = chunk_origin_of(cell);
            let cache_hit = cached
                .as_ref()
                .is_some_and(|chunk| chunk.get().position == chunk_origin);
            if !cache_hit {
                cached = self.chunks.get(&chunk_origin).cloned();
            }

            if let Some(chunk) = &cached {
                let block = chunk.get().block(Point3::from_vec(cell - chunk_origin));
                if block.is_renderable() {
                    return Some(RayHit {
                        position: origin + dir * t,
                        block,
                        block_pos: cell,
                        normal,
                    });
                }
            }

            // step along the axis whose boundary is nearest
            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            t = t_max[axis];
            if t.is_nan() || t > max_range {
                return None;
            }
            t_max[axis] += t_delta[axis];
            cell[axis] += step[axis];
            normal = Vector3::new(0, 0, 0);
            normal[axis] = -step[axis];
        }
    }

    /// Removes every chunk and releases its buffers. Jobs still on the worker finish
    /// against their detached chunks and their results are dropped.
    pub fn clear_chunks(&mut self) {
        {
            let mut buffer_state = self.buffer_state.get_mut();
            for chunk in self.chunks.values() {
                chunk.get_mut().release_meshes(&mut buffer_state);
            }
        }
        info!("Cleared {} chunks", self.chunks.len());
        self.chunks.clear();
        self.dirty_chunks.clear();
    }

    /// `true` when nothing is queued, running, finished or dirty.
    pub fn is_idle(&self) -> bool {
        if !self.dirty_chunks.is_empty() || !self.worker.is_idle() {
            return false;
        }
        let stats = self.worker.stats();
        stats.finished_generation == 0 && stats.finished_meshing == 0
    }

    /// Current counters.
    pub fn stats(&self) -> WorldStats {
        let mut stats = WorldStats {
            chunks: self.chunks.len(),
            dirty_chunks: self.dirty_chunks.len(),
            worker: self.worker.stats(),
            ..WorldStats::default()
        };
        for chunk in self.chunks.values() {
            let chunk = chunk.get();
            if chunk.is_generated() {
                stats.generated_chunks += 1;
            }
            stats.mesh_buckets += chunk.query_meshes().len();
        }
        stats
    }

    /// The material registry.
    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// The shared buffer registry.
    pub fn buffer_state(&self) -> &StSystem<BufferState> {
        &self.buffer_state
    }
}

impl ChunkNeighborhood for World {
    fn query_block(&self, world_pos: Point3<i32>) -> Block {
        World::query_block(self, world_pos)
    }

    fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine_state::{
        rendering::meshing::TerrainMeshData,
        voxels::{block::block_side::BlockSide, generation::FlatTerrainGenerator},
    };

    fn world_with(config: WorldConfig, height: i32) -> World {
        let materials = Arc::new(MaterialRegistry::default_materials());
        let generator = Arc::new(FlatTerrainGenerator::new(height, &materials));
        World::new(
            config,
            materials,
            generator,
            StSystem::new(Box::new(BufferState::new())),
        )
    }

    fn world(height: i32) -> World {
        world_with(WorldConfig::default(), height)
    }

    fn drive(world: &mut World) {
        let deadline = std::time::Instant::now() + Duration::from_secs(20);
        loop {
            world.update(0.016);
            if world.is_idle() {
                return;
            }
            assert!(std::time::Instant::now() < deadline, "world did not settle");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn chunk_pos_floors_negative_coordinates() {
        assert_eq!(World::chunk_pos(Point3::new(-1, -32, 63)), Point3::new(-32, -32, 32));
        assert_eq!(World::chunk_pos(Point3::new(0, 31, -33)), Point3::new(0, 0, -64));
    }

    #[test]
    fn square_rings_cover_each_column_once() {
        let mut seen = std::collections::HashSet::new();
        for r in 0..4 {
            let ring = square_ring(r);
            assert_eq!(ring.len(), if r == 0 { 1 } else { 8 * r as usize });
            for (x, z) in ring {
                assert_eq!(x.abs().max(z.abs()), r);
                assert!(seen.insert((x, z)));
            }
        }
        assert_eq!(seen.len(), 49);
    }

    #[test]
    fn generated_column_settles() {
        let mut world = world(10);
        world.ensure_chunk_at(Point3::new(5, 5, 5));
        drive(&mut world);

        let chunk = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();
        let chunk = chunk.get();
        assert!(chunk.is_generated());
        assert_eq!(chunk.bounding_box().min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(chunk.bounding_box().max, Point3::new(32.0, 10.0, 32.0));
        assert!(!chunk.query_meshes().is_empty());

        // the column grew one chunk up (all air) and one down (all stone)
        assert!(world.get_chunk_at(Point3::new(0, 32, 0)).unwrap().get().is_fully_air());
        assert!(world.get_chunk_at(Point3::new(0, -32, 0)).unwrap().get().is_fully_solid());
        assert_eq!(world.stats().chunks, 3);
        assert_eq!(world.stats().generated_chunks, 3);
    }

    #[test]
    fn every_requested_column_is_generated() {
        let mut world = world(0);
        for i in 0..5 {
            world.ensure_chunk_at(Point3::new(i * 64, 0, 0));
        }
        drive(&mut world);

        // each column is one air chunk plus the stone chunk below it
        let stats = world.stats();
        assert_eq!(stats.generated_chunks, 10);
        assert_eq!(stats.chunks, 10);
        assert_eq!(stats.worker, WorkerStats::default());
        assert!(world.worker.take_finished().is_empty());
    }

    #[test]
    fn camera_creates_columns_within_range() {
        let mut world = world(0);
        world.notify_camera_position(Point3::new(16.0, 5.0, 16.0), 40.0);
        let origins: Vec<_> = world.chunks().map(|c| c.get().position).collect();

        assert!(origins.contains(&Point3::new(0, 0, 0)));
        assert!(origins.contains(&Point3::new(32, 0, 32)));
        assert!(origins.contains(&Point3::new(-32, 0, -32)));
        // nearest point of this column is 48 blocks away
        assert!(!origins.contains(&Point3::new(64, 0, 0)));
        assert!(origins.iter().all(|o| o.y == 0));
        assert_eq!(origins.len(), 9);
    }

    #[test]
    fn ray_hits_near_face_of_single_block() {
        let mut world = world(0);
        world.set_block(Point3::new(5, 5, 5), Block::new(3));

        let hit = world
            .ray_cast(Point3::new(5.0, 5.0, -10.0), Vector3::new(0.0, 0.0, 1.0), 20.0)
            .unwrap();
        assert_eq!(hit.block_pos, Point3::new(5, 5, 5));
        assert_eq!(hit.block, Block::new(3));
        assert_eq!(hit.normal, Vector3::new(0, 0, -1));
        assert_eq!(hit.position, Point3::new(5.0, 5.0, 5.0));

        let exact = world.ray_cast(Point3::new(5.0, 5.0, -10.0), Vector3::new(0.0, 0.0, 1.0), 15.0);
        assert!(exact.is_some());
        let short = world.ray_cast(Point3::new(5.0, 5.0, -10.0), Vector3::new(0.0, 0.0, 1.0), 14.9);
        assert!(short.is_none());
    }

    #[test]
    fn ray_from_inside_a_block_has_no_normal() {
        let mut world = world(0);
        world.set_block(Point3::new(-3, 0, 0), Block::new(1));

        let hit = world
            .ray_cast(Point3::new(-2.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0), 4.0)
            .unwrap();
        assert_eq!(hit.normal, Vector3::new(0, 0, 0));
        assert_eq!(hit.block_pos, Point3::new(-3, 0, 0));
        assert_eq!(hit.position, Point3::new(-2.5, 0.5, 0.5));

        // straight past it
        let miss = world.ray_cast(Point3::new(-1.5, 0.5, 0.5), Vector3::new(0.0, 1.0, 0.0), 10.0);
        assert!(miss.is_none());
        assert!(world.ray_cast(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn unbounded_ray_ranges_are_rejected() {
        let mut world = world(0);
        world.set_block(Point3::new(0, 0, 3), Block::new(1));
        let dir = Vector3::new(0.0, 0.0, 1.0);

        assert!(world.ray_cast(Point3::new(0.5, 0.5, 0.5), dir, f32::INFINITY).is_none());
        assert!(world.ray_cast(Point3::new(0.5, 0.5, 0.5), dir, f32::NAN).is_none());
        assert!(world.ray_cast(Point3::new(0.5, 0.5, 0.5), dir, 8.0).is_some());
    }

    #[test]
    fn adjacent_generations_queue_each_chunk_once() {
        let mut world = world(10);
        for x in -1..=1 {
            for z in -1..=1 {
                world.ensure_chunk_at(Point3::new(x * 32, 0, z * 32));
            }
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(20);
        while world.worker.stats().finished_generation < 9 {
            assert!(std::time::Instant::now() < deadline, "generation did not finish");
            std::thread::sleep(Duration::from_millis(1));
        }

        // every result lands in this one update and each marks its neighbors dirty
        world.update(0.0);

        let stats = world.stats();
        assert_eq!(stats.chunks, 27);
        assert!(stats.dirty_chunks <= stats.chunks);
        let queued: std::collections::HashSet<_> =
            world.dirty_chunks.iter().map(|c| c.get().position).collect();
        assert_eq!(queued.len(), world.dirty_chunks.len());
        for x in -1..=1 {
            for z in -1..=1 {
                assert!(queued.contains(&Point3::new(x * 32, 0, z * 32)));
            }
        }
        assert!(world.dirty_chunks.iter().all(|c| c.get().is_dirty()));

        // flags were computed at install time even though the chunks are still queued
        let center = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();
        assert_eq!(center.get().bounding_box().max.y, 10.0);
    }

    #[test]
    fn update_stops_at_the_frame_budget() {
        let config = WorldConfig {
            mesh_update_budget_ms: 0.0,
            ..WorldConfig::default()
        };
        let mut world = world_with(config, 0);
        let edits: Vec<_> = (0..4).map(|i| Point3::new(i * 100, 0, 0)).collect();
        for &pos in &edits {
            world.set_block(pos, Block::new(1));
        }
        assert_eq!(world.stats().dirty_chunks, 4);

        world.update(0.0);
        assert_eq!(world.stats().dirty_chunks, 3);
        let versions: Vec<_> = edits
            .iter()
            .map(|&pos| world.get_chunk_at(World::chunk_pos(pos)).unwrap().get().mesh_version())
            .collect();
        assert_eq!(versions, vec![1, 0, 0, 0]);

        world.update(0.0);
        assert_eq!(world.stats().dirty_chunks, 2);
    }

    #[test]
    fn block_edits_create_air_chunks_and_dirty_neighbors() {
        let mut world = world(0);
        world.set_block(Point3::new(0, 0, 0), Block::new(2));
        let chunk = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();
        assert!(chunk.get().is_generated());
        assert_eq!(world.query_block(Point3::new(1, 0, 0)), Block::AIR);
        assert_eq!(world.stats().dirty_chunks, 1);

        // a neighbor whose halo sees the edit is dirtied too
        world.query_block_mut(Point3::new(-1, 0, 0), |b| *b = Block::AIR);
        world.update(0.0);
        world.set_block(Point3::new(0, 0, 0), Block::new(1));
        assert_eq!(world.stats().dirty_chunks, 2);

        let previous = world.query_block_mut(Point3::new(0, 0, 0), |b| std::mem::replace(b, Block::AIR));
        assert_eq!(previous, Block::new(1));
    }

    #[test]
    fn stale_mesh_results_are_ignored() {
        let mut world = world(0);
        world.set_block(Point3::new(1, 1, 1), Block::new(1));
        let chunk = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();

        let bucket = |side| {
            let mut data = TerrainMeshData::new(1, side);
            data.positions = vec![[0.0; 3]; 6];
            data.attributes = vec![0; 6];
            data
        };

        let first = chunk.get_mut().bump_mesh_version();
        let stale = ChunkMeshGenerationTaskResult {
            chunk: chunk.clone(),
            version: first,
            meshes: vec![bucket(BlockSide::TOP)],
        };
        let second = chunk.get_mut().bump_mesh_version();
        let fresh = ChunkMeshGenerationTaskResult {
            chunk: chunk.clone(),
            version: second,
            meshes: vec![bucket(BlockSide::LEFT), bucket(BlockSide::RIGHT)],
        };

        assert!(world.notify_chunk_meshed(fresh));
        assert!(!world.notify_chunk_meshed(stale));
        let meshes = chunk.get().query_meshes().to_vec();
        assert_eq!(meshes.len(), 2);
        assert!(meshes.iter().all(|m| m.side != BlockSide::TOP));
    }

    #[test]
    fn clearing_releases_buffers_and_detaches_chunks() {
        let mut world = world(10);
        world.ensure_chunk_at(Point3::new(0, 0, 0));
        drive(&mut world);
        assert!(world.buffer_state().get().buffer_count() > 0);

        let chunk = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();
        world.trigger_mesh_update(&chunk);
        world.clear_chunks();
        assert_eq!(world.buffer_state().get().buffer_count(), 0);

        // the in-flight job completes against the detached chunk and is dropped
        drive(&mut world);
        assert!(chunk.get().query_meshes().is_empty());
        assert_eq!(world.stats().chunks, 0);
        assert_eq!(world.buffer_state().get().buffer_count(), 0);
    }

    #[test]
    #[should_panic(expected = "chunk column exceeded")]
    fn runaway_column_is_fatal() {
        let config = WorldConfig {
            max_vertical_chunks: 1,
            ..WorldConfig::default()
        };
        let mut world = world_with(config, 0);
        let chunk = world.ensure_chunk_at(Point3::new(0, -96, 0));
        let blocks = vec![Block::AIR; crate::engine_state::voxels::chunk::CHUNK_SIZE as usize];
        world.notify_chunk_generated(chunk, blocks);
    }
}
