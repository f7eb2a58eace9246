//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a dense 32×32×32 block array anchored at
//! a world-aligned origin, together with the CPU-side state derived from it (bounds,
//! fully-air/fully-solid flags, light fountains) and the uploaded mesh buckets.
//!
//! ## Storage
//!
//! Blocks live in one contiguous buffer indexed by `(z * S + y) * S + x`. Keeping a
//! single flat buffer lets the world copy whole x-runs when it snapshots a padded
//! neighborhood for the mesher.
//!
//! ## Lifecycle
//!
//! 1. The world creates a chunk filled with [`Block::INVALID`]
//! 2. The terrain worker generates its blocks; the world installs them and marks the
//!    chunk generated (exactly once)
//! 3. Dirty chunks get their CPU state recomputed with [`Chunk::update`] and a new mesh
//!    requested; every request bumps the mesh version
//! 4. Mesh data coming back is installed with [`Chunk::notify_mesh_data`]

use std::collections::HashMap;

use cgmath::{EuclideanSpace, Point3, Vector3};

use super::block::{block_side::BlockSide, material::MaterialRegistry, Block, BlockTypeSize};
use super::bounds::Aabb;
use crate::engine_state::{
    buffer_state::{BufferState, BufferWriteCommand},
    rendering::meshing::{TerrainMesh, TerrainMeshData},
};

pub mod neighborhood;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 32;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;
/// The dimension of a chunk including a one-block halo on each side.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The number of blocks in a wrapped 2D chunk plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of blocks in a wrapped chunk.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_DIMENSION_WRAPPED;

/// Floor division of a world coordinate to its chunk origin coordinate.
#[inline]
pub fn chunk_origin_coordinate(v: i32) -> i32 {
    v.div_euclid(CHUNK_DIMENSION) * CHUNK_DIMENSION
}

/// The origin of the chunk containing `pos`. Rounds down, also for negative coordinates.
pub fn chunk_origin_of(pos: Point3<i32>) -> Point3<i32> {
    Point3::new(
        chunk_origin_coordinate(pos.x),
        chunk_origin_coordinate(pos.y),
        chunk_origin_coordinate(pos.z),
    )
}

/// The block containing a continuous world position.
pub fn block_position_of(pos: Point3<f32>) -> Point3<i32> {
    Point3::new(
        pos.x.floor() as i32,
        pos.y.floor() as i32,
        pos.z.floor() as i32,
    )
}

/// Index of a local position in a chunk's block array.
#[inline]
pub fn local_index(x: i32, y: i32, z: i32) -> usize {
    ((z * CHUNK_DIMENSION + y) * CHUNK_DIMENSION + x) as usize
}

/// Index of a position in a padded (halo) neighborhood array. Coordinates run
/// `0..CHUNK_DIMENSION_WRAPPED`, with the chunk's own blocks at `1..=CHUNK_DIMENSION`.
#[inline]
pub fn padded_index(x: usize, y: usize, z: usize) -> usize {
    (z * CHUNK_DIMENSION_WRAPPED + y) * CHUNK_DIMENSION_WRAPPED + x
}

/// Read access to blocks outside a chunk, and to the material tables.
///
/// The world implements this; a chunk only ever borrows it for the duration of a
/// call and never stores it, so it cannot outlive the world.
pub trait ChunkNeighborhood {
    /// The block at a world position, [`Block::INVALID`] where nothing is generated.
    fn query_block(&self, world_pos: Point3<i32>) -> Block;

    /// The material registry.
    fn materials(&self) -> &MaterialRegistry;
}

/// A 32×32×32 collection of voxel blocks.
#[derive(Debug)]
pub struct Chunk {
    /// World-space origin, a multiple of [`CHUNK_DIMENSION`] on every axis.
    pub position: Point3<i32>,
    blocks: Vec<Block>,
    dirty: bool,
    generated: bool,
    meshes: Vec<TerrainMesh>,
    bounding_box: Aabb,
    fully_air: bool,
    fully_solid: bool,
    light_fountains: Vec<Point3<i32>>,
    mesh_version: u64,
}

impl Chunk {
    /// Creates a chunk at `position` with every block set to [`Block::INVALID`].
    ///
    /// A position that is not chunk-aligned is a logic error: it is logged and snapped
    /// down to the enclosing chunk origin.
    pub fn new(position: Point3<i32>) -> Self {
        let origin = chunk_origin_of(position);
        if origin != position {
            log::error!(
                "Chunk origin {:?} is not aligned to chunk size {}, using {:?}",
                position,
                CHUNK_DIMENSION,
                origin
            );
        }

        Chunk {
            position: origin,
            blocks: vec![Block::INVALID; CHUNK_SIZE as usize],
            dirty: false,
            generated: false,
            meshes: Vec::new(),
            bounding_box: Aabb::empty(),
            fully_air: false,
            fully_solid: false,
            light_fountains: Vec::new(),
            mesh_version: 0,
        }
    }

    /// Creates a chunk filled with `block`.
    pub fn filled(position: Point3<i32>, block: Block) -> Self {
        let mut chunk = Chunk::new(position);
        chunk.blocks.fill(block);
        chunk
    }

    /// `true` iff `world_pos` lies within `[origin, origin + S)` on every axis.
    pub fn contains(&self, world_pos: Point3<i32>) -> bool {
        let d = world_pos - self.position;
        (0..CHUNK_DIMENSION).contains(&d.x)
            && (0..CHUNK_DIMENSION).contains(&d.y)
            && (0..CHUNK_DIMENSION).contains(&d.z)
    }

    /// The block at a local position.
    ///
    /// # Panics
    /// Local coordinates must be in `0..CHUNK_DIMENSION`; out-of-range positions may
    /// read an unrelated block or panic.
    #[inline]
    pub fn block(&self, local: Point3<i32>) -> Block {
        self.blocks[local_index(local.x, local.y, local.z)]
    }

    /// Mutable access to the block at a local position. Same range rules as [`Chunk::block`].
    #[inline]
    pub fn block_mut(&mut self, local: Point3<i32>) -> &mut Block {
        &mut self.blocks[local_index(local.x, local.y, local.z)]
    }

    /// All blocks in `(z * S + y) * S + x` order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Replaces every block. Returns `false` and leaves the chunk untouched if the
    /// array has the wrong length.
    pub fn set_blocks(&mut self, blocks: Vec<Block>) -> bool {
        if blocks.len() != CHUNK_SIZE as usize {
            log::error!(
                "Chunk {:?} got {} blocks, expected {}",
                self.position,
                blocks.len(),
                CHUNK_SIZE
            );
            return false;
        }
        self.blocks = blocks;
        true
    }

    /// The block at a world position, asking `neighborhood` when it is outside this chunk.
    pub fn query_block(&self, world_pos: Point3<i32>, neighborhood: &dyn ChunkNeighborhood) -> Block {
        if self.contains(world_pos) {
            self.block(Point3::from_vec(world_pos - self.position))
        } else {
            neighborhood.query_block(world_pos)
        }
    }

    /// Flags the CPU state as out of date.
    ///
    /// Returns `true` on the transition from clean to dirty so the caller can schedule
    /// exactly one recompute. Existing meshes stay until replacement data arrives.
    pub fn mark_dirty(&mut self) -> bool {
        let newly_dirty = !self.dirty;
        self.dirty = true;
        newly_dirty
    }

    /// `true` while the CPU state is out of date.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// `true` once block data has been installed.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Marks the chunk as holding real block data.
    pub fn set_generated(&mut self) {
        self.generated = true;
    }

    /// World-space bounds of all non-air blocks. Empty if there are none.
    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    /// `true` if every block is air (as of the last update).
    pub fn is_fully_air(&self) -> bool {
        self.fully_air
    }

    /// `true` if every block is solid (as of the last update).
    pub fn is_fully_solid(&self) -> bool {
        self.fully_solid
    }

    /// World positions of light-source blocks with air directly above.
    pub fn light_fountains(&self) -> &[Point3<i32>] {
        &self.light_fountains
    }

    /// The version stamped on the most recent mesh request.
    pub fn mesh_version(&self) -> u64 {
        self.mesh_version
    }

    /// Increments and returns the mesh version. Called whenever a mesh is requested.
    pub fn bump_mesh_version(&mut self) -> u64 {
        self.mesh_version += 1;
        self.mesh_version
    }

    /// The uploaded mesh buckets.
    pub fn query_meshes(&self) -> &[TerrainMesh] {
        &self.meshes
    }

    /// Recomputes the CPU-side state if the chunk is dirty, then marks it clean.
    pub fn update(&mut self, neighborhood: &dyn ChunkNeighborhood) {
        if !self.dirty {
            return;
        }
        self.recompute(neighborhood);
        self.dirty = false;
    }

    /// Recomputes the CPU-side state without touching the dirty flag.
    ///
    /// Computes the fully-air/fully-solid flags, the bounds of all non-air blocks and
    /// the light fountains. The block above the top layer is read through
    /// `neighborhood`, so it may come from the chunk above. A chunk that is queued for
    /// an update stays dirty, so marking it again does not queue it twice.
    pub fn recompute(&mut self, neighborhood: &dyn ChunkNeighborhood) {
        let mut fully_air = true;
        let mut fully_solid = true;
        let mut min = Point3::new(CHUNK_DIMENSION, CHUNK_DIMENSION, CHUNK_DIMENSION);
        let mut max = Point3::new(-1, -1, -1);
        let mut light_fountains = Vec::new();
        let materials = neighborhood.materials();

        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    let block = self.blocks[local_index(x, y, z)];
                    fully_air &= block.is_air();
                    fully_solid &= block.is_solid();

                    if !block.is_renderable() {
                        continue;
                    }

                    min.x = min.x.min(x);
                    min.y = min.y.min(y);
                    min.z = min.z.min(z);
                    max.x = max.x.max(x);
                    max.y = max.y.max(y);
                    max.z = max.z.max(z);

                    if materials.spawns_light_sources(block) {
                        let world_pos = self.position + Vector3::new(x, y, z);
                        let above = world_pos + Vector3::unit_y();
                        if self.query_block(above, neighborhood).is_air() {
                            light_fountains.push(world_pos);
                        }
                    }
                }
            }
        }

        self.bounding_box = if max.x < 0 {
            Aabb::empty()
        } else {
            let lo = self.position + min.to_vec();
            let hi = self.position + max.to_vec() + Vector3::new(1, 1, 1);
            Aabb::new(
                Point3::new(lo.x as f32, lo.y as f32, lo.z as f32),
                Point3::new(hi.x as f32, hi.y as f32, hi.z as f32),
            )
        };
        self.fully_air = fully_air;
        self.fully_solid = fully_solid;
        self.light_fountains = light_fountains;
    }

    /// Installs freshly generated mesh data.
    ///
    /// Buckets whose (material, side) key already exists keep their buffer handles and
    /// only get new contents uploaded; new keys get new buffers; buckets missing from
    /// `meshes` are released. Must run on the thread that owns `buffer_state`.
    pub fn notify_mesh_data(&mut self, meshes: Vec<TerrainMeshData>, buffer_state: &mut BufferState) {
        let mut previous: HashMap<(BlockTypeSize, BlockSide), TerrainMesh> = self
            .meshes
            .drain(..)
            .map(|mesh| (mesh.key(), mesh))
            .collect();

        for data in meshes {
            let key = (data.material, data.side);
            let (position_buffer, attribute_buffer) = match previous.remove(&key) {
                Some(existing) => (existing.position_buffer, existing.attribute_buffer),
                None => (
                    buffer_state.create_buffer(&format!(
                        "Terrain Positions {:?} {} {:?}",
                        self.position, data.material, data.side
                    )),
                    buffer_state.create_buffer(&format!(
                        "Terrain Attributes {:?} {} {:?}",
                        self.position, data.material, data.side
                    )),
                ),
            };

            buffer_state.write(BufferWriteCommand::whole(position_buffer, &data.positions));
            buffer_state.write(BufferWriteCommand::whole(attribute_buffer, &data.attributes));

            self.meshes.push(TerrainMesh {
                material: data.material,
                side: data.side,
                aabb: data.aabb,
                vertex_count: data.positions.len() as u32,
                position_buffer,
                attribute_buffer,
            });
        }

        for stale in previous.into_values() {
            buffer_state.destroy_buffer(stale.position_buffer);
            buffer_state.destroy_buffer(stale.attribute_buffer);
        }
    }

    /// Drops all mesh buckets and releases their buffers.
    pub fn release_meshes(&mut self, buffer_state: &mut BufferState) {
        for mesh in self.meshes.drain(..) {
            buffer_state.destroy_buffer(mesh.position_buffer);
            buffer_state.destroy_buffer(mesh.attribute_buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Everything outside the chunk is air.
    struct OpenSky(MaterialRegistry);

    impl ChunkNeighborhood for OpenSky {
        fn query_block(&self, _world_pos: Point3<i32>) -> Block {
            Block::AIR
        }

        fn materials(&self) -> &MaterialRegistry {
            &self.0
        }
    }

    fn sky() -> OpenSky {
        OpenSky(MaterialRegistry::default_materials())
    }

    #[test]
    fn origin_rounds_down_for_negative_positions() {
        assert_eq!(chunk_origin_of(Point3::new(-1, 0, 31)), Point3::new(-32, 0, 0));
        assert_eq!(chunk_origin_of(Point3::new(-32, -33, 32)), Point3::new(-32, -64, 32));
        assert_eq!(block_position_of(Point3::new(-0.5, 0.5, -1.0)), Point3::new(-1, 0, -1));
    }

    #[test]
    fn misaligned_origin_is_snapped() {
        let chunk = Chunk::new(Point3::new(5, -3, 40));
        assert_eq!(chunk.position, Point3::new(0, -32, 32));
        assert!(chunk.blocks().iter().all(Block::is_invalid));
    }

    #[test]
    fn contains_is_half_open() {
        let chunk = Chunk::new(Point3::new(-32, 0, 0));
        assert!(chunk.contains(Point3::new(-32, 0, 0)));
        assert!(chunk.contains(Point3::new(-1, 31, 31)));
        assert!(!chunk.contains(Point3::new(0, 0, 0)));
        assert!(!chunk.contains(Point3::new(-33, 0, 0)));
    }

    #[test]
    fn mark_dirty_reports_only_the_first_transition() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(chunk.mark_dirty());
        assert!(!chunk.mark_dirty());
        chunk.update(&sky());
        assert!(!chunk.is_dirty());
        assert!(chunk.mark_dirty());
    }

    #[test]
    fn recompute_keeps_a_queued_chunk_dirty() {
        let mut chunk = Chunk::filled(Point3::new(0, 0, 0), Block::new(2));
        assert!(chunk.mark_dirty());
        chunk.recompute(&sky());
        assert!(chunk.is_fully_solid());
        assert!(chunk.is_dirty());
        assert!(!chunk.mark_dirty());
    }

    #[test]
    fn update_computes_tight_bounds_and_flags() {
        let mut chunk = Chunk::filled(Point3::new(32, 0, -32), Block::AIR);
        *chunk.block_mut(Point3::new(1, 2, 3)) = Block::new(1);
        *chunk.block_mut(Point3::new(4, 5, 6)) = Block::new(-1);
        chunk.mark_dirty();
        chunk.update(&sky());

        assert_eq!(chunk.bounding_box().min, Point3::new(33.0, 2.0, -29.0));
        assert_eq!(chunk.bounding_box().max, Point3::new(37.0, 6.0, -25.0));
        assert!(!chunk.is_fully_air());
        assert!(!chunk.is_fully_solid());
    }

    #[test]
    fn update_of_empty_and_full_chunks() {
        let mut air = Chunk::filled(Point3::new(0, 0, 0), Block::AIR);
        air.mark_dirty();
        air.update(&sky());
        assert!(air.is_fully_air());
        assert!(air.bounding_box().is_empty());

        let mut stone = Chunk::filled(Point3::new(0, 0, 0), Block::new(3));
        stone.mark_dirty();
        stone.update(&sky());
        assert!(stone.is_fully_solid());
        assert_eq!(stone.bounding_box().max, Point3::new(32.0, 32.0, 32.0));
    }

    #[test]
    fn light_fountains_need_air_above() {
        let materials = MaterialRegistry::default_materials();
        let lava = materials.get_by_name("lava").unwrap().block();
        let mut chunk = Chunk::filled(Point3::new(0, 0, 0), Block::AIR);
        *chunk.block_mut(Point3::new(2, 0, 2)) = lava;
        *chunk.block_mut(Point3::new(3, 0, 3)) = lava;
        *chunk.block_mut(Point3::new(3, 1, 3)) = Block::new(1);
        // top layer looks into the neighborhood, which is air
        *chunk.block_mut(Point3::new(0, 31, 0)) = lava;
        chunk.mark_dirty();
        chunk.update(&sky());

        assert_eq!(
            chunk.light_fountains(),
            &[Point3::new(0, 31, 0), Point3::new(2, 0, 2)]
        );
    }

    #[test]
    fn mesh_buffers_are_reused_per_bucket() {
        let mut buffer_state = BufferState::new();
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        let mut top = TerrainMeshData::new(1, BlockSide::TOP);
        top.positions = vec![[0.0; 3]; 6];
        top.attributes = vec![0; 6];
        let mut left = TerrainMeshData::new(1, BlockSide::LEFT);
        left.positions = vec![[1.0; 3]; 6];
        left.attributes = vec![1; 6];

        chunk.notify_mesh_data(vec![top.clone(), left], &mut buffer_state);
        assert_eq!(chunk.query_meshes().len(), 2);
        assert_eq!(buffer_state.buffer_count(), 4);
        let top_handle = chunk.query_meshes()[0].position_buffer;

        top.positions.extend_from_slice(&[[2.0; 3]; 6]);
        top.attributes.extend_from_slice(&[2; 6]);
        chunk.notify_mesh_data(vec![top], &mut buffer_state);

        assert_eq!(chunk.query_meshes().len(), 1);
        assert_eq!(chunk.query_meshes()[0].position_buffer, top_handle);
        assert_eq!(chunk.query_meshes()[0].vertex_count, 12);
        assert_eq!(buffer_state.buffer_count(), 2);
        assert_eq!(buffer_state.analytics(top_handle).unwrap().used_memory, 12 * 12);

        chunk.release_meshes(&mut buffer_state);
        assert_eq!(buffer_state.buffer_count(), 0);
    }

    #[test]
    fn wrong_block_count_is_rejected() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(!chunk.set_blocks(vec![Block::AIR; 10]));
        assert!(chunk.blocks().iter().all(Block::is_invalid));
        assert!(chunk.set_blocks(vec![Block::AIR; CHUNK_SIZE as usize]));
        assert!(chunk.blocks().iter().all(Block::is_air));
    }
}
