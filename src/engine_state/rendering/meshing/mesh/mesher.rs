//! Face meshing of a padded chunk neighborhood.
//!
//! Every exposed unit face of every renderable block becomes one quad. Faces are
//! bucketed by (material, side) so the renderer can bind one material per draw and
//! cull whole buckets that face away from the camera.

use std::collections::BTreeSet;

use bitvec::prelude::*;
use cgmath::Point3;
use log::debug;
use web_time::Instant;

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, Block, BlockTypeSize},
    chunk::{padded_index, CHUNK_DIMENSION_WRAPPED, CHUNK_SIZE_WRAPPED},
};

use super::{face::Face, mesh::TerrainMeshData};

const FIRST: usize = 1;
const LAST: usize = CHUNK_DIMENSION_WRAPPED - 2;

/// Solidity lookup over a padded neighborhood.
struct SolidMask {
    bits: BitVec,
}

impl SolidMask {
    fn new(padded: &[Block]) -> Self {
        let mut bits = bitvec![0; padded.len()];
        for (i, block) in padded.iter().enumerate() {
            if block.is_solid() {
                bits.set(i, true);
            }
        }
        SolidMask { bits }
    }

    /// Solidity at padded coordinates. Anything outside the padded array is open.
    fn at(&self, x: i32, y: i32, z: i32) -> bool {
        let range = 0..CHUNK_DIMENSION_WRAPPED as i32;
        if !range.contains(&x) || !range.contains(&y) || !range.contains(&z) {
            return false;
        }
        self.bits[padded_index(x as usize, y as usize, z as usize)]
    }
}

/// Builds the mesh buckets of one chunk.
///
/// `padded` must hold `CHUNK_SIZE_WRAPPED` blocks (the chunk plus a one-block halo)
/// and `origin` is the chunk's world origin. The result holds one entry per
/// (material, side) pair with at least one visible face, ordered by material and then
/// side. The output depends on the inputs only, so this can run on any thread.
pub fn generate_terrain_meshes(padded: &[Block], origin: Point3<i32>) -> Vec<TerrainMeshData> {
    if padded.len() != CHUNK_SIZE_WRAPPED {
        log::error!(
            "Cannot mesh chunk {:?}: neighborhood has {} blocks, expected {}",
            origin,
            padded.len(),
            CHUNK_SIZE_WRAPPED
        );
        return Vec::new();
    }

    let start = Instant::now();
    let solid = SolidMask::new(padded);

    let mut materials = BTreeSet::new();
    for z in FIRST..=LAST {
        for y in FIRST..=LAST {
            for x in FIRST..=LAST {
                let block = padded[padded_index(x, y, z)];
                if block.is_renderable() {
                    materials.insert(block.mat);
                }
            }
        }
    }

    let mut meshes = Vec::new();
    for mat in materials {
        let mut buckets = BlockSide::all().map(|side| TerrainMeshData::new(mat, side));
        mesh_material(padded, &solid, origin, mat, &mut buckets);
        meshes.extend(buckets.into_iter().filter(|bucket| !bucket.is_empty()));
    }

    debug!(
        "Meshed chunk {:?} into {} buckets in {:?}",
        origin,
        meshes.len(),
        start.elapsed()
    );
    meshes
}

/// Emits the faces of every block of material `mat` into the per-side buckets.
fn mesh_material(
    padded: &[Block],
    solid: &SolidMask,
    origin: Point3<i32>,
    mat: BlockTypeSize,
    buckets: &mut [TerrainMeshData; 6],
) {
    for z in FIRST..=LAST {
        for y in FIRST..=LAST {
            for x in FIRST..=LAST {
                if padded[padded_index(x, y, z)].mat != mat {
                    continue;
                }

                let (px, py, pz) = (x as i32, y as i32, z as i32);
                let world = Point3::new(
                    origin.x + px - 1,
                    origin.y + py - 1,
                    origin.z + pz - 1,
                );

                for side in BlockSide::all() {
                    let n = side.normal();
                    let (nx, ny, nz) = (px + n.x, py + n.y, pz + n.z);
                    let neighbor = padded[padded_index(nx as usize, ny as usize, nz as usize)];
                    if solid.at(nx, ny, nz) || neighbor.mat == mat {
                        continue;
                    }

                    let face = Face::new(world, side, |o| solid.at(px + o[0], py + o[1], pz + o[2]));
                    buckets[side.index()].push_face(&face);
                }
            }
        }
    }
}
