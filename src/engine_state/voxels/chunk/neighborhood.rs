//! Padded neighborhood snapshots for the mesher.
//!
//! A snapshot is a `CHUNK_SIZE_WRAPPED` block array: the chunk itself at padded
//! coordinates `1..=S` plus one layer from each of its 26 neighbors. Cells whose
//! neighbor does not exist stay [`Block::INVALID`].

use std::ops::Range;

use cgmath::{Point3, Vector3};

use super::{
    local_index, padded_index, Chunk, CHUNK_DIMENSION, CHUNK_DIMENSION_WRAPPED, CHUNK_SIZE_WRAPPED,
};
use crate::engine_state::voxels::block::Block;

/// A neighborhood with every cell set to [`Block::INVALID`].
pub fn empty_neighborhood() -> Vec<Block> {
    vec![Block::INVALID; CHUNK_SIZE_WRAPPED]
}

/// Offsets of the 26 neighbors plus the chunk itself, in units of chunks.
pub fn neighborhood_offsets() -> impl Iterator<Item = Vector3<i32>> {
    (-1..=1).flat_map(|z| (-1..=1).flat_map(move |y| (-1..=1).map(move |x| Vector3::new(x, y, z))))
}

/// Padded cells covered by a chunk `d` chunks away along one axis.
fn padded_range(d: i32) -> Range<usize> {
    match d {
        -1 => 0..1,
        0 => 1..CHUNK_DIMENSION_WRAPPED - 1,
        _ => CHUNK_DIMENSION_WRAPPED - 1..CHUNK_DIMENSION_WRAPPED,
    }
}

/// Copies the part of `source` that overlaps the halo of the chunk at `center` into
/// `padded`. Chunks that are not adjacent to `center` are ignored.
pub fn copy_into_neighborhood(padded: &mut [Block], center: Point3<i32>, source: &Chunk) {
    let delta = source.position - center;
    let d = delta / CHUNK_DIMENSION;
    if delta.x % CHUNK_DIMENSION != 0
        || delta.y % CHUNK_DIMENSION != 0
        || delta.z % CHUNK_DIMENSION != 0
        || d.x.abs() > 1
        || d.y.abs() > 1
        || d.z.abs() > 1
    {
        log::warn!(
            "Chunk {:?} is not a neighbor of {:?}, skipping",
            source.position,
            center
        );
        return;
    }
    if padded.len() != CHUNK_SIZE_WRAPPED {
        log::error!(
            "Neighborhood has {} cells, expected {}",
            padded.len(),
            CHUNK_SIZE_WRAPPED
        );
        return;
    }

    // padded coordinate p maps to local coordinate p - 1 - d * S
    let to_local = |p: usize, d: i32| p as i32 - 1 - d * CHUNK_DIMENSION;
    let xs = padded_range(d.x);
    let run = xs.len();
    let blocks = source.blocks();

    for z in padded_range(d.z) {
        for y in padded_range(d.y) {
            let dst = padded_index(xs.start, y, z);
            let src = local_index(to_local(xs.start, d.x), to_local(y, d.y), to_local(z, d.z));
            padded[dst..dst + run].copy_from_slice(&blocks[src..src + run]);
        }
    }
}
