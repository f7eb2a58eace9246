//! Mesh data structures for terrain rendering.
//!
//! [`TerrainMeshData`] is the plain-data payload the terrain worker produces. It holds
//! no GPU handles and may cross threads freely. [`TerrainMesh`] is what a chunk keeps
//! after the main thread has uploaded that data through the buffer registry.

use cgmath::{Point3, Vector3};

use crate::engine_state::{
    buffer_state::BufferHandle,
    voxels::{
        block::{block_side::BlockSide, BlockTypeSize},
        bounds::Aabb,
    },
};

use super::face::{Face, QUAD_TRIANGLE_CORNERS};

/// Vertex data of one (material, side) bucket of a chunk.
///
/// Positions and packed attributes are parallel arrays so positions can be
/// re-uploaded without touching the attribute buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMeshData {
    /// Signed material index of every face in this bucket
    pub material: BlockTypeSize,
    /// Direction every face in this bucket points to
    pub side: BlockSide,
    /// Bounds of all vertex positions
    pub aabb: Aabb,
    /// World-space vertex positions, six per face
    pub positions: Vec<[f32; 3]>,
    /// Packed vertex descriptors, parallel to `positions`
    pub attributes: Vec<u32>,
}

impl TerrainMeshData {
    /// Creates an empty bucket.
    pub fn new(material: BlockTypeSize, side: BlockSide) -> Self {
        TerrainMeshData {
            material,
            side,
            aabb: Aabb::empty(),
            positions: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// The face direction as a vector.
    pub fn direction(&self) -> Vector3<f32> {
        self.side.direction()
    }

    /// Number of vertices in the bucket.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// `true` if no face was emitted.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Appends the two triangles of a face and grows the bounds to cover it.
    pub fn push_face(&mut self, face: &Face) {
        for &corner in QUAD_TRIANGLE_CORNERS.iter() {
            let p = face.corners[corner];
            self.positions.push([p.x, p.y, p.z]);
            self.attributes.push(face.descriptor(corner));
        }
        for p in face.corners {
            self.aabb.add_point(p);
        }
    }

    /// Vertex positions as points.
    pub fn points(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.positions.iter().map(|p| Point3::new(p[0], p[1], p[2]))
    }
}

/// An uploaded mesh bucket owned by a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    /// Signed material index
    pub material: BlockTypeSize,
    /// Face direction of the bucket
    pub side: BlockSide,
    /// Bounds used for frustum and range culling
    pub aabb: Aabb,
    /// Number of vertices to draw
    pub vertex_count: u32,
    /// Buffer holding the `[f32; 3]` positions
    pub position_buffer: BufferHandle,
    /// Buffer holding the packed `u32` descriptors
    pub attribute_buffer: BufferHandle,
}

impl TerrainMesh {
    /// The (material, side) key identifying this bucket within its chunk.
    pub fn key(&self) -> (BlockTypeSize, BlockSide) {
        (self.material, self.side)
    }

    /// The face direction as a vector.
    pub fn direction(&self) -> Vector3<f32> {
        self.side.direction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_face_is_six_vertices() {
        let mut data = TerrainMeshData::new(1, BlockSide::FRONT);
        assert!(data.is_empty());
        data.push_face(&Face::new(Point3::new(1, 2, 3), BlockSide::FRONT, |_| false));
        assert_eq!(data.vertex_count(), 6);
        assert_eq!(data.attributes.len(), 6);
        assert_eq!(data.aabb.min, Point3::new(1.0, 2.0, 4.0));
        assert_eq!(data.aabb.max, Point3::new(2.0, 3.0, 4.0));
        assert!(data.points().all(|p| p.z == 4.0));
    }
}
