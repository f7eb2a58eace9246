//! # Block Side Module
//!
//! This module defines the six faces/sides of a voxel block.
//! Mesh buckets are keyed by side, and the renderer uses the side to cull whole
//! buckets that face away from the camera.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value that is packed into every vertex
/// descriptor, so the order is part of the vertex format.
///
/// The order is: [LEFT, RIGHT, BOTTOM, TOP, BACK, FRONT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, PartialOrd, Ord, FromPrimitive)]
pub enum BlockSide {
    /// The left face (facing negative X)
    LEFT = 0,

    /// The right face (facing positive X)
    RIGHT = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The back face (facing negative Z)
    BACK = 4,

    /// The front face (facing positive Z)
    FRONT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in index order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::LEFT,
            BlockSide::RIGHT,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::BACK,
            BlockSide::FRONT,
        ]
    }

    /// Converts a packed face index (0..6) back into a `BlockSide`.
    pub fn from_index(index: u32) -> Option<BlockSide> {
        num_traits::FromPrimitive::from_u32(index)
    }

    /// The face index as stored in vertex descriptors.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The axis (0 = x, 1 = y, 2 = z) the face normal points along.
    #[inline]
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// `+1` for faces pointing along the positive axis, `-1` otherwise.
    #[inline]
    pub fn sign(self) -> i32 {
        if self as usize % 2 == 1 {
            1
        } else {
            -1
        }
    }

    /// The integer outward normal of this face.
    pub fn normal(self) -> Vector3<i32> {
        let mut normal = Vector3::new(0, 0, 0);
        normal[self.axis()] = self.sign();
        normal
    }

    /// The outward normal as a float direction vector.
    pub fn direction(self) -> Vector3<f32> {
        self.normal().cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 0.0))
    }

    /// The face on the opposite side of the block.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::FRONT => BlockSide::BACK,
        }
    }

    /// Determines which block faces are potentially visible from a given view direction.
    ///
    /// A face can only be seen if the camera looks against its normal. The cutoff is
    /// 1/√2 so faces at grazing angles are still kept.
    ///
    /// # Arguments
    /// * `view_vec` - The normalized view direction vector
    ///
    /// # Returns
    /// All potentially visible block faces, in index order.
    pub fn get_visible_sides(view_vec: Vector3<f32>) -> Vec<BlockSide> {
        const CUTOFF: f32 = std::f32::consts::FRAC_1_SQRT_2;
        let mut visible_sides = Vec::new();

        if view_vec.x > -CUTOFF {
            visible_sides.push(BlockSide::LEFT);
        }
        if view_vec.x < CUTOFF {
            visible_sides.push(BlockSide::RIGHT);
        }
        if view_vec.y > -CUTOFF {
            visible_sides.push(BlockSide::BOTTOM);
        }
        if view_vec.y < CUTOFF {
            visible_sides.push(BlockSide::TOP);
        }
        if view_vec.z > -CUTOFF {
            visible_sides.push(BlockSide::BACK);
        }
        if view_vec.z < CUTOFF {
            visible_sides.push(BlockSide::FRONT);
        }

        visible_sides
    }
}
