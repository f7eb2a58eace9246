//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel world.
//! It includes the block value type, block face directions and the material registry
//! that gives block indices their meaning.
//!
//! ## Encoding
//!
//! A block is a single signed byte:
//! * `0` is air
//! * `> 0` is a solid block indexing the opaque material table
//! * `< 0` is a translucent block indexing the translucent material table via `-mat`
//! * [`Block::INVALID_INDEX`] marks a block that has not been generated yet

pub mod block_side;
pub mod material;

/// The underlying integer type used to represent block materials in memory.
pub type BlockTypeSize = i8;

/// Represents a single voxel block in the world.
///
/// Blocks have no identity beyond their position and are copied freely.
///
/// # Memory Layout
/// `#[repr(C)]` and `Pod` make a block exactly one byte with no padding, so a block
/// array can be viewed as raw `i8` material indices through `bytemuck` when it is
/// handed to a byte-oriented buffer.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct Block {
    /// The signed material index of this block.
    pub mat: BlockTypeSize,
}

impl Block {
    /// Sentinel index for "not generated yet / unknown".
    pub const INVALID_INDEX: BlockTypeSize = 127;

    /// An air block.
    pub const AIR: Block = Block { mat: 0 };

    /// A block that has not been generated yet.
    pub const INVALID: Block = Block {
        mat: Self::INVALID_INDEX,
    };

    /// Creates a block with the given signed material index.
    pub const fn new(mat: BlockTypeSize) -> Self {
        Block { mat }
    }

    /// `true` for air.
    #[inline]
    pub const fn is_air(&self) -> bool {
        self.mat == 0
    }

    /// `true` for blocks of an opaque material. The invalid sentinel is never solid.
    #[inline]
    pub const fn is_solid(&self) -> bool {
        self.mat > 0 && self.mat != Self::INVALID_INDEX
    }

    /// `true` for blocks of a translucent material.
    #[inline]
    pub const fn is_translucent(&self) -> bool {
        self.mat < 0
    }

    /// `true` for the "not generated yet" sentinel.
    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.mat == Self::INVALID_INDEX
    }

    /// `true` for blocks that produce geometry: neither air nor invalid.
    #[inline]
    pub const fn is_renderable(&self) -> bool {
        !self.is_air() && !self.is_invalid()
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::INVALID
    }
}
