use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::BlockSide;

/// Corner orders, as (u, v) offsets, wound counter-clockwise when seen from outside.
///
/// For a face whose normal is the positive axis `a`, `u = a + 1` and `v = a + 2`
/// (mod 3) and `u × v = a`, so increasing u then v winds counter-clockwise. Faces on
/// the negative side walk the same square the other way round.
const POSITIVE_CORNERS: [(u8, u8); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];
const NEGATIVE_CORNERS: [(u8, u8); 4] = [(0, 0), (0, 1), (1, 1), (1, 0)];

/// Corner indices of the two triangles of a quad.
pub const QUAD_TRIANGLE_CORNERS: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Number of vertices emitted per visible face (non-indexed triangle list).
pub const VERTICES_PER_FACE: usize = QUAD_TRIANGLE_CORNERS.len();

/// Edge flag: neither the block beside the edge nor the block above it is solid.
pub const EDGE_OPEN: u8 = 0;
/// Edge flag: the face continues flat onto a solid block beside the edge.
pub const EDGE_INWARD_SOLID: u8 = 1;
/// Edge flag: a solid block rises over the edge on the outward side.
pub const EDGE_OUTWARD_SOLID: u8 = 2;

/// The packed per-vertex attributes of a terrain face.
///
/// Bit layout of the packed `u32`:
/// - bits 0..8: ambient occlusion of corners 0..4, two bits each (0 = dark, 3 = open)
/// - bits 8..15: the four edge flags as base-3 digits (edge `-u`, `+u`, `-v`, `+v`)
/// - bits 15..18: face direction index
/// - bits 18..20: corner index of this vertex
///
/// Every vertex of a face carries the occlusion of all four corners so the shader can
/// interpolate occlusion across the quad without the diagonal seam of plain vertex
/// colors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexDescriptor {
    /// Occlusion level per corner
    pub ao: [u8; 4],
    /// Edge classification per edge
    pub edges: [u8; 4],
    /// Face direction
    pub side: BlockSide,
    /// Which corner of the quad this vertex is
    pub corner: u8,
}

impl VertexDescriptor {
    const EDGE_SHIFT: u32 = 8;
    const SIDE_SHIFT: u32 = 15;
    const CORNER_SHIFT: u32 = 18;

    /// Packs the descriptor into a single attribute word.
    pub fn pack(&self) -> u32 {
        let ao = self
            .ao
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &level)| acc | (u32::from(level & 0b11) << (2 * i)));
        let edges = self
            .edges
            .iter()
            .rev()
            .fold(0u32, |acc, &flag| acc * 3 + u32::from(flag.min(2)));

        ao | (edges << Self::EDGE_SHIFT)
            | ((self.side.index() as u32) << Self::SIDE_SHIFT)
            | (u32::from(self.corner & 0b11) << Self::CORNER_SHIFT)
    }

    /// Unpacks an attribute word. Returns `None` if the face index is out of range.
    pub fn unpack(word: u32) -> Option<Self> {
        let ao = std::array::from_fn(|i| ((word >> (2 * i)) & 0b11) as u8);
        let mut trits = (word >> Self::EDGE_SHIFT) & 0x7f;
        let edges = std::array::from_fn(|_| {
            let flag = (trits % 3) as u8;
            trits /= 3;
            flag
        });
        let side = BlockSide::from_index((word >> Self::SIDE_SHIFT) & 0b111)?;
        let corner = ((word >> Self::CORNER_SHIFT) & 0b11) as u8;
        Some(VertexDescriptor {
            ao,
            edges,
            side,
            corner,
        })
    }
}

/// One visible unit face of a block, ready to be appended to a mesh bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// World-space corner positions in winding order
    pub corners: [Point3<f32>; 4],
    /// Occlusion level per corner
    pub ao: [u8; 4],
    /// Edge flags for the edges `-u`, `+u`, `-v`, `+v`
    pub edges: [u8; 4],
    /// Which side of the block this face represents
    pub block_side: BlockSide,
}

impl Face {
    /// Builds the face of the block at world position `block` on `block_side`.
    ///
    /// `is_solid` answers solidity for an offset relative to the block, and is
    /// sampled for the occlusion and edge data.
    pub fn new<F>(block: Point3<i32>, block_side: BlockSide, is_solid: F) -> Self
    where
        F: Fn([i32; 3]) -> bool,
    {
        let a = block_side.axis();
        let u = (a + 1) % 3;
        let v = (a + 2) % 3;
        let plane = if block_side.sign() > 0 { 1.0 } else { 0.0 };

        let order = if block_side.sign() > 0 {
            POSITIVE_CORNERS
        } else {
            NEGATIVE_CORNERS
        };

        let offset = |du: i32, dv: i32, dn: i32| -> [i32; 3] {
            let mut o = [0; 3];
            o[a] = dn * block_side.sign();
            o[u] = du;
            o[v] = dv;
            o
        };

        let corners = order.map(|(cu, cv)| {
            let mut p = [block.x as f32, block.y as f32, block.z as f32];
            p[a] += plane;
            p[u] += f32::from(cu);
            p[v] += f32::from(cv);
            Point3::new(p[0], p[1], p[2])
        });

        let ao = order.map(|(cu, cv)| {
            let du = if cu == 1 { 1 } else { -1 };
            let dv = if cv == 1 { 1 } else { -1 };
            let side1 = is_solid(offset(du, 0, 1));
            let side2 = is_solid(offset(0, dv, 1));
            let corner = is_solid(offset(du, dv, 1));
            vertex_ao(side1, side2, corner)
        });

        let edges = [(-1, 0), (1, 0), (0, -1), (0, 1)].map(|(du, dv)| {
            if is_solid(offset(du, dv, 1)) {
                EDGE_OUTWARD_SOLID
            } else if is_solid(offset(du, dv, 0)) {
                EDGE_INWARD_SOLID
            } else {
                EDGE_OPEN
            }
        });

        Face {
            corners,
            ao,
            edges,
            block_side,
        }
    }

    /// The packed descriptor of the given corner.
    pub fn descriptor(&self, corner: usize) -> u32 {
        VertexDescriptor {
            ao: self.ao,
            edges: self.edges,
            side: self.block_side,
            corner: corner as u8,
        }
        .pack()
    }
}

/// Occlusion level of a vertex from its three neighbors above the face plane.
///
/// Two solid side neighbors fully occlude the corner whatever the diagonal holds.
pub fn vertex_ao(side1: bool, side2: bool, corner: bool) -> u8 {
    if side1 && side2 {
        0
    } else {
        3 - (side1 as u8 + side2 as u8 + corner as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    #[test]
    fn both_sides_solid_is_fully_occluded() {
        assert_eq!(vertex_ao(true, true, false), 0);
        assert_eq!(vertex_ao(true, true, true), 0);
        assert_eq!(vertex_ao(false, false, false), 3);
        assert_eq!(vertex_ao(true, false, false), 2);
        assert_eq!(vertex_ao(false, false, true), 2);
        assert_eq!(vertex_ao(true, false, true), 1);
    }

    #[test]
    fn descriptor_packing_is_reversible() {
        let descriptor = VertexDescriptor {
            ao: [0, 1, 2, 3],
            edges: [2, 0, 1, 2],
            side: BlockSide::BACK,
            corner: 3,
        };
        let word = descriptor.pack();
        assert!(word < 1 << 20);
        assert_eq!(VertexDescriptor::unpack(word), Some(descriptor));
    }

    #[test]
    fn faces_wind_counter_clockwise_from_outside() {
        for side in BlockSide::all() {
            let face = Face::new(Point3::new(3, -2, 7), side, |_| false);
            let [c0, c1, c2, _] = face.corners;
            let normal = (c1 - c0).cross(c2 - c0).normalize();
            assert_eq!(normal, side.direction(), "winding of {side:?}");
            let expected: Vector3<f32> = side.direction();
            assert!(normal.dot(expected) > 0.99);
        }
    }

    #[test]
    fn open_face_has_no_occlusion() {
        let face = Face::new(Point3::new(0, 0, 0), BlockSide::TOP, |_| false);
        assert_eq!(face.ao, [3; 4]);
        assert_eq!(face.edges, [EDGE_OPEN; 4]);
        for p in face.corners {
            assert_eq!(p.y, 1.0);
        }
    }

    #[test]
    fn wall_on_one_side_darkens_its_corners() {
        // solid column at +x above the top face
        let face = Face::new(Point3::new(0, 0, 0), BlockSide::TOP, |o| o == [1, 1, 0]);
        // TOP: a = y, u = z, v = x. Corners with v = 1 touch the wall.
        for (i, (_, cv)) in POSITIVE_CORNERS.iter().enumerate() {
            let expected = if *cv == 1 { 2 } else { 3 };
            assert_eq!(face.ao[i], expected);
        }
        assert_eq!(face.edges[3], EDGE_OUTWARD_SOLID);
        assert_eq!(face.edges[2], EDGE_OPEN);
    }
}
