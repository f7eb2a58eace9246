//! # Terrain Generation
//!
//! Procedural block data for freshly created chunks. Generators are pure functions of
//! the chunk origin: the terrain worker calls them off the main thread, and the same
//! origin always yields the same blocks.

use cgmath::Point3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::{
    block::{material::MaterialRegistry, Block},
    chunk::{local_index, CHUNK_DIMENSION, CHUNK_SIZE},
};

/// Produces the blocks of a chunk.
pub trait TerrainGenerator: Send + Sync {
    /// Returns `CHUNK_SIZE` blocks for the chunk at `origin`, in `(z * S + y) * S + x`
    /// order.
    fn generate(&self, origin: Point3<i32>) -> Vec<Block>;
}

/// Scaling factor applied to world coordinates when sampling the cave noise.
pub const CAVE_SCALE_FACTOR: f64 = 0.045;
/// Cave noise values inside this band are carved out.
pub const CAVE_THRESHOLD: (f64, f64) = (-0.06, 0.06);
/// Horizontal frequency of the heightmap.
pub const HEIGHT_FREQUENCY: f64 = 0.006;
/// Vertical amplitude of the heightmap in blocks.
pub const HEIGHT_AMPLITUDE: f64 = 40.0;
/// Caves only reach this many blocks below the surface; deeper rock is solid.
pub const CAVE_DEPTH: i32 = 48;
/// Water fills every air block at or below this height.
pub const SEA_LEVEL: i32 = 4;
/// One in this many eligible surface columns becomes a lava pool.
pub const LAVA_RARITY: u32 = 4000;

/// Materials the noise generator places, resolved once from the registry.
#[derive(Debug, Clone, Copy)]
struct Palette {
    grass: Block,
    dirt: Block,
    stone: Block,
    sand: Block,
    water: Block,
    lava: Block,
}

impl Palette {
    fn resolve(materials: &MaterialRegistry) -> Self {
        let pick = |name: &str, fallback: Block| {
            materials
                .get_by_name(name)
                .map(|material| material.block())
                .unwrap_or(fallback)
        };
        let stone = pick("stone", Block::AIR);
        Palette {
            grass: pick("grass", stone),
            dirt: pick("dirt", stone),
            stone,
            sand: pick("sand", stone),
            water: pick("water", Block::AIR),
            lava: pick("lava", stone),
        }
    }
}

/// Rolling hills with caves, beaches and water, from seeded Perlin noise.
pub struct NoiseTerrainGenerator {
    seed: u32,
    height: Fbm<Perlin>,
    caves: Perlin,
    palette: Palette,
}

impl NoiseTerrainGenerator {
    /// Creates a generator. Material names that do not exist in `materials` are logged
    /// by the registry and replaced by stone (or air for water).
    pub fn new(seed: u32, materials: &MaterialRegistry) -> Self {
        NoiseTerrainGenerator {
            seed,
            height: Fbm::<Perlin>::new(seed)
                .set_octaves(5)
                .set_frequency(HEIGHT_FREQUENCY),
            caves: Perlin::new(seed.wrapping_add(1)),
            palette: Palette::resolve(materials),
        }
    }

    /// Terrain surface height of a column.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        (self.height.get([x as f64, z as f64]) * HEIGHT_AMPLITUDE).floor() as i32
    }

    fn is_cave(&self, x: i32, y: i32, z: i32, surface: i32) -> bool {
        // keep a crust so caves do not open straight into the sea
        if y > surface - 3 || y < surface - CAVE_DEPTH {
            return false;
        }
        let value = self.caves.get([
            x as f64 * CAVE_SCALE_FACTOR,
            y as f64 * CAVE_SCALE_FACTOR * 1.5,
            z as f64 * CAVE_SCALE_FACTOR,
        ]);
        value > CAVE_THRESHOLD.0 && value < CAVE_THRESHOLD.1
    }

    /// Deterministic per-column roll for lava pools.
    fn has_lava_pool(&self, x: i32, z: i32) -> bool {
        let hash = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ u64::from(self.seed);
        fastrand::Rng::with_seed(hash).u32(0..LAVA_RARITY) == 0
    }

    fn block_at(&self, x: i32, y: i32, z: i32, surface: i32, lava: bool) -> Block {
        let palette = &self.palette;
        if y > surface {
            return if y <= SEA_LEVEL { palette.water } else { Block::AIR };
        }
        if self.is_cave(x, y, z, surface) {
            return Block::AIR;
        }
        if y == surface {
            if lava {
                palette.lava
            } else if surface <= SEA_LEVEL + 1 {
                palette.sand
            } else {
                palette.grass
            }
        } else if y > surface - 4 {
            if surface <= SEA_LEVEL + 1 {
                palette.sand
            } else {
                palette.dirt
            }
        } else {
            palette.stone
        }
    }
}

impl TerrainGenerator for NoiseTerrainGenerator {
    fn generate(&self, origin: Point3<i32>) -> Vec<Block> {
        let mut blocks = vec![Block::AIR; CHUNK_SIZE as usize];
        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                let (wx, wz) = (origin.x + x, origin.z + z);
                let surface = self.surface_height(wx, wz);
                let lava = surface > SEA_LEVEL + 1 && self.has_lava_pool(wx, wz);
                for y in 0..CHUNK_DIMENSION {
                    blocks[local_index(x, y, z)] = self.block_at(wx, origin.y + y, wz, surface, lava);
                }
            }
        }
        blocks
    }
}

/// Horizontal layers: grass at `height - 1`, two layers of dirt below it, stone
/// underneath and air from `height` up.
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrainGenerator {
    /// First air layer
    pub height: i32,
    /// Top layer
    pub grass: Block,
    /// Middle layers
    pub dirt: Block,
    /// Everything below
    pub stone: Block,
}

impl FlatTerrainGenerator {
    /// A flat world using the registry's grass, dirt and stone.
    pub fn new(height: i32, materials: &MaterialRegistry) -> Self {
        let palette = Palette::resolve(materials);
        FlatTerrainGenerator {
            height,
            grass: palette.grass,
            dirt: palette.dirt,
            stone: palette.stone,
        }
    }

    fn block_at(&self, y: i32) -> Block {
        if y >= self.height {
            Block::AIR
        } else if y == self.height - 1 {
            self.grass
        } else if y >= self.height - 3 {
            self.dirt
        } else {
            self.stone
        }
    }
}

impl TerrainGenerator for FlatTerrainGenerator {
    fn generate(&self, origin: Point3<i32>) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(CHUNK_SIZE as usize);
        for _z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                let block = self.block_at(origin.y + y);
                blocks.extend(std::iter::repeat(block).take(CHUNK_DIMENSION as usize));
            }
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_generation_is_deterministic() {
        let materials = MaterialRegistry::default_materials();
        let a = NoiseTerrainGenerator::new(7, &materials);
        let b = NoiseTerrainGenerator::new(7, &materials);
        let origin = Point3::new(-32, 0, 64);
        let blocks = a.generate(origin);
        assert_eq!(blocks.len(), CHUNK_SIZE as usize);
        assert_eq!(blocks, b.generate(origin));
        assert!(blocks.iter().all(|block| !block.is_invalid()));
    }

    #[test]
    fn deep_chunks_are_mostly_stone_and_high_chunks_are_air() {
        let materials = MaterialRegistry::default_materials();
        let generator = NoiseTerrainGenerator::new(1, &materials);
        let stone = materials.get_by_name("stone").unwrap().block();

        let deep = generator.generate(Point3::new(0, -256, 0));
        let stone_count = deep.iter().filter(|&&b| b == stone).count();
        assert!(stone_count > deep.len() / 2);

        let sky = generator.generate(Point3::new(0, 256, 0));
        assert!(sky.iter().all(Block::is_air));
    }

    #[test]
    fn water_fills_up_to_sea_level() {
        let materials = MaterialRegistry::default_materials();
        let generator = NoiseTerrainGenerator::new(3, &materials);
        let water = materials.get_by_name("water").unwrap().block();
        assert!(water.is_translucent());

        for (x, z) in [(0, 0), (100, -40), (-500, 900)] {
            let surface = generator.surface_height(x, z);
            let above = generator.block_at(x, surface + 1, z, surface, false);
            if surface + 1 <= SEA_LEVEL {
                assert_eq!(above, water);
            } else {
                assert!(above.is_air());
            }
        }
    }

    #[test]
    fn flat_layers() {
        let materials = MaterialRegistry::default_materials();
        let generator = FlatTerrainGenerator::new(10, &materials);
        let blocks = generator.generate(Point3::new(0, 0, 0));

        assert_eq!(blocks[local_index(3, 9, 4)], generator.grass);
        assert_eq!(blocks[local_index(3, 8, 4)], generator.dirt);
        assert_eq!(blocks[local_index(31, 7, 31)], generator.dirt);
        assert_eq!(blocks[local_index(0, 6, 0)], generator.stone);
        assert!(blocks[local_index(0, 10, 0)].is_air());

        let below = generator.generate(Point3::new(0, -32, 0));
        assert!(below.iter().all(|&b| b == generator.stone));
    }
}
