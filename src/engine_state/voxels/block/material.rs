//! # Material Module
//!
//! Ordered tables of opaque and translucent materials, indexed by the signed block
//! index. The registry is populated once at startup and read-only afterwards, so it
//! is shared with the terrain worker behind a plain `Arc` with no locking.
//!
//! Materials can be built in code, taken from [`MaterialRegistry::default_materials`],
//! or loaded from a JSON document:
//!
//! ```json
//! {
//!   "opaque": [
//!     { "name": "stone", "all_faces": { "shader": "terrain", "albedo": "stone.png" } },
//!     { "name": "lava", "spawns_light_sources": true,
//!       "all_faces": { "shader": "terrain-emissive", "albedo": "lava.png" } }
//!   ],
//!   "translucent": [
//!     { "name": "water", "all_faces": { "shader": "water", "translucency": 0.7 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::{block_side::BlockSide, Block, BlockTypeSize};

/// Rendering parameters for one face direction of a material.
///
/// The meshing pipeline only treats these as opaque identifiers; they are carried so
/// the renderer can bind the right shader and textures per mesh bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderMaterial {
    /// Name of the shader program used for this face
    pub shader: String,
    /// Albedo texture path
    pub albedo: String,
    /// Normal map texture path
    pub normal: String,
    /// Metallic factor in 0..1
    pub metallic: f32,
    /// Reflectivity factor in 0..1
    pub reflectivity: f32,
    /// Translucency in 0..1, only meaningful for translucent materials
    pub translucency: f32,
    /// World units covered by one texture repeat
    pub texture_scale: f32,
}

impl Default for RenderMaterial {
    fn default() -> Self {
        RenderMaterial {
            shader: "terrain".to_string(),
            albedo: String::new(),
            normal: String::new(),
            metallic: 0.0,
            reflectivity: 0.0,
            translucency: 0.0,
            texture_scale: 1.0,
        }
    }
}

/// A registry entry. Immutable once registered.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Display name, unique within the registry
    pub name: String,
    /// Signed block index: 1, 2, 3, … for opaque, −1, −2, −3, … for translucent
    pub index: BlockTypeSize,
    /// One render material per face, indexed by [`BlockSide::index`]
    pub render_materials: [RenderMaterial; 6],
    /// Whether exposed blocks of this material register light-fountain positions
    pub spawns_light_sources: bool,
}

impl Material {
    /// `true` if blocks of this material are translucent.
    pub fn is_translucent(&self) -> bool {
        self.index < 0
    }

    /// A block of this material.
    pub fn block(&self) -> Block {
        Block::new(self.index)
    }

    /// The render material used for the given face direction.
    pub fn render_material(&self, side: BlockSide) -> &RenderMaterial {
        &self.render_materials[side.index()]
    }
}

/// JSON description of a single material.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDefinition {
    /// Display name
    pub name: String,
    /// Light-fountain flag
    pub spawns_light_sources: bool,
    /// Render material applied to every face not listed in `faces`
    pub all_faces: RenderMaterial,
    /// Optional per-face overrides in [`BlockSide`] index order
    pub faces: Option<[RenderMaterial; 6]>,
}

/// JSON description of a whole registry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Opaque materials, indexed 1, 2, 3, … in order
    pub opaque: Vec<MaterialDefinition>,
    /// Translucent materials, indexed −1, −2, −3, … in order
    pub translucent: Vec<MaterialDefinition>,
}

/// Ordered opaque and translucent material tables.
#[derive(Clone, Debug, Default)]
pub struct MaterialRegistry {
    opaque: Vec<Material>,
    translucent: Vec<Material>,
}

impl MaterialRegistry {
    /// Largest number of materials per table; index 127 is the invalid sentinel.
    pub const MAX_MATERIALS_PER_TABLE: usize = (Block::INVALID_INDEX - 1) as usize;

    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a parsed configuration.
    ///
    /// Fails if either table lists more than [`Self::MAX_MATERIALS_PER_TABLE`]
    /// materials.
    pub fn from_config(config: MaterialConfig) -> Result<Self, serde_json::Error> {
        for (table, len) in [("opaque", config.opaque.len()), ("translucent", config.translucent.len())] {
            if len > Self::MAX_MATERIALS_PER_TABLE {
                return Err(serde::de::Error::custom(format!(
                    "{} {} materials listed, at most {} are allowed",
                    len,
                    table,
                    Self::MAX_MATERIALS_PER_TABLE
                )));
            }
        }

        let mut registry = Self::new();
        for definition in config.opaque {
            let faces = definition
                .faces
                .unwrap_or_else(|| std::array::from_fn(|_| definition.all_faces.clone()));
            registry.add_opaque(&definition.name, faces, definition.spawns_light_sources);
        }
        for definition in config.translucent {
            let faces = definition
                .faces
                .unwrap_or_else(|| std::array::from_fn(|_| definition.all_faces.clone()));
            registry.add_translucent(&definition.name, faces, definition.spawns_light_sources);
        }
        Ok(registry)
    }

    /// Parses a registry from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let config: MaterialConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// The built-in material set used by the default terrain generator.
    pub fn default_materials() -> Self {
        let mut registry = Self::new();
        let uniform = |shader: &str, albedo: &str| -> [RenderMaterial; 6] {
            std::array::from_fn(|_| RenderMaterial {
                shader: shader.to_string(),
                albedo: albedo.to_string(),
                ..RenderMaterial::default()
            })
        };

        let mut grass = uniform("terrain", "textures/grass_side.png");
        grass[BlockSide::TOP.index()].albedo = "textures/grass_top.png".to_string();
        grass[BlockSide::BOTTOM.index()].albedo = "textures/dirt.png".to_string();

        registry.add_opaque("grass", grass, false);
        registry.add_opaque("dirt", uniform("terrain", "textures/dirt.png"), false);
        registry.add_opaque("stone", uniform("terrain", "textures/stone.png"), false);
        registry.add_opaque("sand", uniform("terrain", "textures/sand.png"), false);
        registry.add_opaque("lava", uniform("terrain-emissive", "textures/lava.png"), true);

        let mut water = uniform("water", "textures/water.png");
        for face in water.iter_mut() {
            face.translucency = 0.7;
            face.reflectivity = 0.4;
        }
        registry.add_translucent("water", water, false);

        let mut glass = uniform("glass", "textures/glass.png");
        for face in glass.iter_mut() {
            face.translucency = 0.9;
            face.reflectivity = 0.2;
        }
        registry.add_translucent("glass", glass, false);

        registry
    }

    /// Registers an opaque material and returns its index (1, 2, 3, …).
    ///
    /// # Panics
    /// Panics if the opaque table is full; the registry is set up once at startup so
    /// this is a configuration bug.
    pub fn add_opaque(
        &mut self,
        name: &str,
        render_materials: [RenderMaterial; 6],
        spawns_light_sources: bool,
    ) -> BlockTypeSize {
        assert!(
            self.opaque.len() < Self::MAX_MATERIALS_PER_TABLE,
            "too many opaque materials"
        );
        let index = (self.opaque.len() + 1) as BlockTypeSize;
        self.opaque.push(Material {
            name: name.to_string(),
            index,
            render_materials,
            spawns_light_sources,
        });
        index
    }

    /// Registers a translucent material and returns its index (−1, −2, −3, …).
    ///
    /// # Panics
    /// Panics if the translucent table is full.
    pub fn add_translucent(
        &mut self,
        name: &str,
        render_materials: [RenderMaterial; 6],
        spawns_light_sources: bool,
    ) -> BlockTypeSize {
        assert!(
            self.translucent.len() < Self::MAX_MATERIALS_PER_TABLE,
            "too many translucent materials"
        );
        let index = -((self.translucent.len() + 1) as BlockTypeSize);
        self.translucent.push(Material {
            name: name.to_string(),
            index,
            render_materials,
            spawns_light_sources,
        });
        index
    }

    /// Looks up a material by signed index. Air and the invalid sentinel have none.
    pub fn get(&self, index: BlockTypeSize) -> Option<&Material> {
        if index > 0 && index != Block::INVALID_INDEX {
            self.opaque.get(index as usize - 1)
        } else if index < 0 {
            self.translucent.get((-(index as i16)) as usize - 1)
        } else {
            None
        }
    }

    /// The material of a block, if it has one.
    pub fn get_for_block(&self, block: Block) -> Option<&Material> {
        self.get(block.mat)
    }

    /// Looks up a material by name.
    ///
    /// An unknown name is a configuration bug: it is logged as an error and `None`
    /// is returned.
    pub fn get_by_name(&self, name: &str) -> Option<&Material> {
        let found = self
            .opaque
            .iter()
            .chain(self.translucent.iter())
            .find(|material| material.name == name);
        if found.is_none() {
            log::error!("Unknown material '{}'", name);
        }
        found
    }

    /// Opaque materials in index order.
    pub fn opaque(&self) -> &[Material] {
        &self.opaque
    }

    /// Translucent materials in index order (−1 first).
    pub fn translucent(&self) -> &[Material] {
        &self.translucent
    }

    /// Whether the block's material flags light-fountain spawning.
    pub fn spawns_light_sources(&self, block: Block) -> bool {
        self.get_for_block(block)
            .map(|material| material.spawns_light_sources)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_assigned_sequentially() {
        let registry = MaterialRegistry::default_materials();
        let indices: Vec<_> = registry.opaque().iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        let indices: Vec<_> = registry.translucent().iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![-1, -2]);
    }

    #[test]
    fn lookup_by_index_and_name_agree() {
        let registry = MaterialRegistry::default_materials();
        let water = registry.get_by_name("water").unwrap();
        assert!(water.is_translucent());
        assert_eq!(registry.get(water.index), Some(water));
        assert!(registry.get(0).is_none());
        assert!(registry.get(Block::INVALID_INDEX).is_none());
        assert!(registry.get(100).is_none());
        assert!(registry.get_by_name("unobtainium").is_none());
    }

    #[test]
    fn light_source_flag_follows_material() {
        let registry = MaterialRegistry::default_materials();
        let lava = registry.get_by_name("lava").unwrap().block();
        let stone = registry.get_by_name("stone").unwrap().block();
        assert!(registry.spawns_light_sources(lava));
        assert!(!registry.spawns_light_sources(stone));
        assert!(!registry.spawns_light_sources(Block::AIR));
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "opaque": [
                { "name": "stone", "all_faces": { "albedo": "stone.png", "metallic": 0.1 } },
                { "name": "lava", "spawns_light_sources": true }
            ],
            "translucent": [ { "name": "water", "all_faces": { "translucency": 0.5 } } ]
        }"#;
        let registry = MaterialRegistry::from_json_str(json).unwrap();
        let stone = registry.get(1).unwrap();
        assert_eq!(stone.name, "stone");
        assert_eq!(stone.render_material(BlockSide::TOP).albedo, "stone.png");
        assert_eq!(stone.render_material(BlockSide::TOP).texture_scale, 1.0);
        assert!(registry.get(2).unwrap().spawns_light_sources);
        assert_eq!(registry.get(-1).unwrap().name, "water");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(MaterialRegistry::from_json_str("{ \"opaque\": 3 }").is_err());
    }

    #[test]
    fn oversized_tables_are_an_error() {
        let table = |count: usize| {
            (0..count)
                .map(|i| format!("{{ \"name\": \"m{}\" }}", i))
                .collect::<Vec<_>>()
                .join(",")
        };
        let full = MaterialRegistry::MAX_MATERIALS_PER_TABLE;

        let json = format!("{{ \"opaque\": [{}] }}", table(full));
        let registry = MaterialRegistry::from_json_str(&json).unwrap();
        assert_eq!(registry.opaque().len(), full);

        let json = format!("{{ \"opaque\": [{}] }}", table(full + 1));
        let err = MaterialRegistry::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("opaque"));

        let json = format!("{{ \"translucent\": [{}] }}", table(full + 1));
        assert!(MaterialRegistry::from_json_str(&json).is_err());
    }
}
