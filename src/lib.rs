#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! Chunked voxel terrain with background generation and face meshing.
//!
//! The world is split into 32³ chunks that are created lazily around the viewer,
//! filled by a procedural generator on a terrain worker thread, and meshed into
//! per-material, per-side vertex buckets with ambient occlusion and edge flags.
//! Mesh jobs are versioned so results that were outdated by an edit while in flight
//! are discarded.
//!
//! ## Key Modules
//!
//! * `core` - Shared-ownership containers used throughout the crate
//! * `engine_state` - The world, its chunks, the terrain worker and the mesher
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() {
//!     voxel_world::run();
//! }
//! ```

use std::{sync::Arc, time::Duration};

use cgmath::{Point3, Vector3};
use log::info;

use engine_state::{
    config::WorldConfig,
    voxels::{block::material::MaterialRegistry, generation::NoiseTerrainGenerator},
    EngineState,
};

pub mod core;
pub mod engine_state;

pub use engine_state::voxels::{block::Block, chunk::Chunk, world::World};

/// Environment variable naming a JSON file with a [`WorldConfig`].
pub const CONFIG_ENV_VAR: &str = "VOXEL_WORLD_CONFIG";

const DEMO_FRAMES: u64 = 600;
const DEMO_FRAME_TIME: Duration = Duration::from_millis(16);
const STATS_INTERVAL: u64 = 120;

/// Initialises the `env_logger` backend, filtered by `RUST_LOG`.
///
/// Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();
}

/// Reads the configuration named by [`CONFIG_ENV_VAR`], falling back to defaults.
pub fn load_config() -> WorldConfig {
    let Ok(path) = std::env::var(CONFIG_ENV_VAR) else {
        return WorldConfig::default();
    };
    let parsed = std::fs::read_to_string(&path)
        .map_err(|err| err.to_string())
        .and_then(|json| WorldConfig::from_json_str(&json).map_err(|err| err.to_string()));
    match parsed {
        Ok(config) => {
            info!("Loaded world config from {}", path);
            config
        }
        Err(err) => {
            log::error!("Failed to load world config from {}: {}", path, err);
            WorldConfig::default()
        }
    }
}

/// Runs a headless fly-over of a procedurally generated world and logs statistics.
pub fn run() {
    init_logging();
    info!("Logger initialized");

    let config = load_config();
    let materials = Arc::new(MaterialRegistry::default_materials());
    let generator = Arc::new(NoiseTerrainGenerator::new(config.seed, &materials));
    let mut engine_state = EngineState::new(
        config,
        materials,
        generator,
        Point3::new(0.0, 48.0, 0.0),
        Vector3::new(12.0, 0.0, 6.0),
    );

    for frame in 1..=DEMO_FRAMES {
        engine_state.process_frame(DEMO_FRAME_TIME);
        if frame % STATS_INTERVAL == 0 {
            engine_state.log_stats();
        }
    }

    let settle_start = web_time::Instant::now();
    while !engine_state.world.is_idle() && settle_start.elapsed() < Duration::from_secs(10) {
        engine_state.process_frame(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(1));
    }
    info!(
        "World settled after {:.2?} (idle: {})",
        settle_start.elapsed(),
        engine_state.world.is_idle()
    );
    engine_state.log_stats();
}
