//! # World Configuration
//!
//! Tunables of the voxel world. Every field has a default, so a JSON document only
//! needs to name the values it changes.
//!
//! ```
//! use voxel_world::engine_state::config::WorldConfig;
//!
//! let config = WorldConfig::from_json_str(r#"{ "render_distance": 64.0, "seed": 9 }"#).unwrap();
//! assert_eq!(config.render_distance, 64.0);
//! assert_eq!(config.mesh_update_budget_ms, 5.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of the voxel world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal radius, in blocks, around the viewer that chunks are created for
    pub render_distance: f32,
    /// Time spent per frame on dirty-chunk updates before the rest waits for the next frame
    pub mesh_update_budget_ms: f32,
    /// How long the terrain worker waits for new work before re-checking its stop flag
    pub worker_idle_sleep_ms: u64,
    /// Vertical extent, in chunks above or below zero, beyond which generation aborts
    pub max_vertical_chunks: i32,
    /// Terrain seed
    pub seed: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            render_distance: 96.0,
            mesh_update_budget_ms: 5.0,
            worker_idle_sleep_ms: 1,
            max_vertical_chunks: 64,
            seed: 0,
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The per-frame dirty-chunk budget.
    pub fn mesh_update_budget(&self) -> Duration {
        Duration::from_micros((self.mesh_update_budget_ms.max(0.0) * 1000.0).round() as u64)
    }

    /// The worker's idle wait.
    pub fn worker_idle_sleep(&self) -> Duration {
        Duration::from_millis(self.worker_idle_sleep_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(WorldConfig::from_json_str("{}").unwrap(), WorldConfig::default());
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(WorldConfig::from_json_str(r#"{ "seed": "seven" }"#).is_err());
    }

    #[test]
    fn durations() {
        let config = WorldConfig {
            worker_idle_sleep_ms: 0,
            ..WorldConfig::default()
        };
        assert_eq!(config.worker_idle_sleep(), Duration::from_millis(1));
        assert_eq!(config.mesh_update_budget(), Duration::from_millis(5));
    }
}
