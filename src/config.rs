use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_HEIGHT: usize = 64;
pub const BLOCK_SIZE: f32 = 1.0;
pub const RENDER_DISTANCE: i32 = 4;

pub const SAVE_FORMAT_VERSION: u32 = 3;
pub const SAVE_STORAGE_KEY: &str = "voxel-sandbox.save";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub sea_level: i32,
    pub snow_line: i32,
    /// Coal replaces stone where the ore hash exceeds this value.
    pub ore_threshold: f64,
    /// Ore only appears at `y <= sea_level - ore_max_y_below_sea`.
    pub ore_max_y_below_sea: i32,
    /// A grass column grows a tree where the tree hash reaches this value.
    pub tree_threshold: f64,
    pub canopy_radius: i32,
    pub min_trunk_height: i32,
    pub max_trunk_height: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sea_level: 20,
            snow_line: 36,
            ore_threshold: 0.86,
            ore_max_y_below_sea: 2,
            tree_threshold: 0.975,
            canopy_radius: 2,
            min_trunk_height: 4,
            max_trunk_height: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobConfig {
    pub max_count: usize,
    pub min_spawn_distance: f32,
    pub spawn_radius: f32,
    pub despawn_radius: f32,
    pub spawn_attempts: u32,
    pub retry_cooldown: f32,
    pub min_spawn_interval: f32,
    pub max_spawn_interval: f32,
    pub walk_speed: f32,
    pub float_height: f32,
}

impl Default for MobConfig {
    fn default() -> Self {
        Self {
            max_count: 10,
            min_spawn_distance: 12.0,
            spawn_radius: 32.0,
            despawn_radius: 96.0,
            spawn_attempts: 6,
            retry_cooldown: 1.0,
            min_spawn_interval: 5.0,
            max_spawn_interval: 10.0,
            walk_speed: 1.4,
            float_height: 0.45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunks kept loaded on each side of the focal chunk.
    pub render_distance: i32,
    /// `None` picks a random seed when the world is created.
    pub seed: Option<u32>,
    pub generation: GenerationConfig,
    pub mobs: MobConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            render_distance: RENDER_DISTANCE,
            seed: None,
            generation: GenerationConfig::default(),
            mobs: MobConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn with_render_distance(mut self, render_distance: i32) -> Self {
        self.render_distance = render_distance.max(0);
        self
    }
}
