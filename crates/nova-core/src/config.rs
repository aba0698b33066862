//! Agent configuration loading and management.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ItemId;

/// Main agent configuration, loaded from a YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Combat and defensive behaviour
    pub combat: CombatConfig,

    /// Movement and following
    pub navigation: NavigationConfig,

    /// Block search and mining bounds
    pub mining: MiningConfig,

    /// Crafting resolver bounds
    pub crafting: CraftingConfig,

    /// Eating, sleeping and the vitals warnings
    pub survival: SurvivalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Melee reach; the defend loop scans `attack_range + 5`
    pub attack_range: f64,

    /// At or below this health the defend loop flees
    pub flee_health_threshold: f32,

    /// Defend poll interval in milliseconds
    pub defend_interval_ms: u64,

    /// How far past the threat centroid the escape point is projected
    pub flee_scale: f64,

    /// Radius scanned for threats when fleeing
    pub threat_radius: f64,

    /// Radius scanned by `attack_nearest_hostile`
    pub hostile_search_radius: f64,
}

fn default_attack_range() -> f64 {
    3.0
}
fn default_flee_health_threshold() -> f32 {
    6.0
}
fn default_defend_interval_ms() -> u64 {
    500
}
fn default_flee_scale() -> f64 {
    2.0
}
fn default_threat_radius() -> f64 {
    32.0
}
fn default_hostile_search_radius() -> f64 {
    16.0
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_range: default_attack_range(),
            flee_health_threshold: default_flee_health_threshold(),
            defend_interval_ms: default_defend_interval_ms(),
            flee_scale: default_flee_scale(),
            threat_radius: default_threat_radius(),
            hostile_search_radius: default_hostile_search_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Distance kept from a followed entity
    pub follow_tolerance: f64,

    /// Follow re-evaluation interval in milliseconds
    pub follow_tick_ms: u64,

    /// Blocks within this distance can be interacted with without walking
    pub interaction_radius: f64,
}

fn default_follow_tolerance() -> f64 {
    2.0
}
fn default_follow_tick_ms() -> u64 {
    250
}
fn default_interaction_radius() -> f64 {
    4.0
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            follow_tolerance: default_follow_tolerance(),
            follow_tick_ms: default_follow_tick_ms(),
            interaction_radius: default_interaction_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Upper bound for a single `mine_blocks` request
    pub max_count: u32,

    /// Block search radius cap
    pub search_radius: u32,

    /// Block search result cap
    pub max_results: usize,

    /// Upper bound for strip-mine length
    pub strip_max_length: u32,

    /// Upper bound for ore search
    pub ore_max_blocks: u32,

    /// Search radius used by ore search
    pub ore_search_radius: u32,

    /// Dropped items within this distance of a broken block are collected
    pub collect_radius: f64,

    /// Wait for drops to settle before collecting
    pub collect_delay_ms: u64,

    /// Pause between single-block iterations
    pub step_delay_ms: u64,

    /// Pause between strip-mine steps
    pub strip_step_delay_ms: u64,

    /// Blocks never broken by strip mining
    pub disallowed: Vec<ItemId>,
}

fn default_max_count() -> u32 {
    64
}
fn default_search_radius() -> u32 {
    32
}
fn default_max_results() -> usize {
    10
}
fn default_strip_max_length() -> u32 {
    30
}
fn default_ore_max_blocks() -> u32 {
    10
}
fn default_ore_search_radius() -> u32 {
    24
}
fn default_collect_radius() -> f64 {
    3.0
}
fn default_collect_delay_ms() -> u64 {
    300
}
fn default_step_delay_ms() -> u64 {
    100
}
fn default_strip_step_delay_ms() -> u64 {
    50
}
fn default_disallowed() -> Vec<ItemId> {
    ["air", "cave_air", "bedrock", "water", "lava"]
        .into_iter()
        .map(ItemId::from)
        .collect()
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            search_radius: default_search_radius(),
            max_results: default_max_results(),
            strip_max_length: default_strip_max_length(),
            ore_max_blocks: default_ore_max_blocks(),
            ore_search_radius: default_ore_search_radius(),
            collect_radius: default_collect_radius(),
            collect_delay_ms: default_collect_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
            strip_step_delay_ms: default_strip_step_delay_ms(),
            disallowed: default_disallowed(),
        }
    }
}

impl MiningConfig {
    pub fn is_disallowed(&self, id: &ItemId) -> bool {
        self.disallowed.contains(id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftingConfig {
    /// Search radius for an existing station
    pub station_search_radius: u32,

    /// Maximum recursion depth of the resolver
    pub max_depth: usize,

    /// Logical smelting time per item, in seconds
    pub smelt_seconds_per_item: u64,
}

fn default_station_search_radius() -> u32 {
    32
}
fn default_max_depth() -> usize {
    16
}
fn default_smelt_seconds_per_item() -> u64 {
    10
}

impl Default for CraftingConfig {
    fn default() -> Self {
        Self {
            station_search_radius: default_station_search_radius(),
            max_depth: default_max_depth(),
            smelt_seconds_per_item: default_smelt_seconds_per_item(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Eat automatically when food drops to `eat_below`
    pub auto_eat: bool,

    /// Food level (out of 20) at or below which auto-eat kicks in
    pub eat_below: f32,

    /// Food level at or below which hunger is reported
    pub low_food_warning: f32,

    /// Health level at or below which health is reported
    pub low_health_warning: f32,

    /// Search radius for a bed
    pub bed_search_radius: u32,
}

fn default_auto_eat() -> bool {
    true
}
fn default_eat_below() -> f32 {
    14.0
}
fn default_low_food_warning() -> f32 {
    6.0
}
fn default_low_health_warning() -> f32 {
    6.0
}
fn default_bed_search_radius() -> u32 {
    32
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            auto_eat: default_auto_eat(),
            eat_below: default_eat_below(),
            low_food_warning: default_low_food_warning(),
            low_health_warning: default_low_health_warning(),
            bed_search_radius: default_bed_search_radius(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
