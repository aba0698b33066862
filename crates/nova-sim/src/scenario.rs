use std::path::Path;

use anyhow::{Context, Result};
use nova_core::{AgentStatus, Block, BlockPos, Entity, Inventory, ItemId, Recipe};
use serde::{Deserialize, Serialize};

/// Declarative description of a simulated world, loadable from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub agent: AgentStatus,

    /// Flat floor generated around the origin.
    pub ground: Option<Ground>,

    pub blocks: Vec<Block>,

    pub entities: Vec<Entity>,

    pub inventory: Inventory,

    pub recipes: Vec<Recipe>,

    /// Furnace conversions (input → output).
    pub smelting: Vec<(ItemId, ItemId)>,

    /// Points `move_to` refuses to reach (compared by block).
    pub unreachable: Vec<BlockPos>,

    /// Blocks whose breaking is rejected.
    pub unbreakable: Vec<BlockPos>,

    /// Recipes (by result) whose crafting is rejected.
    pub failing_crafts: Vec<ItemId>,

    /// Broken blocks drop item entities instead of going straight to the
    /// inventory.
    pub drops: bool,

    /// Beds refuse to be slept in during the day.
    pub daytime: bool,

    pub timings: Timings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ground {
    pub y: i32,
    pub id: ItemId,
    pub radius: i32,
}

/// Logical duration of each suspending call, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub move_ms: u64,
    pub break_ms: u64,
    pub place_ms: u64,
    pub craft_ms: u64,
    pub eat_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            move_ms: 100,
            break_ms: 50,
            place_ms: 20,
            craft_ms: 10,
            eat_ms: 1600,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;
        let scenario: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario from {}", path.display()))?;
        Ok(scenario)
    }

    pub fn with_ground(mut self, y: i32, id: &str, radius: i32) -> Self {
        self.ground = Some(Ground {
            y,
            id: ItemId::from(id),
            radius,
        });
        self
    }

    pub fn with_block(mut self, pos: BlockPos, id: &str) -> Self {
        self.blocks.push(Block {
            pos,
            id: ItemId::from(id),
        });
        self
    }

    pub fn with_item(mut self, id: &str, count: u32) -> Self {
        self.inventory.add(ItemId::from(id), count);
        self
    }

    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.recipes.push(recipe);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }
}
