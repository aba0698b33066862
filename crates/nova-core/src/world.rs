use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BlockPos, Entity, EntityId, EquipSlot, Goal, Inventory, ItemId, Recipe, StationHandle, Vec3};

/// Failure reported by a world capability call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("goal unreachable: {0}")]
    Unreachable(String),

    #[error("world call timed out")]
    Timeout,

    #[error("world rejected the call: {0}")]
    Rejected(String),

    #[error("world state out of sync: {0}")]
    Desync(String),
}

pub type WorldResult<T> = std::result::Result<T, WorldError>;

/// A block as currently observed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub pos: BlockPos,
    pub id: ItemId,
}

impl Block {
    pub fn is_air(&self) -> bool {
        self.id.is_air()
    }

    /// Something an entity can stand on.
    pub fn is_solid(&self) -> bool {
        !self.id.is_air() && !self.id.is_liquid()
    }
}

/// Body state of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub position: Vec3,
    /// Heading in radians; `0` faces -Z.
    pub yaw: f64,
    pub health: f32,
    pub food: f32,
    #[serde(default)]
    pub sleeping: bool,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            health: 20.0,
            food: 20.0,
            sleeping: false,
        }
    }
}

/// An open container (chest, furnace). Must be closed when done.
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    fn contents(&self) -> Inventory;

    async fn deposit(&mut self, item: &ItemId, count: u32) -> WorldResult<()>;

    async fn withdraw(&mut self, item: &ItemId, count: u32) -> WorldResult<()>;

    async fn close(self: Box<Self>);
}

/// The capability surface the agent core drives.
///
/// Async methods may suspend the calling task until the world resolves them.
/// Synchronous methods are snapshot queries; their results are only valid
/// until the next suspension.
#[async_trait]
pub trait WorldInterface: Send + Sync {
    async fn move_to(&self, goal: &Goal) -> WorldResult<()>;

    /// Abort any in-progress movement.
    fn stop_movement(&self);

    /// Start attacking `target`. Returns once the attack has started; its end
    /// is signalled separately (attack-ended notification).
    async fn attack(&self, target: EntityId) -> WorldResult<()>;

    fn stop_attack(&self);

    async fn break_block(&self, pos: BlockPos) -> WorldResult<()>;

    /// Place `item` against the `face` of `anchor` (new block lands at
    /// `anchor + face`).
    async fn place_block(&self, anchor: BlockPos, face: BlockPos, item: &ItemId) -> WorldResult<()>;

    async fn equip(&self, item: &ItemId, slot: EquipSlot) -> WorldResult<()>;

    /// Equip the best available tool for breaking `block`.
    async fn equip_for_block(&self, block: &Block) -> WorldResult<()>;

    /// Eat or drink the item in hand.
    async fn consume(&self) -> WorldResult<()>;

    /// Lie down in the bed at `bed`.
    async fn sleep(&self, bed: BlockPos) -> WorldResult<()>;

    async fn wake(&self) -> WorldResult<()>;

    async fn open_container(&self, pos: BlockPos) -> WorldResult<Box<dyn ContainerHandle>>;

    fn recipes_for(&self, item: &ItemId, desired: u32) -> Vec<Recipe>;

    /// Perform `recipe` `operations` times, at `station` when given.
    async fn craft_recipe(
        &self,
        recipe: &Recipe,
        operations: u32,
        station: Option<&StationHandle>,
    ) -> WorldResult<()>;

    fn inventory(&self) -> Inventory;

    fn nearby_entities(&self, radius: f64) -> Vec<Entity>;

    fn entity(&self, id: EntityId) -> Option<Entity>;

    fn player(&self, username: &str) -> Option<Entity>;

    fn block_at(&self, pos: BlockPos) -> Option<Block>;

    /// Positions of blocks matching any of `matching` within `max_distance`,
    /// nearest first, at most `max_count`.
    fn find_blocks(&self, matching: &[ItemId], max_distance: u32, max_count: usize) -> Vec<BlockPos>;

    fn status(&self) -> AgentStatus;
}

pub type SharedWorld = Arc<dyn WorldInterface>;
