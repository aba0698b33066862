//! Shared vocabulary for the Nova agent: positions, goals, entities, recipes,
//! configuration and the `WorldInterface` the core drives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod entity;
pub mod goal;
pub mod inventory;
pub mod item;
pub mod math;
pub mod recipe;
pub mod world;

pub use config::{
    AgentConfig, CombatConfig, CraftingConfig, MiningConfig, NavigationConfig, SurvivalConfig,
};
pub use entity::{hostiles_near, Entity, EntityId, EntityKind, HOSTILE_MOBS};
pub use goal::{Goal, GoalKind, GoalTarget};
pub use inventory::Inventory;
pub use item::{EquipSlot, ItemId};
pub use math::{BlockPos, Vec3};
pub use recipe::{Recipe, StationHandle};
pub use world::{
    AgentStatus, Block, ContainerHandle, SharedWorld, WorldError, WorldInterface, WorldResult,
};
