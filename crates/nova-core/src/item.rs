use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Item or block identifier (`"oak_log"`, `"crafting_table"`).
///
/// Blocks and items share one namespace: breaking a block yields the item with
/// the same id, and placing an item creates the block with the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalize user-facing names: lowercase, whitespace to underscores.
    pub fn normalized(name: &str) -> Self {
        let id = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id is air (no block).
    pub fn is_air(&self) -> bool {
        matches!(self.0.as_str(), "air" | "cave_air" | "void_air")
    }

    /// Whether this id is a liquid source.
    pub fn is_liquid(&self) -> bool {
        matches!(self.0.as_str(), "water" | "lava")
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Equipment slot for `WorldInterface::equip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    OffHand,
    Head,
    Torso,
    Legs,
    Feet,
}
