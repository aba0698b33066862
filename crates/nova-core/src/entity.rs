use serde::{Deserialize, Serialize};

use crate::{ItemId, Vec3};

/// Stable identifier for a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Player { username: String },
    Mob,
    /// Dropped item lying on the ground.
    Item { item: ItemId, count: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub position: Vec3,
}

/// Mob names treated as hostile threats (substring match, so `"zombie"` also
/// covers `"zombie_villager"`).
pub const HOSTILE_MOBS: &[&str] = &[
    "zombie",
    "skeleton",
    "creeper",
    "spider",
    "cave_spider",
    "enderman",
    "witch",
    "slime",
    "phantom",
    "drowned",
    "husk",
    "stray",
    "pillager",
    "vindicator",
    "ravager",
    "blaze",
    "ghast",
    "wither_skeleton",
    "piglin_brute",
];

impl Entity {
    pub fn is_hostile(&self) -> bool {
        matches!(self.kind, EntityKind::Mob) && HOSTILE_MOBS.iter().any(|m| self.name.contains(m))
    }

    pub fn is_dropped_item(&self) -> bool {
        matches!(self.kind, EntityKind::Item { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Player { username } => Some(username),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.username().unwrap_or(&self.name)
    }
}

/// Hostile entities within `radius` of `origin`, nearest first.
pub fn hostiles_near(entities: &[Entity], origin: Vec3, radius: f64) -> Vec<Entity> {
    let mut out: Vec<Entity> = entities
        .iter()
        .filter(|e| e.is_hostile() && e.position.distance(origin) <= radius)
        .cloned()
        .collect();
    out.sort_by(|a, b| {
        a.position
            .distance(origin)
            .total_cmp(&b.position.distance(origin))
            .then(a.id.cmp(&b.id))
    });
    out
}
