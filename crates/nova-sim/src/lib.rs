//! Deterministic in-memory `WorldInterface` for tests, benches and the CLI.
//!
//! Suspending calls sleep on `tokio::time`, so tests running under paused time
//! see calls resolve in logical time order. Every call is recorded as a
//! [`WorldCall`] for assertions.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod scenario;
pub mod world;

pub use scenario::{Ground, Scenario, Timings};
pub use world::{SimWorld, WorldCall};

use nova_core::{Entity, EntityId, EntityKind, Vec3};

/// Hostile mob entity at `position`.
pub fn mob(id: u64, name: &str, position: Vec3) -> Entity {
    Entity {
        id: EntityId(id),
        name: name.to_string(),
        kind: EntityKind::Mob,
        position,
    }
}

/// Player entity at `position`.
pub fn player(id: u64, username: &str, position: Vec3) -> Entity {
    Entity {
        id: EntityId(id),
        name: "player".to_string(),
        kind: EntityKind::Player {
            username: username.to_string(),
        },
        position,
    }
}
