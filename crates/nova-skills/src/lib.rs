//! Skill state machines: pathfinding, combat, mining and survival.
//!
//! Every skill is a cheap cloneable handle. Operations acquire the drive lock
//! from the shared [`nova_supervisor::Supervisor`], run until done, stopped or
//! preempted, and release it. Failures are logged and folded into the
//! operation's return value.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod combat;
pub mod error;
pub mod mining;
pub mod pathfinding;
pub mod skill;
pub mod survival;

pub use combat::{Combat, CombatState, WEAPONS};
pub use error::{SkillError, SkillResult};
pub use mining::{Mining, MiningState, StripMineReport, LOGS, ORES};
pub use pathfinding::{PathState, Pathfinding};
pub use skill::{RunSlot, RunToken, Skill, SkillContext};
pub use survival::{Survival, SurvivalState, Vitals, ARMOR, BEDS, FOODS};
