//! Recursive crafting for the Nova agent.
//!
//! [`Crafter::craft`] makes sure the inventory holds a requested amount of an
//! item. The shortfall is produced with the first recipe the world offers;
//! missing ingredients are crafted first, depth first, and a required station
//! is located, placed from the inventory, or crafted and then placed.
//!
//! Resolution keeps an explicit [`CraftPlan`] stack, so a recipe cycle or an
//! over-deep chain fails with [`CraftError::ResourceMissing`] instead of
//! recursing forever.
//!
//! ```ignore
//! let crafter = Crafter::new(ctx);
//! let report = crafter.craft("crafting_table", 1).await?;
//! for step in &report.steps {
//!     println!("{} x{} ops", step.item, step.operations);
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod crafter;
pub mod error;
pub mod plan;
mod resolver;
pub mod smelt;
pub mod station;

pub use crafter::{CraftState, Crafter};
pub use error::{CraftError, CraftResult};
pub use plan::{CraftPlan, CraftReport, NodeStatus, PlanNode};
pub use smelt::{FUELS, FURNACE, ITEMS_PER_FUEL};
pub use station::{is_placement_spot, placement_spots, RING_OFFSETS};
