use serde::{Deserialize, Serialize};

use crate::{BlockPos, ItemId};

/// One crafting recipe as reported by the world's recipe book.
///
/// Counts are per operation: one operation consumes every ingredient once and
/// yields `yield_count` units of `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub result: ItemId,
    #[serde(default = "default_yield")]
    pub yield_count: u32,
    #[serde(default)]
    pub ingredients: Vec<(ItemId, u32)>,
    /// Station block required to perform the recipe (`None`: inventory grid).
    #[serde(default)]
    pub station: Option<ItemId>,
}

fn default_yield() -> u32 {
    1
}

impl Recipe {
    pub fn new(result: impl Into<ItemId>, yield_count: u32) -> Self {
        Self {
            result: result.into(),
            yield_count,
            ingredients: Vec::new(),
            station: None,
        }
    }

    pub fn with_ingredient(mut self, item: impl Into<ItemId>, count: u32) -> Self {
        self.ingredients.push((item.into(), count));
        self
    }

    pub fn with_station(mut self, station: impl Into<ItemId>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn requires_station(&self) -> bool {
        self.station.is_some()
    }

    /// Operations needed to produce at least `needed` units (ceiling division).
    pub fn operations_for(&self, needed: u32) -> u32 {
        let per_op = self.yield_count.max(1);
        needed.div_ceil(per_op)
    }
}

/// A located or freshly placed crafting station.
///
/// Only valid for the craft call that produced it; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationHandle {
    pub station: ItemId,
    pub pos: BlockPos,
}
