use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ItemId;

/// Snapshot of the agent's inventory (item id → total count).
///
/// A snapshot is only valid until the next suspending world call; callers
/// re-query instead of holding one across `.await`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<ItemId, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.count(item) > 0
    }

    pub fn add(&mut self, item: ItemId, count: u32) {
        if count == 0 {
            return;
        }
        let held = self.items.entry(item).or_insert(0);
        *held = held.saturating_add(count);
    }

    /// Remove up to `count` units; returns how many were removed.
    pub fn remove(&mut self, item: &str, count: u32) -> u32 {
        let Some(have) = self.items.get_mut(item) else {
            return 0;
        };
        let taken = (*have).min(count);
        *have -= taken;
        if *have == 0 {
            self.items.remove(item);
        }
        taken
    }

    /// First id from `candidates` present in the inventory.
    pub fn first_of<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.contains(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, u32)> {
        self.items.iter().map(|(k, v)| (k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<(ItemId, u32)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (ItemId, u32)>>(iter: T) -> Self {
        let mut inv = Inventory::new();
        for (item, count) in iter {
            inv.add(item, count);
        }
        inv
    }
}
