use nova_core::ItemId;

use crate::{CraftError, CraftResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NodeStatus {
    /// Recipe chosen, ingredients being gathered.
    Pending,
    /// Craft call issued.
    InProgress,
    Satisfied,
    Failed,
}

/// One item the resolver is producing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlanNode {
    pub item: ItemId,
    /// Shortfall at the time the node was opened.
    pub needed: u32,
    /// Recipe operations required to cover `needed`.
    pub operations: u32,
    pub status: NodeStatus,
}

/// Working stack of the resolver for a single `craft` call.
///
/// The stack holds the chain from the requested item down to the ingredient
/// currently being produced. An item already on the stack cannot be pushed
/// again (cycle), and the stack never grows beyond `max_depth`.
#[derive(Debug)]
pub struct CraftPlan {
    stack: Vec<PlanNode>,
    finished: Vec<PlanNode>,
    max_depth: usize,
}

impl CraftPlan {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            finished: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_open(&self, item: &ItemId) -> bool {
        self.stack.iter().any(|n| &n.item == item)
    }

    pub fn push(&mut self, item: ItemId, needed: u32) -> CraftResult<()> {
        if self.is_open(&item) {
            tracing::debug!(%item, "recipe cycle");
            return Err(CraftError::missing(&item));
        }
        if self.stack.len() >= self.max_depth {
            tracing::debug!(%item, depth = self.stack.len(), "recipe chain too deep");
            return Err(CraftError::missing(&item));
        }
        self.stack.push(PlanNode {
            item,
            needed,
            operations: 0,
            status: NodeStatus::Pending,
        });
        Ok(())
    }

    pub fn top(&self) -> Option<&PlanNode> {
        self.stack.last()
    }

    pub fn set_operations(&mut self, operations: u32) {
        if let Some(node) = self.stack.last_mut() {
            node.operations = operations;
        }
    }

    pub fn mark_in_progress(&mut self) {
        if let Some(node) = self.stack.last_mut() {
            node.status = NodeStatus::InProgress;
        }
    }

    pub fn complete(&mut self) {
        self.close(NodeStatus::Satisfied);
    }

    pub fn fail(&mut self) {
        self.close(NodeStatus::Failed);
    }

    fn close(&mut self, status: NodeStatus) {
        if let Some(mut node) = self.stack.pop() {
            node.status = status;
            self.finished.push(node);
        }
    }

    /// Every closed node in completion order.
    pub fn finished(&self) -> &[PlanNode] {
        &self.finished
    }

    pub fn into_report(self, item: ItemId, requested: u32) -> CraftReport {
        CraftReport {
            item,
            requested,
            steps: self
                .finished
                .into_iter()
                .filter(|n| n.status == NodeStatus::Satisfied)
                .collect(),
        }
    }
}

/// Result of a successful `craft` call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CraftReport {
    pub item: ItemId,
    pub requested: u32,
    /// Items crafted, deepest ingredient first.
    pub steps: Vec<PlanNode>,
}

impl CraftReport {
    /// `true` when the inventory already held enough.
    pub fn was_on_hand(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn operations(&self) -> u32 {
        self.steps.iter().map(|n| n.operations).sum()
    }
}
