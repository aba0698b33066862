use std::sync::Arc;

use nova_core::{ItemId, Recipe};
use nova_skills::{RunSlot, Skill, SkillContext};
use nova_supervisor::{Priority, SkillId};

use crate::resolver::Resolver;
use crate::{CraftError, CraftReport, CraftResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CraftState {
    #[default]
    Idle,
    Crafting(ItemId),
    Smelting(ItemId),
}

struct Inner {
    ctx: SkillContext,
    run: RunSlot<CraftState>,
}

/// Crafting and smelting at `Priority::Task`.
#[derive(Clone)]
pub struct Crafter {
    inner: Arc<Inner>,
}

impl Crafter {
    pub const ID: SkillId = SkillId("crafting");

    pub fn new(ctx: SkillContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                run: RunSlot::default(),
            }),
        }
    }

    pub fn state(&self) -> CraftState {
        self.inner.run.state()
    }

    /// Make sure the inventory holds `count` of `item`, crafting whatever is
    /// missing along the ingredient chain.
    ///
    /// Succeeds without touching the world when enough is already on hand.
    pub async fn craft(&self, item: &str, count: u32) -> CraftResult<CraftReport> {
        let ctx = &self.inner.ctx;
        let item = ItemId::normalized(item);
        if ctx.world.inventory().count(item.as_str()) >= count {
            tracing::info!(%item, count, "already on hand");
            return Ok(CraftReport {
                item,
                requested: count,
                steps: Vec::new(),
            });
        }

        let lease = ctx
            .supervisor
            .acquire(Self::ID, Priority::Task)
            .ok_or(CraftError::Busy)?;
        let token = self.inner.run.begin(CraftState::Crafting(item.clone()));
        tracing::info!(%item, count, "crafting");

        let mut resolver = Resolver::new(ctx, lease, token);
        let result = resolver.resolve(&item, count).await;
        self.inner.run.finish(resolver.token());

        match result {
            Ok(()) => {
                let report = resolver.plan.into_report(item, count);
                tracing::info!(
                    item = %report.item,
                    steps = report.steps.len(),
                    operations = report.operations(),
                    "craft complete"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(%item, %err, "craft failed");
                Err(err)
            }
        }
    }

    /// Smelt `count` of `input` in a furnace within the station radius.
    /// Returns how many output items were taken from the furnace.
    pub async fn smelt(&self, input: &str, count: u32) -> CraftResult<u32> {
        let ctx = &self.inner.ctx;
        let input = ItemId::normalized(input);
        if count == 0 {
            return Ok(0);
        }
        if ctx.world.inventory().count(input.as_str()) < count {
            tracing::warn!(%input, count, "not enough to smelt");
            return Err(CraftError::missing(&input));
        }

        let lease = ctx
            .supervisor
            .acquire(Self::ID, Priority::Task)
            .ok_or(CraftError::Busy)?;
        let token = self.inner.run.begin(CraftState::Smelting(input.clone()));

        let mut resolver = Resolver::new(ctx, lease, token);
        let result = resolver.smelt(&input, count).await;
        self.inner.run.finish(resolver.token());

        match &result {
            Ok(taken) => tracing::info!(%input, taken, "smelting complete"),
            Err(err) => tracing::warn!(%input, %err, "smelting failed"),
        }
        result
    }

    /// Recipes the world knows for `item`.
    pub fn recipes(&self, item: &str) -> Vec<Recipe> {
        self.inner
            .ctx
            .world
            .recipes_for(&ItemId::normalized(item), 1)
    }

    /// Whether the recipe book has a way to make `count` of `item`.
    pub fn can_craft(&self, item: &str, count: u32) -> bool {
        !self
            .inner
            .ctx
            .world
            .recipes_for(&ItemId::normalized(item), count)
            .is_empty()
    }
}

impl Skill for Crafter {
    fn id(&self) -> SkillId {
        Self::ID
    }

    fn priority(&self) -> Priority {
        Priority::Task
    }

    fn is_active(&self) -> bool {
        self.inner.run.is_active()
    }

    fn stop(&self) {
        self.inner.run.stop();
        if self.inner.ctx.supervisor.is_held_by(Self::ID) {
            self.inner.ctx.world.stop_movement();
        }
        tracing::info!(skill = %Self::ID, "stop requested");
    }
}
