use std::future::Future;
use std::pin::Pin;

use nova_core::{BlockPos, Goal, ItemId, Recipe, StationHandle};
use nova_skills::{RunToken, SkillContext};
use nova_supervisor::DriveLease;

use crate::{CraftError, CraftPlan, CraftResult};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How close to walk to a station before using it.
const STATION_APPROACH: f64 = 2.0;

/// State of one `craft` or `smelt` call while it holds the drive lock.
pub(crate) struct Resolver<'a> {
    pub(crate) ctx: &'a SkillContext,
    lease: DriveLease,
    token: RunToken,
    pub(crate) plan: CraftPlan,
    /// Stations found or placed during this call.
    pub(crate) stations: Vec<StationHandle>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(ctx: &'a SkillContext, lease: DriveLease, token: RunToken) -> Self {
        Self {
            ctx,
            lease,
            token,
            plan: CraftPlan::new(ctx.config.crafting.max_depth),
            stations: Vec::new(),
        }
    }

    pub(crate) fn token(&self) -> &RunToken {
        &self.token
    }

    pub(crate) fn checkpoint(&self) -> CraftResult<()> {
        self.lease.checkpoint(self.token.stop_flag())?;
        Ok(())
    }

    /// Make sure at least `count` of `item` is in the inventory, crafting the
    /// shortfall and, recursively, its ingredients.
    pub(crate) fn resolve<'s>(&'s mut self, item: &'s ItemId, count: u32) -> BoxFuture<'s, CraftResult<()>> {
        Box::pin(async move {
            let on_hand = self.ctx.world.inventory().count(item.as_str());
            if on_hand >= count {
                return Ok(());
            }
            self.checkpoint()?;

            let needed = count - on_hand;
            self.plan.push(item.clone(), needed)?;
            let result = self.craft_node(item, needed).await;
            match &result {
                Ok(()) => self.plan.complete(),
                Err(err) => {
                    tracing::debug!(%item, %err, "craft step failed");
                    self.plan.fail();
                }
            }
            result
        })
    }

    async fn craft_node(&mut self, item: &ItemId, needed: u32) -> CraftResult<()> {
        let ctx = self.ctx;
        // The first recipe is committed to; there is no backtracking.
        let Some(recipe) = ctx.world.recipes_for(item, needed).into_iter().next() else {
            tracing::debug!(%item, "no recipe");
            return Err(CraftError::missing(item));
        };
        let operations = recipe.operations_for(needed);
        self.plan.set_operations(operations);
        tracing::debug!(
            %item,
            needed,
            operations,
            depth = self.plan.depth(),
            "resolving recipe"
        );

        // A later ingredient's sub-chain may consume an earlier one, so check
        // everything twice against fresh inventory.
        self.gather(&recipe, operations).await?;
        self.gather(&recipe, operations).await?;

        let station = match &recipe.station {
            Some(station) => {
                let handle = self.station(station).await?;
                // Crafting the station may have used up ingredients.
                self.gather(&recipe, operations).await?;
                self.walk_to(handle.pos).await?;
                Some(handle)
            }
            None => None,
        };

        self.checkpoint()?;
        self.plan.mark_in_progress();
        ctx.world
            .craft_recipe(&recipe, operations, station.as_ref())
            .await
            .map_err(CraftError::world(item))?;
        tracing::info!(%item, operations, yield_count = recipe.yield_count, "crafted");
        Ok(())
    }

    async fn gather(&mut self, recipe: &Recipe, operations: u32) -> CraftResult<()> {
        for (ingredient, per_op) in &recipe.ingredients {
            // More than an inventory can ever hold.
            let count = per_op
                .checked_mul(operations)
                .ok_or_else(|| CraftError::missing(ingredient))?;
            self.resolve(ingredient, count).await?;
        }
        Ok(())
    }

    /// Walk within reach of `pos`. Navigation failures are logged; the
    /// following world call reports whether reach was enough.
    pub(crate) async fn walk_to(&self, pos: BlockPos) -> CraftResult<()> {
        let world = &self.ctx.world;
        let target = pos.center();
        if world.status().position.distance(target) <= self.ctx.config.navigation.interaction_radius {
            return Ok(());
        }
        let goal = Goal::near_point(target, STATION_APPROACH);
        self.lease.set_goal(goal);
        if let Err(err) = world.move_to(&goal).await {
            tracing::debug!(%pos, %err, "could not reach station");
        }
        self.lease.clear_goal();
        self.checkpoint()
    }
}
