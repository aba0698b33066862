use std::sync::Arc;
use std::time::Duration;

use nova_core::{BlockPos, EntityId, Goal, Vec3};
use nova_supervisor::{DriveLease, Priority, SkillId};

use crate::{RunSlot, RunToken, Skill, SkillContext, SkillError, SkillResult};

/// Tolerance for one-shot trips to an entity's current position.
const ENTITY_TOLERANCE: f64 = 2.0;

/// Tolerance for trips next to a block.
const BLOCK_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PathState {
    #[default]
    Idle,
    Navigating(Goal),
}

struct Inner {
    ctx: SkillContext,
    run: RunSlot<PathState>,
}

/// Goal-based navigation at `Priority::Navigation`.
#[derive(Clone)]
pub struct Pathfinding {
    inner: Arc<Inner>,
}

impl Pathfinding {
    pub const ID: SkillId = SkillId("pathfinding");

    pub fn new(ctx: SkillContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                run: RunSlot::default(),
            }),
        }
    }

    pub fn state(&self) -> PathState {
        self.inner.run.state()
    }

    /// Walk to `point`. A zero tolerance means standing on the exact block.
    pub async fn goto(&self, point: Vec3, tolerance: f64) -> bool {
        let goal = Goal::for_point(point, tolerance);
        self.report(goal, self.navigate(goal).await)
    }

    /// Walk to where `entity` currently is.
    pub async fn goto_entity(&self, entity: EntityId) -> bool {
        let Some(target) = self.inner.ctx.world.entity(entity) else {
            tracing::warn!(%entity, "entity not found");
            return false;
        };
        self.goto(target.position, ENTITY_TOLERANCE).await
    }

    pub async fn goto_player(&self, username: &str) -> bool {
        let Some(player) = self.inner.ctx.world.player(username) else {
            tracing::warn!(player = username, "player not visible");
            return false;
        };
        self.goto(player.position, ENTITY_TOLERANCE).await
    }

    /// Get next to `pos`, close enough to interact with it.
    pub async fn goto_block(&self, pos: BlockPos) -> bool {
        self.goto(pos.center(), BLOCK_TOLERANCE).await
    }

    /// Move until at least `distance` away from `point`.
    pub async fn flee_from(&self, point: Vec3, distance: f64) -> bool {
        let goal = Goal::inverted(point, distance);
        self.report(goal, self.navigate(goal).await)
    }

    /// Keep within `tolerance` of `entity` until stopped, preempted or the
    /// entity disappears.
    ///
    /// Returns once the follow task is running.
    pub fn follow(&self, entity: EntityId, tolerance: f64) -> bool {
        let ctx = &self.inner.ctx;
        if ctx.world.entity(entity).is_none() {
            tracing::warn!(%entity, "cannot follow a missing entity");
            return false;
        }
        let Some(lease) = ctx.supervisor.acquire(Self::ID, Priority::Navigation) else {
            tracing::info!(%entity, "drive lock busy, not following");
            return false;
        };

        let goal = Goal::near_entity(entity, tolerance);
        lease.set_goal(goal);
        let token = self.inner.run.begin(PathState::Navigating(goal));
        tracing::info!(%entity, tolerance, "following entity");

        let this = self.clone();
        tokio::spawn(async move {
            let result = this.follow_loop(&lease, &token, goal).await;
            if let Err(err) = result {
                tracing::debug!(%entity, %err, "follow ended");
            }
            this.inner.run.finish(&token);
        });
        true
    }

    async fn follow_loop(&self, lease: &DriveLease, token: &RunToken, goal: Goal) -> SkillResult<()> {
        let ctx = &self.inner.ctx;
        let tick = Duration::from_millis(ctx.config.navigation.follow_tick_ms.max(1));
        let Some(entity) = goal.entity() else {
            return Ok(());
        };

        loop {
            lease.checkpoint(token.stop_flag())?;
            let Some(target) = ctx.world.entity(entity) else {
                return Err(SkillError::NotFound(format!("entity {entity}")));
            };
            let here = ctx.world.status().position;
            if !goal.is_satisfied(here, Some(target.position)) {
                if let Err(err) = ctx.world.move_to(&goal).await {
                    tracing::debug!(%entity, %err, "follow step failed");
                }
                lease.checkpoint(token.stop_flag())?;
            }
            tokio::time::sleep(tick).await;
        }
    }

    async fn navigate(&self, goal: Goal) -> SkillResult<()> {
        let ctx = &self.inner.ctx;
        let lease = ctx
            .supervisor
            .acquire(Self::ID, Priority::Navigation)
            .ok_or(SkillError::Busy)?;
        let token = self.inner.run.begin(PathState::Navigating(goal));
        lease.set_goal(goal);

        let result: SkillResult<()> = async {
            lease.checkpoint(token.stop_flag())?;
            ctx.world.move_to(&goal).await?;
            Ok(())
        }
        .await;

        self.inner.run.finish(&token);
        result
    }

    fn report(&self, goal: Goal, result: SkillResult<()>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(kind = ?goal.kind, "reached destination");
                true
            }
            Err(err) => {
                tracing::warn!(kind = ?goal.kind, %err, "navigation failed");
                false
            }
        }
    }
}

impl Skill for Pathfinding {
    fn id(&self) -> SkillId {
        Self::ID
    }

    fn priority(&self) -> Priority {
        Priority::Navigation
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
