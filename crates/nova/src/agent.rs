use std::sync::Arc;

use nova_core::{AgentConfig, SharedWorld};
use nova_craft::Crafter;
use nova_skills::{Combat, Mining, Pathfinding, Skill, SkillContext, Survival};
use nova_supervisor::Supervisor;

/// One agent: a drive lock, a world handle and every skill sharing them.
///
/// World notifications (attack ended, health and food changes, death) enter
/// through the `on_*` methods and are routed to the skills.
#[derive(Clone)]
pub struct Agent {
    ctx: SkillContext,
    pub pathfinding: Pathfinding,
    pub combat: Combat,
    pub mining: Mining,
    pub crafter: Crafter,
    pub survival: Survival,
}

impl Agent {
    pub fn new(world: SharedWorld, config: AgentConfig) -> Self {
        let ctx = SkillContext::new(Supervisor::new(), world, config);
        Self {
            pathfinding: Pathfinding::new(ctx.clone()),
            combat: Combat::new(ctx.clone()),
            mining: Mining::new(ctx.clone()),
            crafter: Crafter::new(ctx.clone()),
            survival: Survival::new(ctx.clone()),
            ctx,
        }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.ctx.supervisor
    }

    pub fn world(&self) -> &SharedWorld {
        &self.ctx.world
    }

    pub fn config(&self) -> &Arc<AgentConfig> {
        &self.ctx.config
    }

    pub fn skills(&self) -> [&dyn Skill; 5] {
        [
            &self.pathfinding,
            &self.combat,
            &self.mining,
            &self.crafter,
            &self.survival,
        ]
    }

    /// `true` when no skill holds the drive lock.
    pub fn is_idle(&self) -> bool {
        self.ctx.supervisor.holder().is_none()
    }

    pub fn on_attack_ended(&self) {
        self.combat.on_attack_ended();
    }

    /// Health changed. At or below the flee threshold the agent flees from
    /// nearby hostiles, preempting whatever was running.
    ///
    /// Returns `true` if a flee ran.
    pub async fn on_health_change(&self, health: f32) -> bool {
        self.survival.vitals();
        let threshold = self.ctx.config.combat.flee_health_threshold;
        if health > threshold {
            return false;
        }
        if self.combat.state() == nova_skills::CombatState::Fleeing {
            tracing::debug!(health, "already fleeing");
            return false;
        }
        tracing::warn!(health, threshold, "health critical");
        self.combat.flee().await
    }

    /// Food level changed. Low food is reported, and with auto-eat enabled
    /// the agent eats once food reaches the configured level, provided the
    /// drive lock is free.
    ///
    /// Returns `true` if something was eaten.
    pub async fn on_food_change(&self, food: f32) -> bool {
        let warn_at = self.ctx.config.survival.low_food_warning;
        if food <= warn_at {
            tracing::warn!(food, "low hunger");
        }
        if !self.survival.wants_food(food) {
            return false;
        }
        self.survival.eat().await
    }

    /// The agent died: every skill stops and queued lock requests are
    /// cancelled.
    pub fn on_death(&self) {
        tracing::warn!("agent died, stopping all skills");
        self.stop_all();
        self.ctx.supervisor.cancel_waiters();
    }

    pub fn stop_all(&self) {
        for skill in self.skills() {
            skill.stop();
        }
    }
}

impl core::fmt::Debug for Agent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Agent")
            .field("holder", &self.ctx.supervisor.holder())
            .field("combat", &self.combat.state())
            .field("mining", &self.mining.state())
            .field("crafter", &self.crafter.state())
            .field("survival", &self.survival.state())
            .finish()
    }
}
