use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use nova_core::{hostiles_near, EntityId, EquipSlot, Goal, ItemId, Vec3};
use nova_supervisor::{CancelFlag, DriveLease, Interrupt, Priority, SkillId};
use tokio::time::MissedTickBehavior;

use crate::{Skill, SkillContext, SkillError, SkillResult};

/// Weapon preference, best first.
pub const WEAPONS: &[&str] = &[
    "netherite_sword",
    "diamond_sword",
    "iron_sword",
    "stone_sword",
    "wooden_sword",
    "golden_sword",
    "netherite_axe",
    "diamond_axe",
    "iron_axe",
    "stone_axe",
    "wooden_axe",
    "golden_axe",
];

/// Extra scan distance beyond melee reach for the defend loop.
const DEFEND_SCAN_MARGIN: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CombatState {
    #[default]
    Idle,
    Attacking(EntityId),
    Defending,
    Guarding(String),
    Fleeing,
}

struct Attack {
    target: EntityId,
    /// `None` while riding the guard lease.
    lease: Option<DriveLease>,
}

struct Guard {
    player: String,
    entity: EntityId,
    lease: DriveLease,
}

#[derive(Default)]
struct CombatInner {
    attack: Option<Attack>,
    guard: Option<Guard>,
    defend: Option<CancelFlag>,
    fleeing: bool,
    stop: CancelFlag,
}

struct Shared {
    ctx: SkillContext,
    state: Mutex<CombatInner>,
}

/// Attacking, defending, guarding and fleeing.
///
/// An attack holds the drive lock from its start until the world reports it
/// ended (`on_attack_ended`) or it is stopped. Guarding holds the lock at
/// `Priority::Guard` for its whole duration and attacks ride on that lease.
#[derive(Clone)]
pub struct Combat {
    inner: Arc<Shared>,
}

impl Combat {
    pub const ID: SkillId = SkillId("combat");

    pub fn new(ctx: SkillContext) -> Self {
        Self {
            inner: Arc::new(Shared {
                ctx,
                state: Mutex::new(CombatInner::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CombatInner> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> CombatState {
        let state = self.lock();
        if state.fleeing {
            CombatState::Fleeing
        } else if let Some(attack) = &state.attack {
            CombatState::Attacking(attack.target)
        } else if let Some(guard) = &state.guard {
            CombatState::Guarding(guard.player.clone())
        } else if state.defend.is_some() {
            CombatState::Defending
        } else {
            CombatState::Idle
        }
    }

    pub fn is_attacking(&self) -> bool {
        self.lock().attack.is_some()
    }

    pub fn is_defending(&self) -> bool {
        self.lock().defend.is_some()
    }

    pub fn is_guarding(&self) -> bool {
        self.lock().guard.is_some()
    }

    pub fn target(&self) -> Option<EntityId> {
        self.lock().attack.as_ref().map(|a| a.target)
    }

    /// Equip the best weapon in the inventory. Equip failures move on to the
    /// next candidate.
    pub async fn equip_best_weapon(&self) -> bool {
        let world = &self.inner.ctx.world;
        let inventory = world.inventory();
        for weapon in WEAPONS.iter().filter(|w| inventory.contains(w)) {
            match world.equip(&ItemId::from(*weapon), EquipSlot::Hand).await {
                Ok(()) => {
                    tracing::debug!(weapon, "equipped weapon");
                    return true;
                }
                Err(err) => tracing::debug!(weapon, %err, "equip failed"),
            }
        }
        tracing::debug!("no weapon to equip");
        false
    }

    /// Start attacking `target` at `Priority::Task`.
    pub async fn attack(&self, target: EntityId) -> bool {
        self.report_attack(target, self.start_attack(target, Priority::Task).await)
    }

    pub async fn attack_player(&self, username: &str) -> bool {
        let Some(player) = self.inner.ctx.world.player(username) else {
            tracing::warn!(player = username, "player not visible");
            return false;
        };
        self.attack(player.id).await
    }

    pub async fn attack_nearest_hostile(&self) -> bool {
        let ctx = &self.inner.ctx;
        let radius = ctx.config.combat.hostile_search_radius;
        let here = ctx.world.status().position;
        let hostiles = hostiles_near(&ctx.world.nearby_entities(radius), here, radius);
        let Some(nearest) = hostiles.first() else {
            tracing::info!(radius, "no hostile mobs nearby");
            return false;
        };
        self.attack(nearest.id).await
    }

    async fn start_attack(&self, target: EntityId, priority: Priority) -> SkillResult<()> {
        let ctx = &self.inner.ctx;
        if ctx.world.entity(target).is_none() {
            return Err(SkillError::NotFound(format!("entity {target}")));
        }
        if self.is_attacking() {
            self.stop_attacking();
        }

        let chase = Goal::near_entity(target, ctx.config.combat.attack_range);
        let (guarded, stop) = {
            let state = self.lock();
            let guarded = match &state.guard {
                Some(guard) if guard.lease.is_preempted() => {
                    return Err(Interrupt::Preempted.into());
                }
                Some(guard) => {
                    guard.lease.set_goal(chase);
                    true
                }
                None => false,
            };
            (guarded, state.stop.clone())
        };

        let lease = if guarded {
            None
        } else {
            let lease = ctx
                .supervisor
                .acquire(Self::ID, priority)
                .ok_or(SkillError::Busy)?;
            lease.set_goal(chase);
            Some(lease)
        };

        self.equip_best_weapon().await;
        if let Some(lease) = &lease {
            lease.checkpoint(&stop)?;
        } else if stop.is_cancelled() {
            return Err(Interrupt::Stopped.into());
        }

        ctx.world.attack(target).await?;
        if stop.is_cancelled() {
            ctx.world.stop_attack();
            return Err(Interrupt::Stopped.into());
        }

        self.lock().attack = Some(Attack { target, lease });
        Ok(())
    }

    fn report_attack(&self, target: EntityId, result: SkillResult<()>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(%target, "attacking");
                true
            }
            Err(err) => {
                tracing::warn!(%target, %err, "attack failed");
                false
            }
        }
    }

    /// World notification: the current attack ended (target dead or lost).
    pub fn on_attack_ended(&self) {
        let ended = self.take_attack();
        if let Some(attack) = ended {
            tracing::info!(target = %attack.target, "attack ended");
        }
    }

    pub fn stop_attacking(&self) {
        let ended = self.take_attack();
        self.inner.ctx.world.stop_attack();
        if let Some(attack) = ended {
            tracing::info!(target = %attack.target, "stopped attacking");
        }
    }

    // Clears the attack and points a running guard back at its player.
    fn take_attack(&self) -> Option<Attack> {
        let follow_tolerance = self.inner.ctx.config.navigation.follow_tolerance;
        let mut state = self.lock();
        let attack = state.attack.take();
        if attack.is_some() {
            if let Some(guard) = &state.guard {
                guard
                    .lease
                    .set_goal(Goal::near_entity(guard.entity, follow_tolerance));
            }
        }
        attack
    }

    /// Enter defensive mode: a periodic task scans for hostiles and flees at
    /// low health. Returns `false` if already defending.
    pub fn start_defending(&self) -> bool {
        let stop = {
            let mut state = self.lock();
            if state.defend.is_some() {
                return false;
            }
            let stop = CancelFlag::new();
            state.defend = Some(stop.clone());
            stop
        };
        tracing::info!("entering defensive mode");

        let period = Duration::from_millis(self.inner.ctx.config.combat.defend_interval_ms.max(1));
        let this = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if stop.is_cancelled() {
                    break;
                }
                this.defend_tick().await;
            }
        });
        true
    }

    /// One firing of the defend loop. No-op unless defending.
    pub async fn defend_tick(&self) {
        let ctx = &self.inner.ctx;
        let cfg = &ctx.config.combat;

        let stale = {
            let mut state = self.lock();
            if state.defend.is_none() {
                return;
            }
            let preempted = state
                .attack
                .as_ref()
                .and_then(|a| a.lease.as_ref())
                .is_some_and(|l| l.is_preempted());
            if preempted {
                state.attack.take()
            } else {
                None
            }
        };
        if stale.is_some() {
            ctx.world.stop_attack();
        }

        let status = ctx.world.status();
        if status.health <= cfg.flee_health_threshold {
            tracing::warn!(health = status.health, "health critical, fleeing");
            self.stop_defending();
            self.flee().await;
            return;
        }

        if self.is_attacking() {
            return;
        }

        let radius = cfg.attack_range + DEFEND_SCAN_MARGIN;
        let hostiles = hostiles_near(&ctx.world.nearby_entities(radius), status.position, radius);
        if let Some(nearest) = hostiles.first() {
            let result = self.start_attack(nearest.id, Priority::Guard).await;
            self.report_attack(nearest.id, result);
            return;
        }

        self.keep_up_with_guarded(status.position).await;
    }

    async fn keep_up_with_guarded(&self, here: Vec3) {
        let ctx = &self.inner.ctx;
        let guarded = {
            let state = self.lock();
            state
                .guard
                .as_ref()
                .map(|g| (g.entity, g.lease.is_preempted()))
        };
        let Some((entity, preempted)) = guarded else {
            return;
        };
        if preempted {
            tracing::info!("guard preempted");
            self.stop_guarding();
            return;
        }

        let tolerance = ctx.config.navigation.follow_tolerance;
        let Some(player) = ctx.world.entity(entity) else {
            tracing::debug!(%entity, "guarded player not visible");
            return;
        };
        if here.distance(player.position) > tolerance {
            let gate = {
                let state = self.lock();
                state
                    .guard
                    .as_ref()
                    .map(|g| g.lease.checkpoint(&state.stop))
            };
            match gate {
                Some(Ok(())) => {}
                Some(Err(Interrupt::Preempted)) => {
                    tracing::info!("guard preempted");
                    self.stop_guarding();
                    return;
                }
                Some(Err(Interrupt::Stopped)) | None => return,
            }
            if let Err(err) = ctx.world.move_to(&Goal::near_entity(entity, tolerance)).await {
                tracing::debug!(%entity, %err, "guard follow failed");
            }
        }
    }

    /// Leave defensive mode. Also ends the current attack.
    pub fn stop_defending(&self) {
        let defend = self.lock().defend.take();
        if let Some(stop) = defend {
            stop.cancel();
            tracing::info!("stopped defending");
        }
        if self.is_attacking() {
            self.stop_attacking();
        }
    }

    /// Follow `username` and fight hostiles around them.
    pub fn guard(&self, username: &str) -> bool {
        let ctx = &self.inner.ctx;
        let Some(player) = ctx.world.player(username) else {
            tracing::warn!(player = username, "player not visible");
            return false;
        };
        if self.is_guarding() {
            self.stop_guarding();
        }
        if self.is_attacking() {
            self.stop_attacking();
        }

        let Some(lease) = ctx.supervisor.acquire(Self::ID, Priority::Guard) else {
            tracing::info!(player = username, "drive lock busy, not guarding");
            return false;
        };
        lease.set_goal(Goal::near_entity(
            player.id,
            ctx.config.navigation.follow_tolerance,
        ));
        self.lock().guard = Some(Guard {
            player: username.to_string(),
            entity: player.id,
            lease,
        });
        tracing::info!(player = username, "guarding player");

        self.start_defending();
        true
    }

    pub fn stop_guarding(&self) {
        let guard = self.lock().guard.take();
        self.stop_defending();
        if let Some(guard) = guard {
            if guard.lease.is_current() {
                self.inner.ctx.world.stop_movement();
            }
            tracing::info!(player = %guard.player, "stopped guarding");
        }
    }

    /// Run away from the hostiles within the threat radius at
    /// `Priority::Flee`. Returns `false` when there is nothing to flee from.
    pub async fn flee(&self) -> bool {
        let ctx = &self.inner.ctx;
        let cfg = &ctx.config.combat;
        let here = ctx.world.status().position;
        let threats = hostiles_near(&ctx.world.nearby_entities(cfg.threat_radius), here, cfg.threat_radius);
        let positions: Vec<Vec3> = threats.iter().map(|e| e.position).collect();
        let Some(centroid) = Vec3::centroid(&positions) else {
            tracing::info!("no threats to flee from");
            return false;
        };

        // Escape runs in the horizontal plane.
        let threat = Vec3::new(centroid.x, here.y, centroid.z);
        let escape = here + (here - threat) * cfg.flee_scale;
        let goal = Goal::inverted(threat, escape.distance(threat));

        self.stop_guarding();
        self.stop_defending();
        if self.is_attacking() {
            self.stop_attacking();
        }

        let Some(lease) = ctx.supervisor.acquire(Self::ID, Priority::Flee) else {
            tracing::warn!("drive lock busy, cannot flee");
            return false;
        };
        lease.set_goal(goal);
        let stop = {
            let mut state = self.lock();
            state.fleeing = true;
            state.stop.clone()
        };
        tracing::warn!(threats = threats.len(), "fleeing from threats");

        let result: SkillResult<()> = async {
            lease.checkpoint(&stop)?;
            ctx.world.move_to(&goal).await?;
            Ok(())
        }
        .await;

        self.lock().fleeing = false;
        drop(lease);
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "flee failed");
                false
            }
        }
    }
}

impl Skill for Combat {
    fn id(&self) -> SkillId {
        Self::ID
    }

    fn priority(&self) -> Priority {
        Priority::Task
    }

    fn is_active(&self) -> bool {
        self.state() != CombatState::Idle
    }

    fn stop(&self) {
        {
            let mut state = self.lock();
            state.stop.cancel();
            state.stop = CancelFlag::new();
        }
        self.stop_guarding();
        self.stop_defending();
        if self.is_attacking() {
            self.stop_attacking();
        }
        tracing::info!(skill = %Self::ID, "stop requested");
    }
}
