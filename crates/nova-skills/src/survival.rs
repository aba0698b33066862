use std::sync::Arc;

use nova_core::{BlockPos, EquipSlot, Goal, ItemId};
use nova_supervisor::{DriveLease, Priority, SkillId};

use crate::{RunSlot, RunToken, Skill, SkillContext, SkillError, SkillResult};

/// Food eaten by `eat`, most preferred first.
pub const FOODS: &[&str] = &[
    "golden_apple",
    "enchanted_golden_apple",
    "cooked_beef",
    "cooked_porkchop",
    "cooked_mutton",
    "cooked_chicken",
    "cooked_rabbit",
    "cooked_salmon",
    "cooked_cod",
    "bread",
    "baked_potato",
    "pumpkin_pie",
    "golden_carrot",
    "apple",
    "carrot",
    "potato",
    "melon_slice",
    "beef",
    "porkchop",
    "chicken",
    "mutton",
    "rabbit",
];

const HELMETS: &[&str] = &[
    "netherite_helmet",
    "diamond_helmet",
    "iron_helmet",
    "chainmail_helmet",
    "golden_helmet",
    "leather_helmet",
    "turtle_helmet",
];

const CHESTPLATES: &[&str] = &[
    "netherite_chestplate",
    "diamond_chestplate",
    "iron_chestplate",
    "chainmail_chestplate",
    "golden_chestplate",
    "leather_chestplate",
];

const LEGGINGS: &[&str] = &[
    "netherite_leggings",
    "diamond_leggings",
    "iron_leggings",
    "chainmail_leggings",
    "golden_leggings",
    "leather_leggings",
];

const BOOTS: &[&str] = &[
    "netherite_boots",
    "diamond_boots",
    "iron_boots",
    "chainmail_boots",
    "golden_boots",
    "leather_boots",
];

/// Armor preference per slot, best first.
pub const ARMOR: &[(EquipSlot, &[&str])] = &[
    (EquipSlot::Head, HELMETS),
    (EquipSlot::Torso, CHESTPLATES),
    (EquipSlot::Legs, LEGGINGS),
    (EquipSlot::Feet, BOOTS),
];

pub const BEDS: &[&str] = &[
    "white_bed",
    "orange_bed",
    "magenta_bed",
    "light_blue_bed",
    "yellow_bed",
    "lime_bed",
    "pink_bed",
    "gray_bed",
    "light_gray_bed",
    "cyan_bed",
    "purple_bed",
    "blue_bed",
    "brown_bed",
    "green_bed",
    "red_bed",
    "black_bed",
];

const MAX_FOOD: f32 = 20.0;

/// How close to walk to a bed before lying down.
const BED_APPROACH: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SurvivalState {
    #[default]
    Idle,
    Eating,
    EquippingArmor,
    Sleeping,
    Waking,
}

/// Health and food readings against the configured warning levels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vitals {
    pub health: f32,
    pub food: f32,
    pub low_health: bool,
    pub hungry: bool,
}

struct Inner {
    ctx: SkillContext,
    run: RunSlot<SurvivalState>,
}

/// Eating, armor and sleeping at `Priority::Task`.
#[derive(Clone)]
pub struct Survival {
    inner: Arc<Inner>,
}

/// One survival run holding the drive lock.
struct Chore<'a> {
    ctx: &'a SkillContext,
    lease: DriveLease,
    token: RunToken,
}

impl Chore<'_> {
    fn checkpoint(&self) -> SkillResult<()> {
        self.lease.checkpoint(self.token.stop_flag())?;
        Ok(())
    }

    /// Try `foods` in order until one is eaten.
    async fn eat_first(&self, foods: &[ItemId]) -> SkillResult<bool> {
        let world = &self.ctx.world;
        for food in foods {
            self.checkpoint()?;
            tracing::info!(%food, "eating");
            let eaten: SkillResult<()> = async {
                world.equip(food, EquipSlot::Hand).await?;
                self.checkpoint()?;
                world.consume().await?;
                Ok(())
            }
            .await;
            match eaten {
                Ok(()) => {
                    tracing::info!(%food, food_level = world.status().food, "finished eating");
                    return Ok(true);
                }
                Err(err) if err.is_interrupt() => return Err(err),
                Err(err) => tracing::warn!(%food, %err, "failed to eat"),
            }
        }
        Ok(false)
    }

    async fn equip_armor(&self) -> SkillResult<u32> {
        let world = &self.ctx.world;
        let mut equipped = 0;
        for (slot, pieces) in ARMOR {
            let inventory = world.inventory();
            for piece in pieces.iter().filter(|p| inventory.contains(p)) {
                self.checkpoint()?;
                let item = ItemId::from(*piece);
                match world.equip(&item, *slot).await {
                    Ok(()) => {
                        tracing::info!(%item, ?slot, "equipped armor");
                        equipped += 1;
                        break;
                    }
                    Err(err) => tracing::debug!(%item, ?slot, %err, "armor equip failed"),
                }
            }
        }
        Ok(equipped)
    }

    async fn sleep_in(&self, bed: BlockPos) -> SkillResult<()> {
        let world = &self.ctx.world;
        self.checkpoint()?;
        let target = bed.center();
        if world.status().position.distance(target) > BED_APPROACH {
            let goal = Goal::near_point(target, BED_APPROACH);
            self.lease.set_goal(goal);
            world.move_to(&goal).await?;
            self.lease.clear_goal();
            self.checkpoint()?;
        }
        world.sleep(bed).await?;
        tracing::info!(%bed, "sleeping in bed");
        Ok(())
    }
}

impl Survival {
    pub const ID: SkillId = SkillId("survival");

    pub fn new(ctx: SkillContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                run: RunSlot::default(),
            }),
        }
    }

    pub fn state(&self) -> SurvivalState {
        self.inner.run.state()
    }

    fn start(&self, state: SurvivalState) -> Option<Chore<'_>> {
        let Some(lease) = self.inner.ctx.supervisor.acquire(Self::ID, Priority::Task) else {
            tracing::info!(?state, "drive lock busy");
            return None;
        };
        let token = self.inner.run.begin(state);
        Some(Chore {
            ctx: &self.inner.ctx,
            lease,
            token,
        })
    }

    fn finish<T>(&self, chore: Chore<'_>, result: SkillResult<T>) -> Option<T> {
        self.inner.run.finish(&chore.token);
        match result {
            Ok(value) => Some(value),
            Err(err) if err.is_interrupt() => {
                tracing::info!(%err, "survival run interrupted");
                None
            }
            Err(err) => {
                tracing::warn!(%err, "survival run failed");
                None
            }
        }
    }

    /// Read health and food, warning about either when low.
    pub fn vitals(&self) -> Vitals {
        let cfg = &self.inner.ctx.config.survival;
        let status = self.inner.ctx.world.status();
        let vitals = Vitals {
            health: status.health,
            food: status.food,
            low_health: status.health <= cfg.low_health_warning,
            hungry: status.food <= cfg.low_food_warning,
        };
        if vitals.low_health {
            tracing::warn!(health = status.health, "low health");
        }
        if vitals.hungry {
            tracing::warn!(food = status.food, "low hunger");
        }
        vitals
    }

    /// Whether auto-eat should run at `food`.
    pub fn wants_food(&self, food: f32) -> bool {
        let cfg = &self.inner.ctx.config.survival;
        cfg.auto_eat && food <= cfg.eat_below && food < MAX_FOOD
    }

    /// Eat the most preferred food on hand. Returns `true` once something
    /// was eaten.
    pub async fn eat(&self) -> bool {
        let world = &self.inner.ctx.world;
        if world.status().food >= MAX_FOOD {
            tracing::info!("not hungry");
            return false;
        }
        let inventory = world.inventory();
        let foods: Vec<ItemId> = FOODS
            .iter()
            .filter(|f| inventory.contains(f))
            .map(|f| ItemId::from(*f))
            .collect();
        if foods.is_empty() {
            tracing::warn!("no food available");
            return false;
        }

        let Some(chore) = self.start(SurvivalState::Eating) else {
            return false;
        };
        let result = chore.eat_first(&foods).await;
        self.finish(chore, result).unwrap_or(false)
    }

    /// Put on the best armor on hand for each slot. Returns the number of
    /// pieces equipped.
    pub async fn equip_armor(&self) -> u32 {
        let Some(chore) = self.start(SurvivalState::EquippingArmor) else {
            return 0;
        };
        let result = chore.equip_armor().await;
        self.finish(chore, result).unwrap_or(0)
    }

    /// Nearest bed within `radius`.
    pub fn find_bed(&self, radius: u32) -> Option<BlockPos> {
        let beds: Vec<ItemId> = BEDS.iter().map(|b| ItemId::from(*b)).collect();
        self.inner
            .ctx
            .world
            .find_blocks(&beds, radius, 1)
            .into_iter()
            .next()
    }

    /// Walk to the nearest bed and sleep in it.
    pub async fn sleep(&self) -> bool {
        let ctx = &self.inner.ctx;
        if ctx.world.status().sleeping {
            tracing::debug!("already sleeping");
            return true;
        }
        let radius = ctx.config.survival.bed_search_radius;
        let Some(bed) = self.find_bed(radius) else {
            tracing::warn!(radius, "no bed nearby");
            return false;
        };

        let Some(chore) = self.start(SurvivalState::Sleeping) else {
            return false;
        };
        let result = chore.sleep_in(bed).await;
        self.finish(chore, result).is_some()
    }

    /// Get out of bed. `false` when not sleeping.
    pub async fn wake(&self) -> bool {
        if !self.inner.ctx.world.status().sleeping {
            return false;
        }
        let Some(chore) = self.start(SurvivalState::Waking) else {
            return false;
        };
        let result: SkillResult<()> = async {
            chore.checkpoint()?;
            chore.ctx.world.wake().await.map_err(SkillError::from)
        }
        .await;
        let woke = self.finish(chore, result).is_some();
        if woke {
            tracing::info!("woke up");
        }
        woke
    }
}

impl Skill for Survival {
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
        tracing::info!(skill = %Self::ID, "stop requested");
    }
}
