use std::sync::Arc;
use std::time::Duration;

use nova_core::{BlockPos, Goal, ItemId, Vec3};
use nova_supervisor::{DriveLease, Priority, SkillId};

use crate::{RunSlot, RunToken, Skill, SkillContext, SkillResult};

/// Ores tried by `mine_ores`, most valuable first.
pub const ORES: &[&str] = &[
    "diamond_ore",
    "deepslate_diamond_ore",
    "iron_ore",
    "deepslate_iron_ore",
    "gold_ore",
    "deepslate_gold_ore",
    "coal_ore",
    "deepslate_coal_ore",
];

/// Log family gathered by `chop_wood`.
pub const LOGS: &[&str] = &[
    "oak_log",
    "birch_log",
    "spruce_log",
    "jungle_log",
    "acacia_log",
    "dark_oak_log",
    "mangrove_log",
    "cherry_log",
];

/// How close to walk to a block before digging it.
const APPROACH_TOLERANCE: f64 = 1.0;

/// How close to walk to a dropped item to pick it up.
const PICKUP_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MiningState {
    #[default]
    Idle,
    MiningSingle,
    StripMining,
    OreSearch,
}

/// Outcome of a strip-mine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StripMineReport {
    /// Columns visited.
    pub steps: u32,
    /// Blocks broken.
    pub mined: u32,
}

struct Inner {
    ctx: SkillContext,
    run: RunSlot<MiningState>,
}

/// Block finding and breaking at `Priority::Task`.
#[derive(Clone)]
pub struct Mining {
    inner: Arc<Inner>,
}

/// One mining run: the held lease plus the run's stop flag.
struct Dig<'a> {
    ctx: &'a SkillContext,
    lease: DriveLease,
    token: RunToken,
}

impl Dig<'_> {
    fn checkpoint(&self) -> SkillResult<()> {
        self.lease.checkpoint(self.token.stop_flag())?;
        Ok(())
    }

    async fn pause(&self, ms: u64) -> SkillResult<()> {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        self.checkpoint()
    }

    async fn approach(&self, pos: BlockPos) -> SkillResult<()> {
        let world = &self.ctx.world;
        let target = pos.center();
        if world.status().position.distance(target) <= self.ctx.config.navigation.interaction_radius {
            return Ok(());
        }
        let goal = Goal::near_point(target, APPROACH_TOLERANCE);
        self.lease.set_goal(goal);
        world.move_to(&goal).await?;
        self.lease.clear_goal();
        self.checkpoint()
    }

    /// Walk to `pos` if needed, equip a tool and break it. `Ok(false)` when
    /// the block turned out to be gone.
    async fn break_at(&self, pos: BlockPos) -> SkillResult<bool> {
        let world = &self.ctx.world;
        self.checkpoint()?;
        self.approach(pos).await?;

        if let Some(block) = world.block_at(pos) {
            if let Err(err) = world.equip_for_block(&block).await {
                tracing::debug!(%pos, %err, "tool equip failed");
            }
            self.checkpoint()?;
        }

        // The world may have changed while walking or equipping.
        let Some(block) = world.block_at(pos).filter(|b| !b.is_air()) else {
            tracing::debug!(%pos, "block vanished before digging");
            return Ok(false);
        };
        world.break_block(pos).await?;
        tracing::debug!(%pos, block = %block.id, "block broken");
        Ok(true)
    }

    /// Pick up dropped items within `radius` of `center`.
    async fn collect_around(&self, center: Vec3, radius: f64) -> SkillResult<u32> {
        let world = &self.ctx.world;
        let here = world.status().position;
        let items: Vec<_> = world
            .nearby_entities(radius + here.distance(center))
            .into_iter()
            .filter(|e| e.is_dropped_item() && e.position.distance(center) <= radius)
            .collect();

        let mut collected = 0;
        for item in items {
            self.checkpoint()?;
            if world.entity(item.id).is_none() {
                continue;
            }
            let goal = Goal::near_point(item.position, PICKUP_TOLERANCE);
            if let Err(err) = world.move_to(&goal).await {
                tracing::debug!(item = %item.id, %err, "could not reach item");
                continue;
            }
            if world.entity(item.id).is_none() {
                collected += 1;
            }
        }
        Ok(collected)
    }
}

impl Mining {
    pub const ID: SkillId = SkillId("mining");

    pub fn new(ctx: SkillContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                run: RunSlot::default(),
            }),
        }
    }

    pub fn state(&self) -> MiningState {
        self.inner.run.state()
    }

    fn start(&self, state: MiningState) -> Option<Dig<'_>> {
        let Some(lease) = self.inner.ctx.supervisor.acquire(Self::ID, Priority::Task) else {
            tracing::info!(?state, "drive lock busy, not mining");
            return None;
        };
        let token = self.inner.run.begin(state);
        Some(Dig {
            ctx: &self.inner.ctx,
            lease,
            token,
        })
    }

    fn finish(&self, dig: Dig<'_>, result: SkillResult<()>) {
        self.inner.run.finish(&dig.token);
        match result {
            Ok(()) => {}
            Err(err) if err.is_interrupt() => tracing::info!(%err, "mining interrupted"),
            Err(err) => tracing::warn!(%err, "mining aborted"),
        }
    }

    /// Mine up to `count` blocks of `block`, nearest first. Returns the
    /// number broken.
    ///
    /// A navigation or dig failure ends the run.
    pub async fn mine_blocks(&self, block: &str, count: u32, auto_collect: bool) -> u32 {
        let ids = [ItemId::normalized(block)];
        let mined = self.mine_matching(&ids, count, auto_collect).await;
        tracing::info!(block = %ids[0], mined, requested = count, "finished mining");
        mined
    }

    /// Gather up to `count` logs of any kind.
    pub async fn chop_wood(&self, count: u32) -> u32 {
        let ids: Vec<ItemId> = LOGS.iter().copied().map(ItemId::from).collect();
        let chopped = self.mine_matching(&ids, count, true).await;
        tracing::info!(chopped, requested = count, "finished chopping wood");
        chopped
    }

    async fn mine_matching(&self, ids: &[ItemId], count: u32, auto_collect: bool) -> u32 {
        let cfg = &self.inner.ctx.config.mining;
        let count = count.min(cfg.max_count);
        let Some(dig) = self.start(MiningState::MiningSingle) else {
            return 0;
        };
        let world = &self.inner.ctx.world;

        let mut mined = 0;
        let mut skipped: Vec<BlockPos> = Vec::new();
        let result: SkillResult<()> = async {
            while mined < count {
                dig.checkpoint()?;
                let next = world
                    .find_blocks(ids, cfg.search_radius, cfg.max_results)
                    .into_iter()
                    .find(|p| !skipped.contains(p));
                let Some(pos) = next else {
                    tracing::info!("no more matching blocks nearby");
                    break;
                };

                if !dig.break_at(pos).await? {
                    skipped.push(pos);
                    continue;
                }
                mined += 1;
                tracing::debug!(mined, count, "mined block");

                if auto_collect {
                    dig.pause(cfg.collect_delay_ms).await?;
                    dig.collect_around(pos.center(), cfg.collect_radius).await?;
                }
                dig.pause(cfg.step_delay_ms).await?;
            }
            Ok(())
        }
        .await;

        self.finish(dig, result);
        mined
    }

    /// Dig a straight two-high tunnel along the agent's heading.
    ///
    /// Air, liquids and unbreakable blocks are skipped, as are blocks whose
    /// dig fails.
    pub async fn strip_mine(&self, length: u32) -> StripMineReport {
        let cfg = &self.inner.ctx.config.mining;
        let length = length.min(cfg.strip_max_length);
        let Some(dig) = self.start(MiningState::StripMining) else {
            return StripMineReport::default();
        };
        let world = &self.inner.ctx.world;

        let status = world.status();
        let (dx, dz) = (-status.yaw.sin(), -status.yaw.cos());
        let start = status.position;
        tracing::info!(length, yaw = status.yaw, "starting strip mine");

        let mut report = StripMineReport::default();
        let result: SkillResult<()> = async {
            for i in 0..length {
                dig.checkpoint()?;
                let step = f64::from(i);
                let base = Vec3::new(start.x + dx * step, start.y, start.z + dz * step).floored();

                for column in [base, base.above()] {
                    let Some(block) = world.block_at(column) else {
                        continue;
                    };
                    if block.is_air() || cfg.is_disallowed(&block.id) {
                        continue;
                    }
                    match dig.break_at(column).await {
                        Ok(true) => report.mined += 1,
                        Ok(false) => {}
                        Err(err) if err.is_interrupt() => return Err(err),
                        Err(err) => tracing::debug!(pos = %column, %err, "skipping block"),
                    }
                }

                report.steps += 1;
                dig.pause(cfg.strip_step_delay_ms).await?;
            }
            Ok(())
        }
        .await;

        self.finish(dig, result);
        tracing::info!(steps = report.steps, mined = report.mined, "strip mine complete");
        report
    }

    /// Try one block of each known ore, most valuable first, stopping at
    /// `max_blocks`.
    pub async fn mine_ores(&self, max_blocks: u32) -> u32 {
        let cfg = &self.inner.ctx.config.mining;
        let max_blocks = max_blocks.min(cfg.ore_max_blocks);
        let Some(dig) = self.start(MiningState::OreSearch) else {
            return 0;
        };
        let world = &self.inner.ctx.world;

        let mut total = 0;
        let result: SkillResult<()> = async {
            for ore in ORES {
                if total >= max_blocks {
                    break;
                }
                dig.checkpoint()?;
                let found = world.find_blocks(&[ItemId::from(*ore)], cfg.ore_search_radius, 1);
                if let Some(pos) = found.first().copied() {
                    tracing::debug!(ore, %pos, "found ore");
                    match dig.break_at(pos).await {
                        Ok(true) => total += 1,
                        Ok(false) => {}
                        Err(err) if err.is_interrupt() => return Err(err),
                        Err(err) => tracing::debug!(ore, %err, "skipping ore"),
                    }
                }
                dig.pause(cfg.step_delay_ms).await?;
            }
            Ok(())
        }
        .await;

        self.finish(dig, result);
        tracing::info!(mined = total, "ore search complete");
        total
    }

    /// Break the block at `pos`.
    pub async fn dig_at(&self, pos: BlockPos) -> bool {
        if self.inner.ctx.world.block_at(pos).is_none_or(|b| b.is_air()) {
            tracing::warn!(%pos, "no block to dig");
            return false;
        }
        let Some(dig) = self.start(MiningState::MiningSingle) else {
            return false;
        };
        let result = dig.break_at(pos).await;
        let broken = matches!(result, Ok(true));
        self.finish(dig, result.map(|_| ()));
        broken
    }

    /// Walk over dropped items within `range` of the agent.
    pub async fn collect_items(&self, range: f64) -> u32 {
        let Some(dig) = self.start(MiningState::MiningSingle) else {
            return 0;
        };
        let here = self.inner.ctx.world.status().position;
        let result = dig.collect_around(here, range).await;
        let collected = *result.as_ref().unwrap_or(&0);
        self.finish(dig, result.map(|_| ()));
        tracing::info!(collected, "collected items");
        collected
    }
}

impl Skill for Mining {
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
