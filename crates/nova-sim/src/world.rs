use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use nova_core::{
    hostiles_near, AgentStatus, Block, BlockPos, ContainerHandle, Entity, EntityId, EntityKind,
    EquipSlot, Goal, GoalKind, GoalTarget, Inventory, ItemId, Recipe, StationHandle, Vec3,
    WorldError, WorldInterface, WorldResult,
};

use crate::{Scenario, Timings};

/// Fuels accepted by simulated furnaces.
const FUELS: &[&str] = &["coal", "charcoal", "coal_block"];

const MAX_FOOD: f32 = 20.0;

/// Hostiles closer than this to a bed prevent sleeping.
const SLEEP_SAFE_RADIUS: f64 = 8.0;

/// Furthest a bed can be from the agent and still be used.
const BED_REACH: f64 = 3.0;

/// Hunger restored by eating one `item`.
fn nutrition(item: &str) -> Option<f32> {
    let points = match item {
        "golden_carrot" | "cooked_beef" | "cooked_porkchop" => 8.0,
        "cooked_mutton" | "cooked_salmon" | "pumpkin_pie" => 6.0,
        "cooked_chicken" | "cooked_cod" | "bread" | "baked_potato" => 5.0,
        "cooked_rabbit" => 5.0,
        "golden_apple" | "enchanted_golden_apple" | "apple" => 4.0,
        "carrot" | "beef" | "porkchop" | "rabbit" => 3.0,
        "melon_slice" | "chicken" | "mutton" => 2.0,
        "potato" => 1.0,
        _ => return None,
    };
    Some(points)
}

/// Every world call the simulation received, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldCall {
    MoveTo(Goal),
    StopMovement,
    Attack(EntityId),
    StopAttack,
    Break(BlockPos),
    Place {
        anchor: BlockPos,
        face: BlockPos,
        item: ItemId,
    },
    Equip(ItemId, EquipSlot),
    EquipForBlock(BlockPos),
    OpenContainer(BlockPos),
    Deposit(ItemId, u32),
    Withdraw(ItemId, u32),
    CloseContainer(BlockPos),
    Craft {
        item: ItemId,
        operations: u32,
        station: Option<BlockPos>,
    },
    Consume,
    Sleep(BlockPos),
    Wake,
}

impl WorldCall {
    /// Calls that make the agent's body act (everything but stops/queries).
    pub fn is_actuation(&self) -> bool {
        !matches!(self, WorldCall::StopMovement | WorldCall::StopAttack)
    }
}

struct SimState {
    agent: AgentStatus,
    blocks: BTreeMap<BlockPos, ItemId>,
    entities: BTreeMap<EntityId, Entity>,
    inventory: Inventory,
    recipes: Vec<Recipe>,
    smelting: Vec<(ItemId, ItemId)>,
    containers: BTreeMap<BlockPos, Inventory>,
    unreachable: BTreeSet<BlockPos>,
    unbreakable: BTreeSet<BlockPos>,
    failing_crafts: BTreeSet<ItemId>,
    drops: bool,
    daytime: bool,
    timings: Timings,
    attacking: Option<EntityId>,
    held: Option<ItemId>,
    next_entity: u64,
    calls: Vec<WorldCall>,
}

/// Deterministic in-memory world.
///
/// Cheap to clone; clones share state, so a test can keep one handle for
/// inspection while skills drive another.
#[derive(Clone)]
pub struct SimWorld {
    state: Arc<Mutex<SimState>>,
}

impl SimWorld {
    pub fn new(scenario: Scenario) -> Self {
        let mut blocks = BTreeMap::new();
        if let Some(ground) = &scenario.ground {
            for x in -ground.radius..=ground.radius {
                for z in -ground.radius..=ground.radius {
                    blocks.insert(BlockPos::new(x, ground.y, z), ground.id.clone());
                }
            }
        }
        for block in scenario.blocks {
            blocks.insert(block.pos, block.id);
        }

        let next_entity = scenario.entities.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        let entities = scenario.entities.into_iter().map(|e| (e.id, e)).collect();

        Self {
            state: Arc::new(Mutex::new(SimState {
                agent: scenario.agent,
                blocks,
                entities,
                inventory: scenario.inventory,
                recipes: scenario.recipes,
                smelting: scenario.smelting,
                containers: BTreeMap::new(),
                unreachable: scenario.unreachable.into_iter().collect(),
                unbreakable: scenario.unbreakable.into_iter().collect(),
                failing_crafts: scenario.failing_crafts.into_iter().collect(),
                drops: scenario.drops,
                daytime: scenario.daytime,
                timings: scenario.timings,
                attacking: None,
                held: None,
                next_entity,
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: WorldCall) -> Timings {
        let mut state = self.lock();
        state.calls.push(call);
        state.timings
    }

    pub fn calls(&self) -> Vec<WorldCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn craft_calls(&self) -> Vec<(ItemId, u32)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                WorldCall::Craft {
                    item, operations, ..
                } => Some((item.clone(), *operations)),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self) -> Vec3 {
        self.lock().agent.position
    }

    pub fn set_health(&self, health: f32) {
        self.lock().agent.health = health;
    }

    pub fn set_food(&self, food: f32) {
        self.lock().agent.food = food;
    }

    pub fn set_daytime(&self, daytime: bool) {
        self.lock().daytime = daytime;
    }

    /// Item last equipped to the main hand.
    pub fn held(&self) -> Option<ItemId> {
        self.lock().held.clone()
    }

    pub fn set_block(&self, pos: BlockPos, id: &str) {
        self.lock().blocks.insert(pos, ItemId::from(id));
    }

    pub fn block_id(&self, pos: BlockPos) -> ItemId {
        self.lock()
            .blocks
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| ItemId::from("air"))
    }

    pub fn add_entity(&self, entity: Entity) {
        let mut state = self.lock();
        state.next_entity = state.next_entity.max(entity.id.0 + 1);
        state.entities.insert(entity.id, entity);
    }

    pub fn move_entity(&self, id: EntityId, position: Vec3) {
        if let Some(entity) = self.lock().entities.get_mut(&id) {
            entity.position = position;
        }
    }

    pub fn remove_entity(&self, id: EntityId) {
        let mut state = self.lock();
        state.entities.remove(&id);
        if state.attacking == Some(id) {
            state.attacking = None;
        }
    }

    pub fn attacking(&self) -> Option<EntityId> {
        self.lock().attacking
    }

    pub fn give(&self, id: &str, count: u32) {
        self.lock().inventory.add(ItemId::from(id), count);
    }

    pub fn container(&self, pos: BlockPos) -> Inventory {
        self.lock().containers.get(&pos).cloned().unwrap_or_default()
    }

    async fn pause(ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

impl SimState {
    fn block(&self, pos: BlockPos) -> ItemId {
        self.blocks
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| ItemId::from("air"))
    }

    fn resolve_goal(&self, goal: &Goal) -> WorldResult<Vec3> {
        let target = match goal.target {
            GoalTarget::Point(p) => p,
            GoalTarget::Entity(id) => self
                .entities
                .get(&id)
                .map(|e| e.position)
                .ok_or_else(|| WorldError::Unreachable(format!("entity {id} is gone")))?,
        };

        if goal.kind != GoalKind::Inverted && self.unreachable.contains(&target.floored()) {
            return Err(WorldError::Unreachable(format!(
                "no path to {}",
                target.floored()
            )));
        }

        let here = self.agent.position;
        let destination = match goal.kind {
            GoalKind::ExactBlock => target.floored().as_vec3(),
            GoalKind::NearPoint | GoalKind::NearEntity => {
                if here.distance(target) <= goal.tolerance {
                    here
                } else {
                    target
                }
            }
            GoalKind::Inverted => {
                let away = here - target;
                let len = away.length();
                let dir = if len <= f64::EPSILON {
                    Vec3::new(1.0, 0.0, 0.0)
                } else {
                    away * (1.0 / len)
                };
                let dest = target + dir * goal.tolerance;
                if self.unreachable.contains(&dest.floored()) {
                    return Err(WorldError::Unreachable(format!(
                        "no escape to {}",
                        dest.floored()
                    )));
                }
                dest
            }
        };
        Ok(destination)
    }

    fn pick_up_items(&mut self) {
        let here = self.agent.position;
        let picked: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.is_dropped_item() && e.position.distance(here) <= 1.0)
            .map(|e| e.id)
            .collect();
        for id in picked {
            if let Some(Entity {
                kind: EntityKind::Item { item, count },
                ..
            }) = self.entities.remove(&id)
            {
                self.inventory.add(item, count);
            }
        }
    }

    fn settle_furnace(&mut self, pos: BlockPos) {
        if self.block(pos).as_str() != "furnace" {
            return;
        }
        let rules = self.smelting.clone();
        let Some(container) = self.containers.get_mut(&pos) else {
            return;
        };
        for (input, output) in rules {
            let n = container.count(input.as_str());
            if n == 0 {
                continue;
            }
            let Some(fuel) = container.first_of(FUELS) else {
                return;
            };
            let fuel_needed = n.div_ceil(8);
            if container.count(fuel) < fuel_needed {
                continue;
            }
            container.remove(fuel, fuel_needed);
            container.remove(input.as_str(), n);
            container.add(output, n);
        }
    }
}

#[async_trait]
impl WorldInterface for SimWorld {
    async fn move_to(&self, goal: &Goal) -> WorldResult<()> {
        let timings = self.record(WorldCall::MoveTo(*goal));
        Self::pause(timings.move_ms).await;

        let mut state = self.lock();
        let destination = state.resolve_goal(goal)?;
        state.agent.position = destination;
        state.pick_up_items();
        Ok(())
    }

    fn stop_movement(&self) {
        self.record(WorldCall::StopMovement);
    }

    async fn attack(&self, target: EntityId) -> WorldResult<()> {
        self.record(WorldCall::Attack(target));
        let mut state = self.lock();
        if !state.entities.contains_key(&target) {
            return Err(WorldError::Rejected(format!("no entity {target}")));
        }
        state.attacking = Some(target);
        Ok(())
    }

    fn stop_attack(&self) {
        self.record(WorldCall::StopAttack);
        self.lock().attacking = None;
    }

    async fn break_block(&self, pos: BlockPos) -> WorldResult<()> {
        let timings = self.record(WorldCall::Break(pos));
        Self::pause(timings.break_ms).await;

        let mut state = self.lock();
        if state.unbreakable.contains(&pos) {
            return Err(WorldError::Rejected(format!("cannot break {pos}")));
        }
        let id = state.block(pos);
        if id.is_air() {
            return Err(WorldError::Desync(format!("no block at {pos}")));
        }
        state.blocks.remove(&pos);
        if state.drops {
            state.next_entity += 1;
            let entity = Entity {
                id: EntityId(state.next_entity),
                name: "item".to_string(),
                kind: EntityKind::Item { item: id, count: 1 },
                position: pos.center(),
            };
            state.entities.insert(entity.id, entity);
        } else {
            state.inventory.add(id, 1);
        }
        Ok(())
    }

    async fn place_block(&self, anchor: BlockPos, face: BlockPos, item: &ItemId) -> WorldResult<()> {
        let timings = self.record(WorldCall::Place {
            anchor,
            face,
            item: item.clone(),
        });
        Self::pause(timings.place_ms).await;

        let mut state = self.lock();
        let target = anchor + face;
        let anchor_id = state.block(anchor);
        if anchor_id.is_air() || anchor_id.is_liquid() {
            return Err(WorldError::Rejected(format!("no solid anchor at {anchor}")));
        }
        if !state.block(target).is_air() {
            return Err(WorldError::Rejected(format!("{target} is occupied")));
        }
        if state.inventory.remove(item.as_str(), 1) == 0 {
            return Err(WorldError::Rejected(format!("no {item} to place")));
        }
        state.blocks.insert(target, item.clone());
        Ok(())
    }

    async fn equip(&self, item: &ItemId, slot: EquipSlot) -> WorldResult<()> {
        self.record(WorldCall::Equip(item.clone(), slot));
        let mut state = self.lock();
        if !state.inventory.contains(item.as_str()) {
            return Err(WorldError::Rejected(format!("no {item} to equip")));
        }
        if slot == EquipSlot::Hand {
            state.held = Some(item.clone());
        }
        Ok(())
    }

    async fn equip_for_block(&self, block: &Block) -> WorldResult<()> {
        self.record(WorldCall::EquipForBlock(block.pos));
        Ok(())
    }

    async fn consume(&self) -> WorldResult<()> {
        let timings = self.record(WorldCall::Consume);
        Self::pause(timings.eat_ms).await;

        let mut state = self.lock();
        let Some(item) = state.held.clone() else {
            return Err(WorldError::Rejected("nothing in hand".to_string()));
        };
        let Some(points) = nutrition(item.as_str()) else {
            return Err(WorldError::Rejected(format!("{item} is not edible")));
        };
        if state.agent.food >= MAX_FOOD {
            return Err(WorldError::Rejected("not hungry".to_string()));
        }
        if state.inventory.remove(item.as_str(), 1) == 0 {
            state.held = None;
            return Err(WorldError::Desync(format!("no {item} left")));
        }
        if !state.inventory.contains(item.as_str()) {
            state.held = None;
        }
        state.agent.food = (state.agent.food + points).min(MAX_FOOD);
        Ok(())
    }

    async fn sleep(&self, bed: BlockPos) -> WorldResult<()> {
        self.record(WorldCall::Sleep(bed));
        let mut state = self.lock();
        if !state.block(bed).as_str().ends_with("_bed") {
            return Err(WorldError::Rejected(format!("no bed at {bed}")));
        }
        if state.agent.position.distance(bed.center()) > BED_REACH {
            return Err(WorldError::Rejected(format!("bed at {bed} is too far")));
        }
        if state.daytime {
            return Err(WorldError::Rejected("sleeping is not possible now".to_string()));
        }
        let entities: Vec<Entity> = state.entities.values().cloned().collect();
        if !hostiles_near(&entities, bed.center(), SLEEP_SAFE_RADIUS).is_empty() {
            return Err(WorldError::Rejected("monsters nearby".to_string()));
        }
        state.agent.sleeping = true;
        Ok(())
    }

    async fn wake(&self) -> WorldResult<()> {
        self.record(WorldCall::Wake);
        let mut state = self.lock();
        if !state.agent.sleeping {
            return Err(WorldError::Rejected("not sleeping".to_string()));
        }
        state.agent.sleeping = false;
        Ok(())
    }

    async fn open_container(&self, pos: BlockPos) -> WorldResult<Box<dyn ContainerHandle>> {
        self.record(WorldCall::OpenContainer(pos));
        let mut state = self.lock();
        if state.block(pos).is_air() {
            return Err(WorldError::Rejected(format!("no container at {pos}")));
        }
        state.containers.entry(pos).or_default();
        Ok(Box::new(SimContainer {
            world: self.clone(),
            pos,
        }))
    }

    fn recipes_for(&self, item: &ItemId, _desired: u32) -> Vec<Recipe> {
        self.lock()
            .recipes
            .iter()
            .filter(|r| &r.result == item)
            .cloned()
            .collect()
    }

    async fn craft_recipe(
        &self,
        recipe: &Recipe,
        operations: u32,
        station: Option<&StationHandle>,
    ) -> WorldResult<()> {
        let timings = self.record(WorldCall::Craft {
            item: recipe.result.clone(),
            operations,
            station: station.map(|s| s.pos),
        });
        Self::pause(timings.craft_ms).await;

        let mut state = self.lock();
        if state.failing_crafts.contains(&recipe.result) {
            return Err(WorldError::Rejected(format!("crafting {} failed", recipe.result)));
        }
        if let Some(required) = &recipe.station {
            let present = station.is_some_and(|s| &state.block(s.pos) == required);
            if !present {
                return Err(WorldError::Rejected(format!("{required} required")));
            }
        }
        let mut consumed = Vec::with_capacity(recipe.ingredients.len());
        for (ingredient, per_op) in &recipe.ingredients {
            let enough = per_op
                .checked_mul(operations)
                .filter(|&n| state.inventory.count(ingredient.as_str()) >= n);
            let Some(n) = enough else {
                return Err(WorldError::Desync(format!("not enough {ingredient}")));
            };
            consumed.push((ingredient, n));
        }
        let Some(made) = recipe.yield_count.checked_mul(operations) else {
            return Err(WorldError::Rejected(format!("too many {}", recipe.result)));
        };
        for (ingredient, n) in consumed {
            state.inventory.remove(ingredient.as_str(), n);
        }
        state.inventory.add(recipe.result.clone(), made);
        Ok(())
    }

    fn inventory(&self) -> Inventory {
        self.lock().inventory.clone()
    }

    fn nearby_entities(&self, radius: f64) -> Vec<Entity> {
        let state = self.lock();
        let here = state.agent.position;
        state
            .entities
            .values()
            .filter(|e| e.position.distance(here) <= radius)
            .cloned()
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.lock().entities.get(&id).cloned()
    }

    fn player(&self, username: &str) -> Option<Entity> {
        self.lock()
            .entities
            .values()
            .find(|e| e.username() == Some(username))
            .cloned()
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        Some(Block {
            pos,
            id: self.lock().block(pos),
        })
    }

    fn find_blocks(&self, matching: &[ItemId], max_distance: u32, max_count: usize) -> Vec<BlockPos> {
        let state = self.lock();
        let here = state.agent.position;
        let mut found: Vec<(f64, BlockPos)> = state
            .blocks
            .iter()
            .filter(|(_, id)| matching.contains(id))
            .map(|(pos, _)| (pos.center().distance(here), *pos))
            .filter(|(d, _)| *d <= max_distance as f64)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().take(max_count).map(|(_, p)| p).collect()
    }

    fn status(&self) -> AgentStatus {
        self.lock().agent
    }
}

struct SimContainer {
    world: SimWorld,
    pos: BlockPos,
}

#[async_trait]
impl ContainerHandle for SimContainer {
    fn contents(&self) -> Inventory {
        let mut state = self.world.lock();
        state.settle_furnace(self.pos);
        state.containers.get(&self.pos).cloned().unwrap_or_default()
    }

    async fn deposit(&mut self, item: &ItemId, count: u32) -> WorldResult<()> {
        self.world.record(WorldCall::Deposit(item.clone(), count));
        let mut state = self.world.lock();
        if state.inventory.count(item.as_str()) < count {
            return Err(WorldError::Rejected(format!("not enough {item} to deposit")));
        }
        state.inventory.remove(item.as_str(), count);
        state
            .containers
            .entry(self.pos)
            .or_default()
            .add(item.clone(), count);
        state.settle_furnace(self.pos);
        Ok(())
    }

    async fn withdraw(&mut self, item: &ItemId, count: u32) -> WorldResult<()> {
        self.world.record(WorldCall::Withdraw(item.clone(), count));
        let mut state = self.world.lock();
        state.settle_furnace(self.pos);
        let container = state.containers.entry(self.pos).or_default();
        if container.count(item.as_str()) < count {
            return Err(WorldError::Desync(format!("container lacks {item}")));
        }
        container.remove(item.as_str(), count);
        state.inventory.add(item.clone(), count);
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.world.record(WorldCall::CloseContainer(self.pos));
    }
}
