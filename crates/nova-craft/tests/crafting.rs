use std::sync::Arc;

use nova_core::{AgentConfig, BlockPos, ItemId, Recipe, SharedWorld, WorldInterface};
use nova_craft::{placement_spots, CraftError, CraftState, Crafter};
use nova_sim::{Scenario, SimWorld, WorldCall};
use nova_skills::{Skill, SkillContext};
use nova_supervisor::{Priority, SkillId, Supervisor};

fn planks() -> Recipe {
    Recipe::new("oak_planks", 4).with_ingredient("oak_log", 1)
}

fn table() -> Recipe {
    Recipe::new("crafting_table", 1).with_ingredient("oak_planks", 4)
}

fn sticks() -> Recipe {
    Recipe::new("stick", 4).with_ingredient("oak_planks", 2)
}

fn pickaxe() -> Recipe {
    Recipe::new("wooden_pickaxe", 1)
        .with_ingredient("oak_planks", 3)
        .with_ingredient("stick", 2)
        .with_station("crafting_table")
}

fn setup_with(scenario: Scenario, config: AgentConfig) -> (SimWorld, Supervisor, Crafter) {
    let world = SimWorld::new(scenario);
    let shared: SharedWorld = Arc::new(world.clone());
    let supervisor = Supervisor::new();
    let ctx = SkillContext::new(supervisor.clone(), shared, config);
    (world, supervisor, Crafter::new(ctx))
}

fn setup(scenario: Scenario) -> (SimWorld, Supervisor, Crafter) {
    setup_with(scenario.with_ground(-1, "grass_block", 16), AgentConfig::default())
}

fn crafted(world: &SimWorld) -> Vec<(String, u32)> {
    world
        .craft_calls()
        .into_iter()
        .map(|(item, ops)| (item.as_str().to_string(), ops))
        .collect()
}

fn places(world: &SimWorld) -> Vec<BlockPos> {
    world
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            WorldCall::Place { anchor, face, .. } => Some(anchor + face),
            _ => None,
        })
        .collect()
}

fn craft_station(world: &SimWorld) -> Option<BlockPos> {
    world.calls().into_iter().rev().find_map(|c| match c {
        WorldCall::Craft { station, .. } => station,
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn enough_on_hand_makes_no_world_calls() {
    let (world, supervisor, crafter) =
        setup(Scenario::default().with_item("oak_planks", 4).with_recipe(planks()));

    // Even a busy drive lock does not matter when nothing has to be made.
    let _held = supervisor
        .acquire(SkillId("combat"), Priority::Flee)
        .expect("free lock");

    let report = crafter.craft("Oak Planks", 4).await.expect("on hand");
    assert!(report.was_on_hand());
    assert_eq!(report.item.as_str(), "oak_planks");
    assert!(world.calls().is_empty());
    assert_eq!(world.inventory().count("oak_planks"), 4);
}

#[tokio::test(start_paused = true)]
async fn resolves_ingredients_depth_first() {
    let (world, supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_log", 1)
            .with_item("stick", 2)
            .with_recipe(planks())
            .with_recipe(table()),
    );

    let report = crafter.craft("crafting_table", 1).await.expect("craftable");

    assert_eq!(
        crafted(&world),
        vec![("oak_planks".to_string(), 1), ("crafting_table".to_string(), 1)]
    );
    let steps: Vec<&str> = report.steps.iter().map(|n| n.item.as_str()).collect();
    assert_eq!(steps, vec!["oak_planks", "crafting_table"]);
    assert_eq!(report.operations(), 2);

    let inventory = world.inventory();
    assert_eq!(inventory.count("crafting_table"), 1);
    assert_eq!(inventory.count("oak_log"), 0);
    assert_eq!(inventory.count("oak_planks"), 0);
    assert_eq!(inventory.count("stick"), 2);
    assert_eq!(supervisor.holder(), None);
    assert_eq!(crafter.state(), CraftState::Idle);
}

#[tokio::test(start_paused = true)]
async fn batches_operations_by_recipe_yield() {
    let (world, _supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_planks", 10)
            .with_recipe(sticks()),
    );

    crafter.craft("stick", 10).await.expect("craftable");

    assert_eq!(crafted(&world), vec![("stick".to_string(), 3)]);
    assert_eq!(world.inventory().count("stick"), 12);
    assert_eq!(world.inventory().count("oak_planks"), 4);
}

#[tokio::test(start_paused = true)]
async fn recipe_cycle_reports_missing_resource() {
    let (world, supervisor, crafter) = setup(
        Scenario::default()
            .with_recipe(Recipe::new("widget_a", 1).with_ingredient("widget_b", 1))
            .with_recipe(Recipe::new("widget_b", 1).with_ingredient("widget_a", 1)),
    );

    let err = crafter.craft("widget_a", 1).await.unwrap_err();

    assert_eq!(
        err,
        CraftError::ResourceMissing {
            item: ItemId::from("widget_a")
        }
    );
    assert!(crafted(&world).is_empty());
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn unknown_item_reports_itself_missing() {
    let (world, _supervisor, crafter) = setup(Scenario::default().with_recipe(table()));

    let err = crafter.craft("crafting_table", 1).await.unwrap_err();

    // The deepest item that could not be produced.
    assert_eq!(
        err,
        CraftError::ResourceMissing {
            item: ItemId::from("oak_planks")
        }
    );
    assert!(world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn chain_deeper_than_max_depth_fails() {
    let mut config = AgentConfig::default();
    config.crafting.max_depth = 1;
    let (world, _supervisor, crafter) = setup_with(
        Scenario::default()
            .with_ground(-1, "grass_block", 16)
            .with_item("oak_log", 1)
            .with_recipe(planks())
            .with_recipe(table()),
        config,
    );

    let err = crafter.craft("crafting_table", 1).await.unwrap_err();

    assert_eq!(
        err,
        CraftError::ResourceMissing {
            item: ItemId::from("oak_planks")
        }
    );
    assert!(crafted(&world).is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_craft_is_a_world_error() {
    let mut scenario = Scenario::default()
        .with_item("oak_log", 1)
        .with_recipe(planks());
    scenario.failing_crafts.push(ItemId::from("oak_planks"));
    let (_world, supervisor, crafter) = setup(scenario);

    let err = crafter.craft("oak_planks", 4).await.unwrap_err();

    assert!(matches!(err, CraftError::World { ref item, .. } if item.as_str() == "oak_planks"));
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn uses_an_existing_station_in_range() {
    let table_pos = BlockPos::new(6, 0, 0);
    let (world, _supervisor, crafter) = setup(
        Scenario::default()
            .with_block(table_pos, "crafting_table")
            .with_item("oak_planks", 3)
            .with_item("stick", 2)
            .with_recipe(pickaxe()),
    );

    crafter.craft("wooden_pickaxe", 1).await.expect("craftable");

    assert!(places(&world).is_empty());
    assert_eq!(craft_station(&world), Some(table_pos));
    assert!(world
        .calls()
        .iter()
        .any(|c| matches!(c, WorldCall::MoveTo(_))));
    assert_eq!(world.inventory().count("wooden_pickaxe"), 1);
}

#[tokio::test(start_paused = true)]
async fn places_a_station_from_the_inventory() {
    let (world, _supervisor, crafter) = setup(
        Scenario::default()
            .with_item("crafting_table", 1)
            .with_item("oak_planks", 3)
            .with_item("stick", 2)
            .with_recipe(pickaxe()),
    );

    crafter.craft("wooden_pickaxe", 1).await.expect("craftable");

    let spot = BlockPos::new(1, 0, 0);
    assert_eq!(places(&world), vec![spot]);
    assert_eq!(world.block_id(spot).as_str(), "crafting_table");
    assert_eq!(craft_station(&world), Some(spot));
    assert_eq!(crafted(&world), vec![("wooden_pickaxe".to_string(), 1)]);
    assert_eq!(world.inventory().count("crafting_table"), 0);
}

#[tokio::test(start_paused = true)]
async fn crafts_then_places_a_missing_station() {
    let (world, _supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_planks", 7)
            .with_item("stick", 2)
            .with_recipe(table())
            .with_recipe(pickaxe()),
    );

    let report = crafter.craft("wooden_pickaxe", 1).await.expect("craftable");

    assert_eq!(
        crafted(&world),
        vec![("crafting_table".to_string(), 1), ("wooden_pickaxe".to_string(), 1)]
    );
    let steps: Vec<&str> = report.steps.iter().map(|n| n.item.as_str()).collect();
    assert_eq!(steps, vec!["crafting_table", "wooden_pickaxe"]);
    assert_eq!(places(&world), vec![BlockPos::new(1, 0, 0)]);
    assert_eq!(world.inventory().count("oak_planks"), 0);
}

#[tokio::test(start_paused = true)]
async fn regathers_ingredients_the_station_used_up() {
    let (world, _supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_log", 1)
            .with_item("oak_planks", 4)
            .with_item("stick", 2)
            .with_recipe(planks())
            .with_recipe(table())
            .with_recipe(pickaxe()),
    );

    crafter.craft("wooden_pickaxe", 1).await.expect("craftable");

    assert_eq!(
        crafted(&world),
        vec![
            ("crafting_table".to_string(), 1),
            ("oak_planks".to_string(), 1),
            ("wooden_pickaxe".to_string(), 1),
        ]
    );
    assert_eq!(world.inventory().count("oak_planks"), 1);
    assert_eq!(world.inventory().count("wooden_pickaxe"), 1);
}

#[tokio::test(start_paused = true)]
async fn placement_skips_blocked_offsets() {
    let scenario = Scenario::default()
        .with_ground(-1, "grass_block", 16)
        .with_block(BlockPos::new(1, 0, 0), "stone")
        .with_block(BlockPos::new(-1, -1, 0), "water")
        .with_item("crafting_table", 1)
        .with_item("oak_planks", 3)
        .with_item("stick", 2)
        .with_recipe(pickaxe());
    let (world, _supervisor, crafter) = setup_with(scenario, AgentConfig::default());

    let spots = placement_spots(&world, BlockPos::new(0, 0, 0));
    assert_eq!(spots.first(), Some(&BlockPos::new(0, 0, 1)));
    assert!(!spots.contains(&BlockPos::new(1, 0, 0)));
    assert!(!spots.contains(&BlockPos::new(-1, 0, 0)));
    assert_eq!(spots.len(), 6);

    crafter.craft("wooden_pickaxe", 1).await.expect("craftable");
    assert_eq!(places(&world), vec![BlockPos::new(0, 0, 1)]);
}

#[tokio::test(start_paused = true)]
async fn station_unavailable_without_recipe_or_item() {
    let (world, supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_planks", 3)
            .with_item("stick", 2)
            .with_recipe(pickaxe()),
    );

    let err = crafter.craft("wooden_pickaxe", 1).await.unwrap_err();

    assert_eq!(
        err,
        CraftError::StationUnavailable {
            station: ItemId::from("crafting_table"),
            cause: Some(Box::new(CraftError::ResourceMissing {
                item: ItemId::from("crafting_table")
            })),
        }
    );
    assert!(crafted(&world).is_empty());
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn station_failure_keeps_the_deepest_missing_item() {
    let (world, _supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_planks", 3)
            .with_item("stick", 2)
            .with_recipe(planks())
            .with_recipe(table())
            .with_recipe(pickaxe()),
    );

    let err = crafter.craft("wooden_pickaxe", 1).await.unwrap_err();

    assert!(matches!(err, CraftError::StationUnavailable { ref station, .. } if station.as_str() == "crafting_table"));
    assert_eq!(err.missing_item(), Some(&ItemId::from("oak_log")));
    let source = std::error::Error::source(&err).expect("station cause");
    assert_eq!(source.to_string(), "missing resource: oak_log");
    assert!(crafted(&world).is_empty());
}

#[tokio::test(start_paused = true)]
async fn huge_counts_fail_instead_of_overflowing() {
    let (world, supervisor, crafter) = setup(
        Scenario::default()
            .with_recipe(Recipe::new("widget", 1).with_ingredient("gear", 3))
            .with_recipe(Recipe::new("gear", 1).with_ingredient("ore", 1)),
    );

    let err = crafter.craft("widget", 2_000_000_000).await.unwrap_err();

    assert_eq!(
        err,
        CraftError::ResourceMissing {
            item: ItemId::from("gear")
        }
    );
    assert!(crafted(&world).is_empty());
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn station_unavailable_with_nowhere_to_place() {
    // No ground: every ring spot lacks a solid block below.
    let (world, _supervisor, crafter) = setup_with(
        Scenario::default()
            .with_item("crafting_table", 1)
            .with_item("oak_planks", 3)
            .with_item("stick", 2)
            .with_recipe(pickaxe()),
        AgentConfig::default(),
    );

    let err = crafter.craft("wooden_pickaxe", 1).await.unwrap_err();

    assert!(matches!(err, CraftError::StationUnavailable { .. }));
    assert!(places(&world).is_empty());
    assert_eq!(world.inventory().count("crafting_table"), 1);
}

#[tokio::test(start_paused = true)]
async fn busy_when_an_equal_or_higher_skill_drives() {
    let (world, supervisor, crafter) = setup(
        Scenario::default()
            .with_item("oak_log", 1)
            .with_recipe(planks()),
    );

    let held = supervisor
        .acquire(SkillId("mining"), Priority::Task)
        .expect("free lock");
    assert_eq!(crafter.craft("oak_planks", 4).await, Err(CraftError::Busy));
    drop(held);

    let _guard = supervisor
        .acquire(SkillId("combat"), Priority::Guard)
        .expect("free lock");
    assert_eq!(crafter.craft("oak_planks", 4).await, Err(CraftError::Busy));
    assert!(world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn recipe_queries_do_not_take_the_lock() {
    let (_world, supervisor, crafter) = setup(
        Scenario::default()
            .with_recipe(planks())
            .with_recipe(sticks()),
    );
    let _held = supervisor
        .acquire(SkillId("combat"), Priority::Flee)
        .expect("free lock");

    assert!(crafter.can_craft("Oak Planks", 8));
    assert!(!crafter.can_craft("diamond_sword", 1));
    assert_eq!(crafter.recipes("stick"), vec![sticks()]);
    assert_eq!(crafter.id(), Crafter::ID);
    assert_eq!(crafter.priority(), Priority::Task);
    assert!(!crafter.is_active());
}
