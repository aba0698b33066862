use std::sync::Arc;
use std::time::Duration;

use nova_core::{AgentConfig, EntityId, EquipSlot, Goal, GoalKind, ItemId, SharedWorld, Vec3};
use nova_sim::{mob, player, Scenario, SimWorld, WorldCall};
use nova_skills::{Combat, CombatState, Skill, SkillContext};
use nova_supervisor::{Priority, SkillId, Supervisor};

fn setup(scenario: Scenario) -> (SimWorld, Supervisor, Combat) {
    let world = SimWorld::new(scenario.with_ground(-1, "stone", 32));
    let shared: SharedWorld = Arc::new(world.clone());
    let supervisor = Supervisor::new();
    let ctx = SkillContext::new(supervisor.clone(), shared, AgentConfig::default());
    (world, supervisor, Combat::new(ctx))
}

#[tokio::test(start_paused = true)]
async fn attack_equips_best_weapon_and_holds_lock_until_it_ends() {
    let (world, supervisor, combat) = setup(
        Scenario::default()
            .with_item("wooden_axe", 1)
            .with_item("iron_sword", 1)
            .with_entity(mob(7, "zombie", Vec3::new(2.0, 0.0, 0.0))),
    );
    let zombie = EntityId(7);

    assert!(combat.attack(zombie).await);

    assert_eq!(
        world.calls(),
        vec![
            WorldCall::Equip(ItemId::from("iron_sword"), EquipSlot::Hand),
            WorldCall::Attack(zombie),
        ]
    );
    assert_eq!(combat.state(), CombatState::Attacking(zombie));
    assert_eq!(supervisor.holder(), Some((Combat::ID, Priority::Task)));

    combat.on_attack_ended();
    assert_eq!(combat.state(), CombatState::Idle);
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn attack_without_target_or_lock_fails() {
    let (world, supervisor, combat) =
        setup(Scenario::default().with_entity(mob(7, "zombie", Vec3::new(2.0, 0.0, 0.0))));

    assert!(!combat.attack(EntityId(99)).await);
    assert!(world.calls().is_empty());

    let _crafter = supervisor
        .acquire(SkillId("crafting"), Priority::Task)
        .unwrap();
    assert!(!combat.attack(EntityId(7)).await);
    assert!(!combat.is_attacking());
}

#[tokio::test(start_paused = true)]
async fn attack_nearest_hostile_ignores_players_and_passive_mobs() {
    let (world, _supervisor, combat) = setup(
        Scenario::default()
            .with_entity(player(1, "alex", Vec3::new(1.0, 0.0, 0.0)))
            .with_entity(mob(2, "cow", Vec3::new(2.0, 0.0, 0.0)))
            .with_entity(mob(3, "skeleton", Vec3::new(9.0, 0.0, 0.0)))
            .with_entity(mob(4, "zombie", Vec3::new(5.0, 0.0, 0.0))),
    );

    assert!(combat.attack_nearest_hostile().await);
    assert_eq!(world.attacking(), Some(EntityId(4)));
}

#[tokio::test(start_paused = true)]
async fn defend_loop_attacks_nearest_hostile_at_guard_priority() {
    let (world, supervisor, combat) = setup(
        Scenario::default()
            .with_entity(mob(3, "skeleton", Vec3::new(6.0, 0.0, 0.0)))
            .with_entity(mob(4, "zombie", Vec3::new(4.0, 0.0, 0.0)))
            .with_entity(mob(5, "creeper", Vec3::new(20.0, 0.0, 0.0))),
    );

    // Guard outranks a running navigation.
    let nav = supervisor
        .acquire(SkillId("pathfinding"), Priority::Navigation)
        .unwrap();

    assert!(combat.start_defending());
    assert!(!combat.start_defending());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(combat.target(), Some(EntityId(4)));
    assert_eq!(supervisor.holder(), Some((Combat::ID, Priority::Guard)));
    assert!(nav.is_preempted());
    assert_eq!(world.attacking(), Some(EntityId(4)));

    combat.stop_defending();
    assert_eq!(combat.state(), CombatState::Idle);
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn defend_loop_flees_at_low_health() {
    let (world, supervisor, combat) =
        setup(Scenario::default().with_entity(mob(4, "zombie", Vec3::new(3.0, 0.0, 0.0))));
    world.set_health(4.0);

    assert!(combat.start_defending());
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(!combat.is_defending());
    assert!(world
        .calls()
        .iter()
        .all(|c| !matches!(c, WorldCall::Attack(_))));
    let fled = world.calls().into_iter().any(|c| {
        matches!(c, WorldCall::MoveTo(goal) if goal.kind == GoalKind::Inverted)
    });
    assert!(fled);
    // Escape point is the agent mirrored past the threat, twice as far.
    assert_eq!(world.position(), Vec3::new(-6.0, 0.0, 0.0));
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn defend_tick_is_a_no_op_after_stop_defending() {
    let (world, supervisor, combat) =
        setup(Scenario::default().with_entity(mob(4, "zombie", Vec3::new(3.0, 0.0, 0.0))));

    assert!(combat.start_defending());
    combat.stop_defending();
    combat.defend_tick().await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(world.calls().is_empty());
    assert_eq!(supervisor.holder(), None);
    assert_eq!(combat.state(), CombatState::Idle);
}

#[tokio::test(start_paused = true)]
async fn guard_follows_player_and_switches_goal_during_attacks() {
    let (world, supervisor, combat) = setup(
        Scenario::default()
            .with_entity(player(1, "alex", Vec3::new(10.0, 0.0, 0.0)))
            .with_entity(mob(9, "zombie", Vec3::new(60.0, 0.0, 0.0))),
    );
    let alex = EntityId(1);
    let zombie = EntityId(9);

    assert!(combat.guard("alex"));
    assert_eq!(combat.state(), CombatState::Guarding("alex".to_string()));
    assert_eq!(supervisor.holder(), Some((Combat::ID, Priority::Guard)));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(world.position().distance(Vec3::new(10.0, 0.0, 0.0)) <= 2.0);

    world.move_entity(zombie, Vec3::new(12.0, 0.0, 0.0));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(combat.target(), Some(zombie));
    assert_eq!(supervisor.current_goal(), Some(Goal::near_entity(zombie, 3.0)));
    // The attack rides the guard lease.
    assert_eq!(supervisor.holder(), Some((Combat::ID, Priority::Guard)));

    world.remove_entity(zombie);
    combat.on_attack_ended();
    assert_eq!(supervisor.current_goal(), Some(Goal::near_entity(alex, 2.0)));

    combat.stop_guarding();
    assert_eq!(supervisor.holder(), None);
    assert_eq!(combat.state(), CombatState::Idle);
}

#[tokio::test(start_paused = true)]
async fn guard_stops_following_once_its_lock_is_released() {
    let (world, supervisor, combat) =
        setup(Scenario::default().with_entity(player(1, "alex", Vec3::new(10.0, 0.0, 0.0))));

    assert!(combat.guard("alex"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(world.position().distance(Vec3::new(10.0, 0.0, 0.0)) <= 2.0);

    assert!(supervisor.release(Combat::ID));
    let nav = supervisor
        .acquire(SkillId("pathfinding"), Priority::Navigation)
        .expect("lock is free");
    world.clear_calls();
    world.move_entity(EntityId(1), Vec3::new(30.0, 0.0, 0.0));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!world
        .calls()
        .iter()
        .any(|c| matches!(c, WorldCall::MoveTo(_))));
    assert!(!combat.is_guarding());
    assert!(nav.is_current());
}

#[tokio::test(start_paused = true)]
async fn flee_preempts_a_running_task() {
    let (world, supervisor, combat) = setup(
        Scenario::default()
            .with_entity(mob(4, "zombie", Vec3::new(0.0, 0.0, 4.0)))
            .with_entity(mob(5, "spider", Vec3::new(0.0, 0.0, 6.0))),
    );
    let miner = supervisor
        .acquire(SkillId("mining"), Priority::Task)
        .unwrap();

    assert!(combat.flee().await);

    assert!(miner.is_preempted());
    assert!(world.position().z < 0.0);
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn flee_without_threats_does_nothing() {
    let (world, _supervisor, combat) =
        setup(Scenario::default().with_entity(mob(2, "cow", Vec3::new(2.0, 0.0, 0.0))));

    assert!(!combat.flee().await);
    assert!(world.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_ends_every_combat_mode() {
    let (_world, supervisor, combat) = setup(
        Scenario::default()
            .with_entity(player(1, "alex", Vec3::new(1.0, 0.0, 0.0)))
            .with_entity(mob(4, "zombie", Vec3::new(3.0, 0.0, 0.0))),
    );

    assert!(combat.guard("alex"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(combat.is_active());

    combat.stop();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!combat.is_active());
    assert_eq!(supervisor.holder(), None);
}
