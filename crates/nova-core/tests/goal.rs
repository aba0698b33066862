use nova_core::{BlockPos, EntityId, Goal, GoalKind, Vec3};

#[test]
fn zero_tolerance_point_becomes_exact_block_goal() {
    let goal = Goal::for_point(Vec3::new(10.7, 64.0, -3.2), 0.0);
    assert_eq!(goal.kind, GoalKind::ExactBlock);
    assert_eq!(goal.point().map(Vec3::floored), Some(BlockPos::new(10, 64, -4)));
    assert!(goal.is_satisfied(Vec3::new(10.1, 64.9, -3.9), None));
    assert!(!goal.is_satisfied(Vec3::new(11.0, 64.0, -3.9), None));
}

#[test]
fn near_point_respects_tolerance_and_clamps_negative() {
    let goal = Goal::for_point(Vec3::new(0.0, 0.0, 0.0), 2.0);
    assert_eq!(goal.kind, GoalKind::NearPoint);
    assert!(goal.is_satisfied(Vec3::new(1.5, 0.0, 0.0), None));
    assert!(!goal.is_satisfied(Vec3::new(2.5, 0.0, 0.0), None));

    let clamped = Goal::near_point(Vec3::ZERO, -4.0);
    assert_eq!(clamped.tolerance, 0.0);
}

#[test]
fn entity_goal_is_dynamic_and_needs_resolved_target() {
    let goal = Goal::near_entity(EntityId(7), 2.0);
    assert!(goal.dynamic);
    assert_eq!(goal.entity(), Some(EntityId(7)));
    assert!(!goal.is_satisfied(Vec3::ZERO, None));
    assert!(goal.is_satisfied(Vec3::ZERO, Some(Vec3::new(0.0, 0.0, 1.0))));
}

#[test]
fn inverted_goal_is_satisfied_far_from_target() {
    let goal = Goal::inverted(Vec3::new(5.0, 0.0, 5.0), 10.0);
    assert!(!goal.is_satisfied(Vec3::new(6.0, 0.0, 5.0), None));
    assert!(goal.is_satisfied(Vec3::new(20.0, 0.0, 5.0), None));
}
