use std::time::Duration;

use nova_core::{Goal, Vec3};
use nova_supervisor::{CancelFlag, Interrupt, Priority, SkillId, Supervisor, SupervisorError};

const NAV: SkillId = SkillId("pathfinding");
const MINER: SkillId = SkillId("mining");
const CRAFTER: SkillId = SkillId("crafting");
const COMBAT: SkillId = SkillId("combat");

#[test]
fn free_lock_is_granted_and_busy_lock_is_refused() {
    let supervisor = Supervisor::new();

    let lease = supervisor.acquire(MINER, Priority::Task).expect("lock is free");
    assert_eq!(supervisor.holder(), Some((MINER, Priority::Task)));

    // Equal and lower priorities never preempt.
    assert!(supervisor.acquire(CRAFTER, Priority::Task).is_none());
    assert!(supervisor.acquire(NAV, Priority::Navigation).is_none());
    assert!(supervisor.is_held_by(MINER));
    assert!(!lease.is_preempted());

    drop(lease);
    assert_eq!(supervisor.holder(), None);
}

#[test]
fn higher_priority_preempts_and_holder_observes_it() {
    let supervisor = Supervisor::new();
    let stop = CancelFlag::new();

    let miner = supervisor.acquire(MINER, Priority::Task).unwrap();
    assert_eq!(miner.checkpoint(&stop), Ok(()));

    let flee = supervisor.acquire(COMBAT, Priority::Flee).expect("flee preempts");
    assert!(miner.is_preempted());
    assert!(!miner.is_current());
    assert_eq!(miner.checkpoint(&stop), Err(Interrupt::Preempted));
    assert_eq!(supervisor.holder(), Some((COMBAT, Priority::Flee)));

    // The preempted lease going away must not free the new holder.
    drop(miner);
    assert!(supervisor.is_held_by(COMBAT));
    assert!(flee.is_current());
}

#[test]
fn release_is_idempotent_and_ignores_non_holders() {
    let supervisor = Supervisor::new();
    let lease = supervisor.acquire(MINER, Priority::Task).unwrap();

    assert!(!supervisor.release(NAV));
    assert!(supervisor.is_held_by(MINER));

    assert!(supervisor.release(MINER));
    assert!(!supervisor.release(MINER));
    assert_eq!(supervisor.holder(), None);

    // A later holder is not freed by the stale lease.
    let crafter = supervisor.acquire(CRAFTER, Priority::Task).unwrap();
    drop(lease);
    assert!(supervisor.is_held_by(CRAFTER));
    drop(crafter);
}

#[test]
fn release_by_skill_fails_the_old_lease_checkpoint() {
    let supervisor = Supervisor::new();
    let stop = CancelFlag::new();
    let miner = supervisor.acquire(MINER, Priority::Task).unwrap();

    assert!(supervisor.release(MINER));
    let nav = supervisor.acquire(NAV, Priority::Navigation).unwrap();

    assert_eq!(miner.checkpoint(&stop), Err(Interrupt::Preempted));
    assert!(miner.is_preempted());
    assert!(!miner.is_current());
    assert_eq!(nav.checkpoint(&stop), Ok(()));
    drop(miner);
    assert!(supervisor.is_held_by(NAV));
}

#[test]
fn only_the_holder_sets_the_goal_and_release_clears_it() {
    let supervisor = Supervisor::new();
    let goal = Goal::near_point(Vec3::new(1.0, 2.0, 3.0), 2.0);

    assert!(!supervisor.set_goal(NAV, goal));
    let lease = supervisor.acquire(NAV, Priority::Navigation).unwrap();
    assert!(!supervisor.set_goal(MINER, goal));
    assert!(supervisor.set_goal(NAV, goal));
    assert_eq!(supervisor.current_goal(), Some(goal));

    assert!(lease.clear_goal());
    assert_eq!(supervisor.current_goal(), None);
    assert!(lease.set_goal(goal));
    drop(lease);
    assert_eq!(supervisor.current_goal(), None);
}

#[test]
fn stop_flag_interrupts_checkpoint() {
    let supervisor = Supervisor::new();
    let stop = CancelFlag::new();
    let lease = supervisor.acquire(MINER, Priority::Task).unwrap();

    stop.cancel();
    assert_eq!(lease.checkpoint(&stop), Err(Interrupt::Stopped));
    // Stopping does not release by itself; the owner returns and drops.
    assert!(supervisor.is_held_by(MINER));
}

#[tokio::test]
async fn waiters_are_served_by_priority_then_arrival() {
    let supervisor = Supervisor::new();
    let holder = supervisor.acquire(NAV, Priority::Guard).unwrap();

    let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for (skill, priority) in [
        (SkillId("task-a"), Priority::Task),
        (SkillId("nav-b"), Priority::Navigation),
        (SkillId("task-c"), Priority::Task),
        (SkillId("guard-d"), Priority::Guard),
    ] {
        let supervisor = supervisor.clone();
        let order = order.clone();
        handles.push(tokio::spawn(async move {
            let lease = supervisor.acquire_queued(skill, priority).await.unwrap();
            order.lock().unwrap().push(skill.0);
            tokio::task::yield_now().await;
            drop(lease);
        }));
        // Let the task enqueue before the next one arrives.
        tokio::task::yield_now().await;
    }
    assert_eq!(supervisor.waiting(), 4);

    drop(holder);
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(
        *order.lock().unwrap(),
        vec!["guard-d", "task-a", "task-c", "nav-b"]
    );
    assert_eq!(supervisor.holder(), None);
    assert_eq!(supervisor.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_wait_is_withdrawn_from_the_queue() {
    let supervisor = Supervisor::new();
    let holder = supervisor.acquire(MINER, Priority::Task).unwrap();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(100),
        supervisor.acquire_queued(CRAFTER, Priority::Task),
    )
    .await;
    assert!(timed_out.is_err());
    assert_eq!(supervisor.waiting(), 0);

    drop(holder);
    assert_eq!(supervisor.holder(), None);
}

#[tokio::test]
async fn cancelled_waiters_fail_with_withdrawn() {
    let supervisor = Supervisor::new();
    let _holder = supervisor.acquire(MINER, Priority::Task).unwrap();

    let waiting = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.acquire_queued(CRAFTER, Priority::Task).await })
    };
    tokio::task::yield_now().await;
    assert_eq!(supervisor.waiting(), 1);

    supervisor.cancel_waiters();
    let result = waiting.await.unwrap();
    assert_eq!(result.unwrap_err(), SupervisorError::Withdrawn);
}

#[test]
fn at_most_one_holder_across_mixed_requests() {
    let supervisor = Supervisor::new();
    let requests = [
        (SkillId("a"), Priority::Navigation),
        (SkillId("b"), Priority::Task),
        (SkillId("c"), Priority::Task),
        (SkillId("d"), Priority::Flee),
        (SkillId("e"), Priority::Guard),
    ];

    let mut leases = Vec::new();
    for (skill, priority) in requests {
        if let Some(lease) = supervisor.acquire(skill, priority) {
            leases.push(lease);
        }
        let live = leases.iter().filter(|l| l.is_current()).count();
        assert!(live <= 1);
    }

    // a, then b preempts a, c refused, d preempts b, e refused.
    let granted: Vec<&str> = leases.iter().map(|l| l.skill().0).collect();
    assert_eq!(granted, vec!["a", "b", "d"]);
    assert_eq!(supervisor.holder(), Some((SkillId("d"), Priority::Flee)));
}
