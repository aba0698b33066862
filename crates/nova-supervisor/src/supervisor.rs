use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use nova_core::Goal;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::CancelFlag;

/// Identifies a skill instance competing for the drive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SkillId(pub &'static str);

impl core::fmt::Display for SkillId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0)
    }
}

/// Drive lock priority, lowest first.
///
/// A request preempts the holder only when its priority is strictly higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Plain navigation requests.
    Navigation,
    /// Mining, attacking, crafting.
    Task,
    /// Guarding a player / defending.
    Guard,
    /// Health-critical flight.
    Flee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeaseId(u64);

/// Why a lease holder must stop issuing world calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupt {
    #[error("stop requested")]
    Stopped,

    #[error("preempted by a higher-priority skill")]
    Preempted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SupervisorError {
    #[error("waiting request was withdrawn before the lock was granted")]
    Withdrawn,
}

struct Holder {
    lease: LeaseId,
    skill: SkillId,
    priority: Priority,
    preempted: CancelFlag,
}

struct Waiter {
    skill: SkillId,
    priority: Priority,
    tx: oneshot::Sender<DriveLease>,
}

#[derive(Default)]
struct LockState {
    holder: Option<Holder>,
    goal: Option<Goal>,
    waiters: BTreeMap<(Reverse<Priority>, u64), Waiter>,
    next_lease: u64,
    next_ticket: u64,
}

/// Owner of the single drive lock.
///
/// Cheap to clone; every clone refers to the same lock. One instance is
/// created per agent and handed to each skill at construction.
#[derive(Clone, Default)]
pub struct Supervisor {
    state: Arc<Mutex<LockState>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LockState> {
        // Bookkeeping is left consistent on every path, so a poisoned guard is
        // still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Try to take the drive lock without waiting.
    ///
    /// Grants immediately when free, preempts a strictly lower-priority
    /// holder, and returns `None` otherwise.
    pub fn acquire(&self, skill: SkillId, priority: Priority) -> Option<DriveLease> {
        let mut state = self.lock();
        self.try_grant(&mut state, skill, priority)
    }

    fn try_grant(
        &self,
        state: &mut LockState,
        skill: SkillId,
        priority: Priority,
    ) -> Option<DriveLease> {
        if let Some(holder) = state.holder.as_ref() {
            if priority <= holder.priority {
                tracing::trace!(
                    %skill,
                    holder = %holder.skill,
                    "drive lock busy"
                );
                return None;
            }
            tracing::info!(
                %skill,
                ?priority,
                preempted = %holder.skill,
                preempted_priority = ?holder.priority,
                "preempting drive lock holder"
            );
            holder.preempted.cancel();
            state.holder = None;
            state.goal = None;
        }
        Some(self.grant(state, skill, priority))
    }

    fn grant(&self, state: &mut LockState, skill: SkillId, priority: Priority) -> DriveLease {
        state.next_lease += 1;
        let lease = LeaseId(state.next_lease);
        let preempted = CancelFlag::new();
        state.holder = Some(Holder {
            lease,
            skill,
            priority,
            preempted: preempted.clone(),
        });
        tracing::debug!(%skill, ?priority, "drive lock granted");
        DriveLease {
            id: lease,
            skill,
            priority,
            preempted,
            supervisor: self.clone(),
        }
    }

    /// Take the drive lock, waiting in the priority queue while it is busy.
    ///
    /// Waiters are served highest priority first, FIFO within a priority.
    /// Dropping the returned future withdraws the request.
    pub async fn acquire_queued(
        &self,
        skill: SkillId,
        priority: Priority,
    ) -> Result<DriveLease, SupervisorError> {
        let (rx, ticket) = {
            let mut state = self.lock();
            if let Some(lease) = self.try_grant(&mut state, skill, priority) {
                return Ok(lease);
            }
            let (tx, rx) = oneshot::channel();
            state.next_ticket += 1;
            let ticket = (Reverse(priority), state.next_ticket);
            state.waiters.insert(ticket, Waiter { skill, priority, tx });
            tracing::debug!(%skill, ?priority, waiting = state.waiters.len(), "queued for drive lock");
            (rx, ticket)
        };

        let mut guard = WaitGuard {
            supervisor: self,
            ticket: Some(ticket),
        };
        let result = rx.await.map_err(|_| SupervisorError::Withdrawn);
        guard.ticket = None;
        result
    }

    /// Release the lock if `skill` holds it; no-op otherwise.
    pub fn release(&self, skill: SkillId) -> bool {
        let next = {
            let mut state = self.lock();
            match state.holder.as_ref() {
                Some(holder) if holder.skill == skill => {}
                _ => return false,
            }
            self.free_and_promote(&mut state)
        };
        Self::hand_over(next);
        true
    }

    fn release_lease(&self, lease: LeaseId) {
        let next = {
            let mut state = self.lock();
            match state.holder.as_ref() {
                Some(holder) if holder.lease == lease => {}
                _ => return,
            }
            self.free_and_promote(&mut state)
        };
        Self::hand_over(next);
    }

    fn free_and_promote(
        &self,
        state: &mut LockState,
    ) -> Option<(oneshot::Sender<DriveLease>, DriveLease)> {
        if let Some(holder) = state.holder.take() {
            // A lease that is no longer current must fail its next checkpoint.
            holder.preempted.cancel();
            tracing::debug!(skill = %holder.skill, "drive lock released");
        }
        state.goal = None;

        while let Some((_, waiter)) = state.waiters.pop_first() {
            if waiter.tx.is_closed() {
                continue;
            }
            let lease = self.grant(state, waiter.skill, waiter.priority);
            return Some((waiter.tx, lease));
        }
        None
    }

    // Must run without the state lock held: a refused lease is dropped here,
    // which re-enters `release_lease`.
    fn hand_over(next: Option<(oneshot::Sender<DriveLease>, DriveLease)>) {
        if let Some((tx, lease)) = next {
            if let Err(lease) = tx.send(lease) {
                drop(lease);
            }
        }
    }

    /// Drop every queued request; their `acquire_queued` calls fail with
    /// `SupervisorError::Withdrawn`.
    pub fn cancel_waiters(&self) {
        let waiters = std::mem::take(&mut self.lock().waiters);
        if !waiters.is_empty() {
            tracing::debug!(count = waiters.len(), "withdrawing queued drive lock requests");
        }
    }

    pub fn holder(&self) -> Option<(SkillId, Priority)> {
        self.lock().holder.as_ref().map(|h| (h.skill, h.priority))
    }

    pub fn is_held_by(&self, skill: SkillId) -> bool {
        self.lock()
            .holder
            .as_ref()
            .is_some_and(|h| h.skill == skill)
    }

    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Record the active goal. Only the current holder may set it.
    pub fn set_goal(&self, skill: SkillId, goal: Goal) -> bool {
        let mut state = self.lock();
        match state.holder.as_ref() {
            Some(holder) if holder.skill == skill => {
                state.goal = Some(goal);
                true
            }
            _ => false,
        }
    }

    pub fn current_goal(&self) -> Option<Goal> {
        self.lock().goal
    }

    fn set_goal_for_lease(&self, lease: LeaseId, goal: Option<Goal>) -> bool {
        let mut state = self.lock();
        match state.holder.as_ref() {
            Some(holder) if holder.lease == lease => {
                state.goal = goal;
                true
            }
            _ => false,
        }
    }

    fn lease_is_current(&self, lease: LeaseId) -> bool {
        self.lock()
            .holder
            .as_ref()
            .is_some_and(|h| h.lease == lease)
    }
}

struct WaitGuard<'a> {
    supervisor: &'a Supervisor,
    ticket: Option<(Reverse<Priority>, u64)>,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let waiter = self.supervisor.lock().waiters.remove(&ticket);
            drop(waiter);
        }
    }
}

/// Proof of holding the drive lock.
///
/// Dropping the lease releases the lock unless it was already preempted or
/// released, so a stale lease never frees a newer holder.
pub struct DriveLease {
    id: LeaseId,
    skill: SkillId,
    priority: Priority,
    preempted: CancelFlag,
    supervisor: Supervisor,
}

impl DriveLease {
    pub fn skill(&self) -> SkillId {
        self.skill
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_preempted(&self) -> bool {
        self.preempted.is_cancelled()
    }

    /// Whether this lease is still the live holder.
    pub fn is_current(&self) -> bool {
        self.supervisor.lease_is_current(self.id)
    }

    /// Gate for issuing the next world call.
    pub fn checkpoint(&self, stop: &CancelFlag) -> Result<(), Interrupt> {
        if self.preempted.is_cancelled() {
            return Err(Interrupt::Preempted);
        }
        if stop.is_cancelled() {
            return Err(Interrupt::Stopped);
        }
        Ok(())
    }

    pub fn set_goal(&self, goal: Goal) -> bool {
        self.supervisor.set_goal_for_lease(self.id, Some(goal))
    }

    pub fn clear_goal(&self) -> bool {
        self.supervisor.set_goal_for_lease(self.id, None)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DriveLease {
    fn drop(&mut self) {
        self.supervisor.release_lease(self.id);
    }
}

impl core::fmt::Debug for DriveLease {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriveLease")
            .field("id", &self.id)
            .field("skill", &self.skill)
            .field("priority", &self.priority)
            .field("preempted", &self.preempted.is_cancelled())
            .finish()
    }
}
