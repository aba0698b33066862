use std::sync::{Arc, Mutex, MutexGuard};

use nova_core::{AgentConfig, SharedWorld};
use nova_supervisor::{CancelFlag, Priority, SkillId, Supervisor};

/// Shared surface every long-running skill exposes to the agent.
pub trait Skill: Send + Sync {
    fn id(&self) -> SkillId;

    /// Priority the skill's primary operations request the drive lock at.
    fn priority(&self) -> Priority;

    fn is_active(&self) -> bool;

    /// Request cooperative cancellation of the current run.
    ///
    /// The in-flight world call (if any) is allowed to finish; the run then
    /// issues nothing further and releases the drive lock.
    fn stop(&self);
}

/// Handles a skill needs to act: the drive lock, the world and configuration.
#[derive(Clone)]
pub struct SkillContext {
    pub supervisor: Supervisor,
    pub world: SharedWorld,
    pub config: Arc<AgentConfig>,
}

impl SkillContext {
    pub fn new(supervisor: Supervisor, world: SharedWorld, config: AgentConfig) -> Self {
        Self {
            supervisor,
            world,
            config: Arc::new(config),
        }
    }
}

/// Identifies one run of a skill and carries its stop flag.
#[derive(Debug, Clone)]
pub struct RunToken {
    generation: u64,
    stop: CancelFlag,
}

impl RunToken {
    pub fn stop_flag(&self) -> &CancelFlag {
        &self.stop
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

struct Run<S> {
    state: S,
    generation: u64,
    stop: CancelFlag,
}

/// Current state and stop flag of a skill.
///
/// Each `begin` starts a new run with a fresh flag; `finish` only resets the
/// state if no newer run has started since.
pub struct RunSlot<S> {
    run: Mutex<Run<S>>,
}

impl<S> Default for RunSlot<S>
where
    S: Clone + Default + PartialEq,
{
    fn default() -> Self {
        Self {
            run: Mutex::new(Run {
                state: S::default(),
                generation: 0,
                stop: CancelFlag::new(),
            }),
        }
    }
}

impl<S> RunSlot<S>
where
    S: Clone + Default + PartialEq,
{
    fn lock(&self) -> MutexGuard<'_, Run<S>> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn begin(&self, state: S) -> RunToken {
        let mut run = self.lock();
        run.generation += 1;
        run.stop = CancelFlag::new();
        run.state = state;
        RunToken {
            generation: run.generation,
            stop: run.stop.clone(),
        }
    }

    /// Update the state of `token`'s run; ignored once a newer run began.
    pub fn set(&self, token: &RunToken, state: S) {
        let mut run = self.lock();
        if run.generation == token.generation {
            run.state = state;
        }
    }

    pub fn finish(&self, token: &RunToken) {
        self.set(token, S::default());
    }

    pub fn state(&self) -> S {
        self.lock().state.clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().state != S::default()
    }

    pub fn stop(&self) {
        self.lock().stop.cancel();
    }
}
