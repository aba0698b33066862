//! Actuation supervisor: the single drive lock that authorizes one skill at a
//! time to move or interact through the world interface.
//!
//! Preemption is cooperative. A preempted holder keeps its `DriveLease` but the
//! lease's checkpoint fails, and the holder is expected to return before
//! issuing another world call.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod supervisor;

pub use cancel::CancelFlag;
pub use supervisor::{
    DriveLease, Interrupt, LeaseId, Priority, SkillId, Supervisor, SupervisorError,
};
