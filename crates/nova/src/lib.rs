//! Umbrella crate that re-exports the `nova-*` building blocks and hosts the
//! [`Agent`] composition root.
//!
//! Without default features only the shared vocabulary (`core`) and the drive
//! lock (`supervisor`) are available.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub use nova_core as core;
pub use nova_supervisor as supervisor;

#[cfg(feature = "skills")]
#[cfg_attr(docsrs, doc(cfg(feature = "skills")))]
pub use nova_skills as skills;

#[cfg(feature = "craft")]
#[cfg_attr(docsrs, doc(cfg(feature = "craft")))]
pub use nova_craft as craft;

#[cfg(feature = "sim")]
#[cfg_attr(docsrs, doc(cfg(feature = "sim")))]
pub use nova_sim as sim;

#[cfg(feature = "craft")]
#[cfg_attr(docsrs, doc(cfg(feature = "craft")))]
pub mod agent;

#[cfg(feature = "craft")]
pub use agent::Agent;
