use nova_core::WorldError;
use nova_supervisor::Interrupt;
use thiserror::Error;

/// Why a skill run ended without completing.
///
/// Public operations fold these into their plain return values; the error is
/// logged where it is caught.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkillError {
    #[error("drive lock is held by another skill")]
    Busy,

    #[error(transparent)]
    Interrupted(#[from] Interrupt),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error("{0} not found")]
    NotFound(String),
}

impl SkillError {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, SkillError::Interrupted(_))
    }
}

pub type SkillResult<T> = Result<T, SkillError>;
