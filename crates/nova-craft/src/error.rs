use nova_core::{ItemId, WorldError};
use nova_supervisor::Interrupt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    #[error("drive lock is held by another skill")]
    Busy,

    /// Deepest item the resolver could neither find nor craft.
    #[error("missing resource: {item}")]
    ResourceMissing { item: ItemId },

    /// `cause` is why the station could not be crafted, when that was tried.
    #[error("no {station} available")]
    StationUnavailable {
        station: ItemId,
        #[source]
        cause: Option<Box<CraftError>>,
    },

    #[error("world call failed for {item}: {source}")]
    World {
        item: ItemId,
        #[source]
        source: WorldError,
    },

    #[error("crafting cancelled")]
    Cancelled,
}

impl From<Interrupt> for CraftError {
    fn from(_: Interrupt) -> Self {
        CraftError::Cancelled
    }
}

impl CraftError {
    /// The deepest item that could not be produced, following station causes.
    pub fn missing_item(&self) -> Option<&ItemId> {
        match self {
            CraftError::ResourceMissing { item } => Some(item),
            CraftError::StationUnavailable {
                cause: Some(cause), ..
            } => cause.missing_item(),
            _ => None,
        }
    }

    pub(crate) fn no_station(station: &ItemId) -> Self {
        CraftError::StationUnavailable {
            station: station.clone(),
            cause: None,
        }
    }

    pub(crate) fn missing(item: &ItemId) -> Self {
        CraftError::ResourceMissing { item: item.clone() }
    }

    pub(crate) fn world(item: &ItemId) -> impl FnOnce(WorldError) -> Self + '_ {
        move |source| CraftError::World {
            item: item.clone(),
            source,
        }
    }
}

pub type CraftResult<T> = Result<T, CraftError>;
