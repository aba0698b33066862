use nova_core::{BlockPos, EquipSlot, ItemId, StationHandle, WorldInterface};

use crate::resolver::Resolver;
use crate::{CraftError, CraftResult};

/// Horizontal neighbours tried, in order, when placing a station.
pub const RING_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Whether a station can be placed at `spot`: solid ground below, air at the
/// spot itself.
pub fn is_placement_spot(world: &dyn WorldInterface, spot: BlockPos) -> bool {
    let ground = world.block_at(spot.below()).is_some_and(|b| b.is_solid());
    let free = world.block_at(spot).is_some_and(|b| b.is_air());
    ground && free
}

/// Ring positions around `origin` that currently accept a station.
pub fn placement_spots(world: &dyn WorldInterface, origin: BlockPos) -> Vec<BlockPos> {
    RING_OFFSETS
        .iter()
        .map(|&(dx, dz)| origin.offset(dx, 0, dz))
        .filter(|&spot| is_placement_spot(world, spot))
        .collect()
}

impl Resolver<'_> {
    /// Obtain a usable `station`: one already used by this call, an existing
    /// block within range, one placed from the inventory, or one crafted and
    /// then placed.
    pub(crate) async fn station(&mut self, station: &ItemId) -> CraftResult<StationHandle> {
        let handle = match self.known_station(station).or_else(|| self.find_station(station)) {
            Some(handle) => handle,
            None => self.place_station(station).await?,
        };
        if !self.stations.contains(&handle) {
            self.stations.push(handle.clone());
        }
        Ok(handle)
    }

    // Handles from earlier in this call, if the block is still standing.
    fn known_station(&self, station: &ItemId) -> Option<StationHandle> {
        let world = &self.ctx.world;
        self.stations
            .iter()
            .find(|h| &h.station == station && world.block_at(h.pos).is_some_and(|b| &b.id == station))
            .cloned()
    }

    pub(crate) fn find_station(&self, station: &ItemId) -> Option<StationHandle> {
        let radius = self.ctx.config.crafting.station_search_radius;
        let pos = self
            .ctx
            .world
            .find_blocks(std::slice::from_ref(station), radius, 1)
            .into_iter()
            .next()?;
        tracing::debug!(%station, %pos, "found station");
        Some(StationHandle {
            station: station.clone(),
            pos,
        })
    }

    async fn place_station(&mut self, station: &ItemId) -> CraftResult<StationHandle> {
        if !self.ctx.world.inventory().contains(station.as_str()) {
            tracing::info!(%station, "no station nearby, crafting one");
            match self.resolve(station, 1).await {
                Ok(()) => {}
                Err(CraftError::Cancelled) => return Err(CraftError::Cancelled),
                Err(err) => {
                    tracing::warn!(%station, %err, "cannot craft station");
                    return Err(CraftError::StationUnavailable {
                        station: station.clone(),
                        cause: Some(Box::new(err)),
                    });
                }
            }
        }

        self.place_from_inventory(station)
            .await?
            .ok_or_else(|| CraftError::no_station(station))
    }

    async fn place_from_inventory(&self, station: &ItemId) -> CraftResult<Option<StationHandle>> {
        let world = &self.ctx.world;
        let origin = world.status().position.floored();

        for (dx, dz) in RING_OFFSETS {
            self.checkpoint()?;
            let spot = origin.offset(dx, 0, dz);
            if !is_placement_spot(world.as_ref(), spot) {
                continue;
            }
            if let Err(err) = world.equip(station, EquipSlot::Hand).await {
                tracing::debug!(%station, %err, "equip failed");
                continue;
            }
            match world.place_block(spot.below(), BlockPos::UP, station).await {
                Ok(()) => {
                    tracing::info!(%station, %spot, "placed station");
                    return Ok(Some(StationHandle {
                        station: station.clone(),
                        pos: spot,
                    }));
                }
                Err(err) => tracing::debug!(%station, %spot, %err, "placement failed"),
            }
        }

        tracing::warn!(%station, "no spot to place station");
        Ok(None)
    }
}
