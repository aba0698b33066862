use std::time::Duration;

use nova_core::{ContainerHandle, ItemId};

use crate::resolver::Resolver;
use crate::{CraftError, CraftResult};

/// Furnace fuels, in order of preference.
pub const FUELS: &[&str] = &["coal", "charcoal", "coal_block"];

/// Items one unit of fuel smelts.
pub const ITEMS_PER_FUEL: u32 = 8;

pub const FURNACE: &str = "furnace";

impl Resolver<'_> {
    /// Smelt `count` of `input` (already on hand) in a nearby furnace and
    /// return the number of output items taken back.
    pub(crate) async fn smelt(&mut self, input: &ItemId, count: u32) -> CraftResult<u32> {
        let world = &self.ctx.world;
        let furnace_id = ItemId::from(FURNACE);
        let Some(furnace) = self.find_station(&furnace_id) else {
            tracing::warn!("no furnace nearby");
            return Err(CraftError::no_station(&furnace_id));
        };
        self.walk_to(furnace.pos).await?;

        let mut container = world
            .open_container(furnace.pos)
            .await
            .map_err(CraftError::world(&furnace_id))?;
        let result = self.tend_furnace(container.as_mut(), input, count).await;
        container.close().await;
        result
    }

    async fn tend_furnace(
        &self,
        furnace: &mut dyn ContainerHandle,
        input: &ItemId,
        count: u32,
    ) -> CraftResult<u32> {
        let cfg = &self.ctx.config.crafting;
        let inventory = self.ctx.world.inventory();
        let Some(fuel) = inventory.first_of(FUELS) else {
            tracing::warn!("no fuel available");
            return Err(CraftError::ResourceMissing {
                item: ItemId::from(FUELS[0]),
            });
        };
        let fuel_count = inventory.count(fuel).min(count.div_ceil(ITEMS_PER_FUEL));
        let fuel = ItemId::from(fuel);

        furnace
            .deposit(&fuel, fuel_count)
            .await
            .map_err(CraftError::world(&fuel))?;
        self.checkpoint()?;
        furnace
            .deposit(input, count)
            .await
            .map_err(CraftError::world(input))?;
        tracing::info!(%input, count, %fuel, fuel_count, "smelting");

        let wait_secs = cfg.smelt_seconds_per_item.saturating_mul(u64::from(count));
        for _ in 0..wait_secs {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.checkpoint()?;
        }

        let outputs: Vec<(ItemId, u32)> = furnace
            .contents()
            .iter()
            .filter(|(id, _)| *id != input && !FUELS.contains(&id.as_str()))
            .map(|(id, n)| (id.clone(), n))
            .collect();

        let mut taken = 0;
        for (output, n) in outputs {
            furnace
                .withdraw(&output, n)
                .await
                .map_err(CraftError::world(&output))?;
            tracing::info!(%output, count = n, "took smelted output");
            taken += n;
        }
        Ok(taken)
    }
}
