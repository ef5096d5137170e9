//! Pricing rule store
//!
//! Persisted tariff grids and special site tariffs. The document database is
//! an external collaborator; every backend implements [`TariffStore`].
//! Admin actions are plain upserts with last-write-wins semantics, and
//! deactivation is the only retirement path.

pub mod memory;

use async_trait::async_trait;
use solclean_common::{GridScope, SpecialSiteTariff, StoreError, TariffGrid};
use uuid::Uuid;

pub use memory::{InMemoryTariffStore, StoreStats};

/// Suffix appended to the name of a duplicated grid
pub const DUPLICATE_SUFFIX: &str = " (copy)";

/// Trait for tariff storage backends
#[async_trait]
pub trait TariffStore: Send + Sync {
    /// All grids, in store order
    async fn list_grids(&self) -> Result<Vec<TariffGrid>, StoreError>;

    /// Get a grid by ID
    async fn get_grid(&self, id: &str) -> Result<Option<TariffGrid>, StoreError>;

    /// Validate and insert or replace a grid
    async fn upsert_grid(&self, grid: TariffGrid) -> Result<(), StoreError>;

    /// Toggle a grid, returning the updated record
    async fn set_grid_active(&self, id: &str, active: bool) -> Result<TariffGrid, StoreError>;

    /// All special site tariffs, in store order
    async fn list_special_tariffs(&self) -> Result<Vec<SpecialSiteTariff>, StoreError>;

    /// Get a special site tariff by ID
    async fn get_special_tariff(&self, id: &str) -> Result<Option<SpecialSiteTariff>, StoreError>;

    /// Validate and insert or replace a special site tariff
    async fn upsert_special_tariff(&self, tariff: SpecialSiteTariff) -> Result<(), StoreError>;

    /// Toggle a special site tariff, returning the updated record
    async fn set_special_tariff_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<SpecialSiteTariff, StoreError>;

    /// Active grids, in store order
    async fn active_grids(&self) -> Result<Vec<TariffGrid>, StoreError> {
        let mut grids = self.list_grids().await?;
        grids.retain(|g| g.active);
        Ok(grids)
    }

    /// Grids attached to `scope`, active or not
    async fn grids_in_scope(&self, scope: &GridScope) -> Result<Vec<TariffGrid>, StoreError> {
        let mut grids = self.list_grids().await?;
        grids.retain(|g| &g.scope == scope);
        Ok(grids)
    }

    /// Special tariffs attached to a site, active or not
    async fn special_tariffs_for_site(
        &self,
        site_id: &str,
    ) -> Result<Vec<SpecialSiteTariff>, StoreError> {
        let mut tariffs = self.list_special_tariffs().await?;
        tariffs.retain(|t| t.site_id == site_id);
        Ok(tariffs)
    }

    /// Create an inactive copy of a grid under a fresh ID
    async fn duplicate_grid(&self, id: &str) -> Result<TariffGrid, StoreError> {
        let source = self
            .get_grid(id)
            .await?
            .ok_or_else(|| StoreError::GridNotFound(id.to_string()))?;

        let copy = TariffGrid {
            id: Uuid::now_v7().to_string(),
            name: format!("{}{}", source.name, DUPLICATE_SUFFIX),
            active: false,
            ..source
        };
        self.upsert_grid(copy.clone()).await?;
        Ok(copy)
    }
}
