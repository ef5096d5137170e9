//! In-memory tariff store
//!
//! Uses DashMap for concurrent access and keeps insertion order, since grid
//! resolution falls back to store order when priorities tie.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use solclean_common::{SpecialSiteTariff, StoreError, TariffCatalog, TariffGrid};
use std::path::Path;
use tracing::{info, instrument, warn};

use super::TariffStore;

/// Records keyed by ID, listed in insertion order
struct OrderedRecords<T> {
    records: DashMap<String, T>,
    order: RwLock<Vec<String>>,
}

impl<T: Clone> OrderedRecords<T> {
    fn new() -> Self {
        Self {
            records: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace; a replaced record keeps its position
    fn upsert(&self, id: String, record: T) {
        if self.records.insert(id.clone(), record).is_none() {
            self.order.write().push(id);
        }
    }

    fn get(&self, id: &str) -> Option<T> {
        self.records.get(id).map(|r| r.clone())
    }

    fn list(&self) -> Vec<T> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<T> {
        self.records.get_mut(id).map(|mut record| {
            f(&mut record);
            record.clone()
        })
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// In-memory storage implementation
pub struct InMemoryTariffStore {
    grids: OrderedRecords<TariffGrid>,
    special_tariffs: OrderedRecords<SpecialSiteTariff>,
}

impl InMemoryTariffStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            grids: OrderedRecords::new(),
            special_tariffs: OrderedRecords::new(),
        }
    }

    /// Seed a store from a catalog, validating every record
    pub fn from_catalog(catalog: TariffCatalog) -> Result<Self, StoreError> {
        catalog.validate()?;

        let general = catalog.active_general_grids().count();
        if general > 1 {
            warn!(
                active_general_grids = general,
                "More than one active general grid, fallback resolution depends on priority"
            );
        }

        let store = Self::new();
        for grid in catalog.grids {
            store.grids.upsert(grid.id.clone(), grid);
        }
        for tariff in catalog.special_tariffs {
            store.special_tariffs.upsert(tariff.id.clone(), tariff);
        }

        info!(
            grids = store.grids.len(),
            special_tariffs = store.special_tariffs.len(),
            "Loaded tariff catalog"
        );
        Ok(store)
    }

    /// Load a JSON catalog file
    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Storage(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog: TariffCatalog = serde_json::from_str(&content)?;
        Self::from_catalog(catalog)
    }

    /// Export every record
    pub fn snapshot(&self) -> TariffCatalog {
        TariffCatalog {
            grids: self.grids.list(),
            special_tariffs: self.special_tariffs.list(),
        }
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        let grids = self.grids.list();
        let special_tariffs = self.special_tariffs.list();

        StoreStats {
            total_grids: grids.len(),
            active_grids: grids.iter().filter(|g| g.active).count(),
            active_general_grids: self.snapshot().active_general_grids().count(),
            total_special_tariffs: special_tariffs.len(),
            active_special_tariffs: special_tariffs.iter().filter(|t| t.active).count(),
        }
    }
}

impl Default for InMemoryTariffStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TariffStore for InMemoryTariffStore {
    async fn list_grids(&self) -> Result<Vec<TariffGrid>, StoreError> {
        Ok(self.grids.list())
    }

    async fn get_grid(&self, id: &str) -> Result<Option<TariffGrid>, StoreError> {
        Ok(self.grids.get(id))
    }

    #[instrument(skip(self, grid), fields(grid_id = %grid.id))]
    async fn upsert_grid(&self, grid: TariffGrid) -> Result<(), StoreError> {
        grid.validate()?;
        info!(scope = %grid.scope.scope_type(), active = grid.active, "Upserting tariff grid");
        self.grids.upsert(grid.id.clone(), grid);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_grid_active(&self, id: &str, active: bool) -> Result<TariffGrid, StoreError> {
        let grid = self
            .grids
            .modify(id, |g| g.active = active)
            .ok_or_else(|| StoreError::GridNotFound(id.to_string()))?;
        info!("Toggled tariff grid");
        Ok(grid)
    }

    async fn list_special_tariffs(&self) -> Result<Vec<SpecialSiteTariff>, StoreError> {
        Ok(self.special_tariffs.list())
    }

    async fn get_special_tariff(&self, id: &str) -> Result<Option<SpecialSiteTariff>, StoreError> {
        Ok(self.special_tariffs.get(id))
    }

    #[instrument(skip(self, tariff), fields(tariff_id = %tariff.id, site_id = %tariff.site_id))]
    async fn upsert_special_tariff(&self, tariff: SpecialSiteTariff) -> Result<(), StoreError> {
        tariff.validate()?;
        info!(active = tariff.active, "Upserting special site tariff");
        self.special_tariffs.upsert(tariff.id.clone(), tariff);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_special_tariff_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<SpecialSiteTariff, StoreError> {
        let tariff = self
            .special_tariffs
            .modify(id, |t| t.active = active)
            .ok_or_else(|| StoreError::SpecialTariffNotFound(id.to_string()))?;
        info!("Toggled special site tariff");
        Ok(tariff)
    }
}

/// Statistics about the tariff store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_grids: usize,
    pub active_grids: usize,
    pub active_general_grids: usize,
    pub total_special_tariffs: usize,
    pub active_special_tariffs: usize,
}
