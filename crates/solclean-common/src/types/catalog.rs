//! Serialized snapshot of every tariff record

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::grid::TariffGrid;
use super::special::SpecialSiteTariff;
use crate::error::ValidationError;

/// Tariff grids and special site tariffs, as exported from the document store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffCatalog {
    #[serde(default)]
    pub grids: Vec<TariffGrid>,
    #[serde(default)]
    pub special_tariffs: Vec<SpecialSiteTariff>,
}

impl TariffCatalog {
    /// Validate every record, stopping at the first failure.
    ///
    /// Ids must be unique among grids and among special tariffs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut grid_ids = HashSet::new();
        for grid in &self.grids {
            if !grid_ids.insert(grid.id.as_str()) {
                return Err(ValidationError::DuplicateId(grid.id.clone()));
            }
            grid.validate()?;
        }

        let mut tariff_ids = HashSet::new();
        for tariff in &self.special_tariffs {
            if !tariff_ids.insert(tariff.id.as_str()) {
                return Err(ValidationError::DuplicateId(tariff.id.clone()));
            }
            tariff.validate()?;
        }
        Ok(())
    }

    /// Active general grids; more than one makes the fallback ambiguous
    pub fn active_general_grids(&self) -> impl Iterator<Item = &TariffGrid> {
        self.grids
            .iter()
            .filter(|g| g.active && g.scope == super::scope::GridScope::General)
    }
}
