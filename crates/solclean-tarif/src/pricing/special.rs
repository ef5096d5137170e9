//! Special site override
//!
//! A special site tariff that is active, valid and covers the requested
//! service is authoritative: grid resolution is skipped entirely. A tariff
//! that exists for the site but does not cover the service falls through to
//! normal grid resolution.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use solclean_common::{
    check_surface, OverrideMechanism, PricingError, Result, SpecialPricing, SpecialSiteTariff,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::store::TariffStore;

/// Price produced by a special site tariff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverridePrice {
    pub tariff_id: String,
    pub mechanism: OverrideMechanism,
    /// Line total
    pub total: Decimal,
}

/// Look for an override among an in-memory list of special tariffs.
///
/// Candidates are the active tariffs of `site_id` valid at `as_of`, most
/// recent start date first; the first one covering `service_code` wins.
pub fn check_in(
    tariffs: impl IntoIterator<Item = SpecialSiteTariff>,
    site_id: &str,
    service_code: &str,
    surface: Decimal,
    as_of: NaiveDate,
) -> std::result::Result<Option<OverridePrice>, PricingError> {
    check_surface(surface)?;

    let mut candidates: Vec<SpecialSiteTariff> = tariffs
        .into_iter()
        .filter(|t| t.site_id == site_id && t.is_applicable(as_of))
        .collect();
    candidates.sort_by(|a, b| b.validity.start.cmp(&a.validity.start));

    for tariff in candidates {
        match tariff.price_for(service_code, surface)? {
            Some(total) => {
                let mechanism = match tariff.pricing {
                    SpecialPricing::Forfait { .. } => OverrideMechanism::Forfait,
                    SpecialPricing::FixedPrices { .. } => OverrideMechanism::FixedPrice,
                };
                debug!(tariff_id = %tariff.id, site_id, service_code, %total, "Special site tariff applies");
                return Ok(Some(OverridePrice {
                    tariff_id: tariff.id,
                    mechanism,
                    total,
                }));
            }
            None => {
                debug!(tariff_id = %tariff.id, service_code, "Special site tariff does not cover service");
            }
        }
    }
    Ok(None)
}

/// Special site override backed by a tariff store
pub struct SpecialSiteOverride<S> {
    store: Arc<S>,
}

impl<S: TariffStore> SpecialSiteOverride<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Authoritative price for the site, or `None` to fall through to grids
    #[instrument(skip(self))]
    pub async fn check_override(
        &self,
        site_id: &str,
        service_code: &str,
        surface: Decimal,
        as_of: NaiveDate,
    ) -> Result<Option<OverridePrice>> {
        let tariffs = self.store.special_tariffs_for_site(site_id).await?;
        Ok(check_in(tariffs, site_id, service_code, surface, as_of)?)
    }
}
