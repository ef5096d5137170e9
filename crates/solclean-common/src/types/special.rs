//! Special site tariffs - per-site overrides of grid pricing

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::scope::Validity;
use crate::error::{PricingError, ValidationError};

/// Fixed price of one service under a special tariff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedServicePrice {
    pub service_code: String,
    /// Line total, independent of the surface
    pub price: Decimal,
}

/// Pricing carried by a special site tariff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpecialPricing {
    /// Flat amount covering an included surface, overage billed per m²
    Forfait {
        amount: Decimal,
        included_surface: Decimal,
        overage_unit_price: Decimal,
        /// Services covered by the forfait; empty means every service
        #[serde(default)]
        service_codes: Vec<String>,
    },
    /// Fixed price per service
    FixedPrices { prices: Vec<FixedServicePrice> },
}

/// Site-specific override that supersedes grid pricing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialSiteTariff {
    pub id: String,
    pub site_id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub validity: Validity,
    #[serde(default = "default_true")]
    pub active: bool,
    pub pricing: SpecialPricing,
}

fn default_true() -> bool {
    true
}

impl SpecialSiteTariff {
    pub fn forfait(
        id: impl Into<String>,
        site_id: impl Into<String>,
        validity: Validity,
        amount: Decimal,
        included_surface: Decimal,
        overage_unit_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            site_id: site_id.into(),
            label: None,
            validity,
            active: true,
            pricing: SpecialPricing::Forfait {
                amount,
                included_surface,
                overage_unit_price,
                service_codes: Vec::new(),
            },
        }
    }

    pub fn fixed_prices(
        id: impl Into<String>,
        site_id: impl Into<String>,
        validity: Validity,
        prices: Vec<FixedServicePrice>,
    ) -> Self {
        Self {
            id: id.into(),
            site_id: site_id.into(),
            label: None,
            validity,
            active: true,
            pricing: SpecialPricing::FixedPrices { prices },
        }
    }

    /// Restrict a forfait to the given services. No effect on fixed prices.
    pub fn covering(mut self, codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let SpecialPricing::Forfait { service_codes, .. } = &mut self.pricing {
            *service_codes = codes.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Active and valid at `as_of`
    pub fn is_applicable(&self, as_of: NaiveDate) -> bool {
        self.active && self.validity.contains(as_of)
    }

    /// Price this tariff yields for `service_code`, or `None` when it does not
    /// cover the service.
    pub fn price_for(
        &self,
        service_code: &str,
        surface: Decimal,
    ) -> Result<Option<Decimal>, PricingError> {
        match &self.pricing {
            SpecialPricing::Forfait {
                amount,
                included_surface,
                overage_unit_price,
                service_codes,
            } => {
                if !service_codes.is_empty() && !service_codes.iter().any(|c| c == service_code) {
                    return Ok(None);
                }
                let overage = surface
                    .checked_sub(*included_surface)
                    .ok_or(PricingError::Overflow)?
                    .max(Decimal::ZERO);
                let total = overage
                    .checked_mul(*overage_unit_price)
                    .and_then(|o| o.checked_add(*amount))
                    .ok_or(PricingError::Overflow)?;
                Ok(Some(total))
            }
            SpecialPricing::FixedPrices { prices } => Ok(prices
                .iter()
                .find(|p| p.service_code == service_code)
                .map(|p| p.price)),
        }
    }

    /// Check the tariff for data-integrity problems before it is persisted
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.site_id.trim().is_empty() {
            return Err(ValidationError::MissingField("site_id"));
        }
        self.validity.validate()?;

        match &self.pricing {
            SpecialPricing::Forfait {
                amount,
                included_surface,
                overage_unit_price,
                ..
            } => {
                if [amount, included_surface, overage_unit_price]
                    .iter()
                    .any(|v| **v < Decimal::ZERO)
                {
                    return Err(ValidationError::NegativeAmount(self.id.clone()));
                }
            }
            SpecialPricing::FixedPrices { prices } => {
                if prices.is_empty() {
                    return Err(ValidationError::EmptyFixedPrices(self.id.clone()));
                }
                let mut seen = HashSet::new();
                for price in prices {
                    if !seen.insert(price.service_code.as_str()) {
                        return Err(ValidationError::DuplicateServiceCode(
                            price.service_code.clone(),
                        ));
                    }
                    if price.price < Decimal::ZERO {
                        return Err(ValidationError::NegativeAmount(price.service_code.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}
