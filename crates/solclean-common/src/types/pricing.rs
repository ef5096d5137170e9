//! Pricing request, line evaluation and quote types
//!
//! Resolution order for a request:
//! 1. Special site tariff of the requested site (if any applies)
//! 2. Grid resolved by scope precedence: site > client > group > general
//! 3. Line of the requested service in that grid

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::grid::{AdjustmentKind, AdjustmentValue};
use super::scope::ScopeType;
use crate::error::PricingError;

/// Entities a price is requested for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTarget {
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

impl PriceTarget {
    /// Entity id matching a scope level (`None` for general)
    pub fn entity_for(&self, scope: ScopeType) -> Option<&str> {
        match scope {
            ScopeType::Site => self.site_id.as_deref(),
            ScopeType::Client => self.client_id.as_deref(),
            ScopeType::Group => self.group_id.as_deref(),
            ScopeType::General => None,
        }
    }
}

/// Request for price calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRequest {
    /// Catalog service code
    pub service_code: String,

    /// Site, client and group the service is performed for
    #[serde(flatten)]
    pub target: PriceTarget,

    /// Panel surface in m²
    pub surface: Decimal,

    /// Reference date (today when absent)
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl PricingRequest {
    /// Create a new pricing request
    pub fn new(service_code: impl Into<String>, surface: Decimal) -> Self {
        Self {
            service_code: service_code.into(),
            target: PriceTarget::default(),
            surface,
            as_of: None,
        }
    }

    pub fn for_site(mut self, site_id: impl Into<String>) -> Self {
        self.target.site_id = Some(site_id.into());
        self
    }

    pub fn for_client(mut self, client_id: impl Into<String>) -> Self {
        self.target.client_id = Some(client_id.into());
        self
    }

    pub fn for_group(mut self, group_id: impl Into<String>) -> Self {
        self.target.group_id = Some(group_id.into());
        self
    }

    /// Set the reference date
    pub fn at(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Reference date, defaulting to today (UTC)
    pub fn effective_date(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

/// Reject negative surfaces before any pricing rule reads them
pub fn check_surface(surface: Decimal) -> Result<(), PricingError> {
    if surface < Decimal::ZERO {
        return Err(PricingError::InvalidSurface(surface));
    }
    Ok(())
}

/// One surcharge or discount as applied to the running total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub label: String,
    pub kind: AdjustmentKind,
    pub value: AdjustmentValue,
    /// Running total before the rule
    pub before: Decimal,
    /// Running total after the rule
    pub after: Decimal,
}

impl AppliedAdjustment {
    /// Signed effect of the rule on the total
    pub fn effect(&self) -> Decimal {
        self.after - self.before
    }
}

/// Result of evaluating one grid line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEvaluation {
    pub service_code: String,
    /// Flat amount, tier unit price, or band total divided by the surface
    pub unit_price: Decimal,
    /// Price before surcharges and discounts
    pub base_total: Decimal,
    /// Price after surcharges and discounts
    pub total_price: Decimal,
    pub applied_surcharges: Vec<AppliedAdjustment>,
    pub applied_discounts: Vec<AppliedAdjustment>,
}

/// Mechanism of a special tariff that produced a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMechanism {
    Forfait,
    FixedPrice,
}

/// Where a quoted price comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceSource {
    SpecialTariff {
        tariff_id: String,
        mechanism: OverrideMechanism,
    },
    Grid {
        grid_id: String,
        scope: ScopeType,
    },
}

impl PriceSource {
    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            PriceSource::SpecialTariff { .. } => "special_tariff",
            PriceSource::Grid { .. } => "grid",
        }
    }
}

/// Final price with its breakdown, consumed by invoice and quote rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub service_code: String,
    pub site_id: Option<String>,
    pub surface: Decimal,
    pub as_of: NaiveDate,
    pub source: PriceSource,
    pub unit_price: Decimal,
    pub base_total: Decimal,
    pub total_price: Decimal,
    pub applied_surcharges: Vec<AppliedAdjustment>,
    pub applied_discounts: Vec<AppliedAdjustment>,
    pub currency: String,
    /// Deterministic hash of the inputs and the selected source
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_check_surface() {
        assert!(check_surface(dec!(0)).is_ok());
        assert!(check_surface(dec!(1500)).is_ok());
        assert_eq!(
            check_surface(dec!(-0.01)),
            Err(PricingError::InvalidSurface(dec!(-0.01)))
        );
    }

    #[test]
    fn test_request_builder() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let request = PricingRequest::new("NM04", dec!(800))
            .for_site("S1")
            .for_client("C1")
            .for_group("G1")
            .at(date);

        assert_eq!(request.target.entity_for(ScopeType::Site), Some("S1"));
        assert_eq!(request.target.entity_for(ScopeType::Client), Some("C1"));
        assert_eq!(request.target.entity_for(ScopeType::Group), Some("G1"));
        assert_eq!(request.target.entity_for(ScopeType::General), None);
        assert_eq!(request.effective_date(), date);
    }

    #[test]
    fn test_request_defaults_to_today() {
        let request = PricingRequest::new("NM04", dec!(10));
        assert_eq!(request.effective_date(), chrono::Utc::now().date_naive());
    }

    #[test]
    fn test_request_json_is_flat() {
        let request: PricingRequest = serde_json::from_str(
            r#"{"service_code": "NM04", "site_id": "S1", "surface": 800, "as_of": "2024-05-01"}"#,
        )
        .unwrap();

        assert_eq!(request.target.site_id.as_deref(), Some("S1"));
        assert_eq!(request.target.client_id, None);
        assert_eq!(request.surface, dec!(800));
    }

    #[test]
    fn test_adjustment_effect() {
        let applied = AppliedAdjustment {
            label: "Remise".to_string(),
            kind: AdjustmentKind::Discount,
            value: AdjustmentValue::Amount(dec!(50)),
            before: dec!(1200),
            after: dec!(1150),
        };
        assert_eq!(applied.effect(), dec!(-50));
    }
}
