//! Tariff grids - scoped, time-bounded pricing rules
//!
//! A grid holds one [`GridLine`] per service code. A line is priced either at
//! a flat amount or through surface tiers, then adjusted by its surcharges and
//! discounts, in list order:
//!
//! ```text
//! total = fold(discounts, fold(surcharges, base))
//! ```

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::scope::{GridScope, Validity};
use crate::error::{PricingError, ValidationError};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// How the price of a surface tier is read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMode {
    /// Tier price is a unit price per m², multiplied by the surface
    #[default]
    PerSquareMeter,
    /// Tier price is already the line total for the whole band
    BandedTotal,
}

/// Surface band `[min, max)` with its own price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceTier {
    /// Lower bound in m² (inclusive)
    pub min: Decimal,
    /// Upper bound in m² (exclusive, unbounded when absent)
    #[serde(default)]
    pub max: Option<Decimal>,
    /// Unit price or band total, depending on the grid's [`TierMode`]
    pub price: Decimal,
}

impl SurfaceTier {
    pub fn bounded(min: Decimal, max: Decimal, price: Decimal) -> Self {
        Self {
            min,
            max: Some(max),
            price,
        }
    }

    pub fn open(min: Decimal, price: Decimal) -> Self {
        Self {
            min,
            max: None,
            price,
        }
    }

    /// Whether `surface` lies in `[min, max)`
    pub fn contains(&self, surface: Decimal) -> bool {
        self.min <= surface && self.max.map_or(true, |max| surface < max)
    }
}

/// Pricing mode of a line: flat rate or surface tiers, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LinePricing {
    /// Forfaitaire amount, independent of the surface
    Flat { amount: Decimal },
    /// Tranches, checked in order
    Tiered { tiers: Vec<SurfaceTier> },
}

/// Percentage or fixed amount carried by a surcharge or discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AdjustmentValue {
    /// Percentage points of the running total (`10` = 10%)
    Percent(Decimal),
    /// Fixed amount in the quote currency
    Amount(Decimal),
}

impl AdjustmentValue {
    /// Effect magnitude on `total`
    pub fn delta(&self, total: Decimal) -> Result<Decimal, PricingError> {
        match self {
            AdjustmentValue::Percent(pct) => total
                .checked_mul(*pct)
                .and_then(|v| v.checked_div(HUNDRED))
                .ok_or(PricingError::Overflow),
            AdjustmentValue::Amount(amount) => Ok(*amount),
        }
    }

    fn raw(&self) -> Decimal {
        match self {
            AdjustmentValue::Percent(v) | AdjustmentValue::Amount(v) => *v,
        }
    }
}

/// Whether an adjustment raises or lowers the price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Surcharge,
    Discount,
}

/// Condition gating a surcharge or discount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    #[default]
    Always,
    /// Surface >= min
    SurfaceAtLeast { min: Decimal },
    /// Surface < max
    SurfaceBelow { max: Decimal },
    /// Month of the reference date is one of `months` (1-12)
    Months { months: Vec<u32> },
}

impl RuleCondition {
    pub fn holds(&self, surface: Decimal, as_of: NaiveDate) -> bool {
        match self {
            RuleCondition::Always => true,
            RuleCondition::SurfaceAtLeast { min } => surface >= *min,
            RuleCondition::SurfaceBelow { max } => surface < *max,
            RuleCondition::Months { months } => months.contains(&as_of.month()),
        }
    }
}

/// Surcharge or discount rule of a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    /// Label printed on invoices and quotes
    pub label: String,
    pub value: AdjustmentValue,
    #[serde(default)]
    pub condition: RuleCondition,
}

impl PriceAdjustment {
    pub fn percent(label: impl Into<String>, pct: Decimal) -> Self {
        Self {
            label: label.into(),
            value: AdjustmentValue::Percent(pct),
            condition: RuleCondition::Always,
        }
    }

    pub fn amount(label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            label: label.into(),
            value: AdjustmentValue::Amount(amount),
            condition: RuleCondition::Always,
        }
    }

    pub fn when(mut self, condition: RuleCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Apply the rule to a running total. Discounts never go below zero.
    pub fn apply(&self, kind: AdjustmentKind, total: Decimal) -> Result<Decimal, PricingError> {
        let delta = self.value.delta(total)?;
        match kind {
            AdjustmentKind::Surcharge => total.checked_add(delta).ok_or(PricingError::Overflow),
            AdjustmentKind::Discount => Ok(total
                .checked_sub(delta)
                .ok_or(PricingError::Overflow)?
                .max(Decimal::ZERO)),
        }
    }

    fn validate(&self, kind: AdjustmentKind) -> Result<(), ValidationError> {
        if self.value.raw() < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount(self.label.clone()));
        }
        if let (AdjustmentKind::Discount, AdjustmentValue::Percent(pct)) = (kind, &self.value) {
            if *pct > HUNDRED {
                return Err(ValidationError::DiscountAboveHundredPercent(
                    self.label.clone(),
                ));
            }
        }
        if let RuleCondition::Months { months } = &self.condition {
            if let Some(month) = months.iter().find(|m| !(1..=12).contains(*m)) {
                return Err(ValidationError::InvalidMonth {
                    label: self.label.clone(),
                    month: *month,
                });
            }
        }
        Ok(())
    }
}

/// Pricing rule of a single service within a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLine {
    /// Catalog service code (e.g. "NM04")
    pub service_code: String,
    pub pricing: LinePricing,
    /// Applied first, in order
    #[serde(default)]
    pub surcharges: Vec<PriceAdjustment>,
    /// Applied after every surcharge, in order
    #[serde(default)]
    pub discounts: Vec<PriceAdjustment>,
}

impl GridLine {
    pub fn flat(service_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            service_code: service_code.into(),
            pricing: LinePricing::Flat { amount },
            surcharges: Vec::new(),
            discounts: Vec::new(),
        }
    }

    pub fn tiered(service_code: impl Into<String>, tiers: Vec<SurfaceTier>) -> Self {
        Self {
            service_code: service_code.into(),
            pricing: LinePricing::Tiered { tiers },
            surcharges: Vec::new(),
            discounts: Vec::new(),
        }
    }

    pub fn with_surcharge(mut self, surcharge: PriceAdjustment) -> Self {
        self.surcharges.push(surcharge);
        self
    }

    pub fn with_discount(mut self, discount: PriceAdjustment) -> Self {
        self.discounts.push(discount);
        self
    }

    /// First tier containing `surface`
    pub fn tier_for(&self, surface: Decimal) -> Option<&SurfaceTier> {
        match &self.pricing {
            LinePricing::Flat { .. } => None,
            LinePricing::Tiered { tiers } => tiers.iter().find(|t| t.contains(surface)),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.service_code.trim().is_empty() {
            return Err(ValidationError::MissingField("service_code"));
        }
        let code = &self.service_code;

        match &self.pricing {
            LinePricing::Flat { amount } => {
                if *amount < Decimal::ZERO {
                    return Err(ValidationError::NegativeAmount(code.clone()));
                }
            }
            LinePricing::Tiered { tiers } => {
                if tiers.is_empty() {
                    return Err(ValidationError::EmptyTiers(code.clone()));
                }
                for (index, tier) in tiers.iter().enumerate() {
                    if tier.min < Decimal::ZERO || tier.price < Decimal::ZERO {
                        return Err(ValidationError::NegativeAmount(code.clone()));
                    }
                    let next = tiers.get(index + 1);
                    match (tier.max, next) {
                        (Some(max), _) if max <= tier.min => {
                            return Err(ValidationError::EmptyTierRange {
                                service_code: code.clone(),
                                index,
                            });
                        }
                        (None, Some(_)) => {
                            return Err(ValidationError::UnboundedTierNotLast(code.clone()));
                        }
                        (Some(max), Some(next_tier)) if next_tier.min < max => {
                            return Err(ValidationError::OverlappingTiers {
                                service_code: code.clone(),
                                index,
                                next: index + 1,
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        for surcharge in &self.surcharges {
            surcharge.validate(AdjustmentKind::Surcharge)?;
        }
        for discount in &self.discounts {
            discount.validate(AdjustmentKind::Discount)?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Named, scoped, time-bounded collection of pricing lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffGrid {
    pub id: String,
    pub name: String,
    pub scope: GridScope,
    pub validity: Validity,
    /// Lower value wins among grids of the same scope level
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub tier_mode: TierMode,
    #[serde(default)]
    pub lines: Vec<GridLine>,
}

impl TariffGrid {
    /// Create an active grid without lines
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        scope: GridScope,
        validity: Validity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scope,
            validity,
            priority: 0,
            active: true,
            tier_mode: TierMode::default(),
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: GridLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tier_mode(mut self, tier_mode: TierMode) -> Self {
        self.tier_mode = tier_mode;
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

    /// Line pricing `service_code`, if any
    pub fn line(&self, service_code: &str) -> Option<&GridLine> {
        self.lines.iter().find(|l| l.service_code == service_code)
    }

    /// Check the grid for data-integrity problems before it is persisted
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        self.scope.validate()?;
        self.validity.validate()?;

        let mut seen = HashSet::new();
        for line in &self.lines {
            if !seen.insert(line.service_code.as_str()) {
                return Err(ValidationError::DuplicateServiceCode(
                    line.service_code.clone(),
                ));
            }
            line.validate()?;
        }
        Ok(())
    }
}
