//! Line evaluator
//!
//! Computes the price of one service from a resolved grid:
//!
//! ```text
//! base     = flat amount | tier price × surface | tier band total
//! adjusted = fold(surcharges, base)      // list order, compounding
//! total    = fold(discounts, adjusted)   // list order, floored at zero
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use solclean_common::{
    check_surface, AdjustmentKind, AppliedAdjustment, LineEvaluation, LinePricing, PriceAdjustment,
    PricingError, TariffGrid, TierMode,
};
use tracing::{debug, warn};

/// Evaluate the line of `service_code` in `grid` for `surface` m² at `as_of`
pub fn evaluate(
    grid: &TariffGrid,
    service_code: &str,
    surface: Decimal,
    as_of: NaiveDate,
) -> Result<LineEvaluation, PricingError> {
    check_surface(surface)?;

    let line = grid.line(service_code).ok_or_else(|| {
        warn!(grid_id = %grid.id, service_code, "Grid has no line for service");
        PricingError::NoPricingLineForService {
            grid_id: grid.id.clone(),
            service_code: service_code.to_string(),
        }
    })?;

    let (unit_price, base_total) = match &line.pricing {
        LinePricing::Flat { amount } => (*amount, *amount),
        LinePricing::Tiered { .. } => {
            let tier = line.tier_for(surface).ok_or_else(|| {
                warn!(grid_id = %grid.id, service_code, %surface, "Surface outside every tier");
                PricingError::AmbiguousTierBoundary {
                    grid_id: grid.id.clone(),
                    service_code: service_code.to_string(),
                    surface,
                }
            })?;
            match grid.tier_mode {
                TierMode::PerSquareMeter => {
                    let total = tier
                        .price
                        .checked_mul(surface)
                        .ok_or(PricingError::Overflow)?;
                    (tier.price, total)
                }
                TierMode::BandedTotal => {
                    let unit = if surface.is_zero() {
                        tier.price
                    } else {
                        tier.price
                            .checked_div(surface)
                            .ok_or(PricingError::Overflow)?
                    };
                    (unit, tier.price)
                }
            }
        }
    };

    let (adjusted, applied_surcharges) = apply_all(
        AdjustmentKind::Surcharge,
        &line.surcharges,
        base_total,
        surface,
        as_of,
    )?;
    let (total_price, applied_discounts) = apply_all(
        AdjustmentKind::Discount,
        &line.discounts,
        adjusted,
        surface,
        as_of,
    )?;

    debug!(
        grid_id = %grid.id,
        service_code,
        %base_total,
        %total_price,
        surcharges = applied_surcharges.len(),
        discounts = applied_discounts.len(),
        "Evaluated grid line"
    );

    Ok(LineEvaluation {
        service_code: service_code.to_string(),
        unit_price,
        base_total,
        total_price,
        applied_surcharges,
        applied_discounts,
    })
}

/// Left fold of `rules` over `start`, skipping rules whose condition fails
fn apply_all(
    kind: AdjustmentKind,
    rules: &[PriceAdjustment],
    start: Decimal,
    surface: Decimal,
    as_of: NaiveDate,
) -> Result<(Decimal, Vec<AppliedAdjustment>), PricingError> {
    rules
        .iter()
        .filter(|rule| rule.condition.holds(surface, as_of))
        .try_fold((start, Vec::new()), |(total, mut applied), rule| {
            let after = rule.apply(kind, total)?;
            applied.push(AppliedAdjustment {
                label: rule.label.clone(),
                kind,
                value: rule.value,
                before: total,
                after,
            });
            Ok::<_, PricingError>((after, applied))
        })
}
