//! Tariff engine
//!
//! Entry point of the quote and invoice flows:
//! 1. Special site override, when one applies
//! 2. Grid resolution (site > client > group > general)
//! 3. Line evaluation in the resolved grid
//!
//! Evaluation is side-effect free: identical inputs over identical store
//! contents yield identical quotes, fingerprint included.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use solclean_common::{
    check_surface, AppliedAdjustment, LineEvaluation, PriceQuote, PriceSource, PriceTarget, PricingError,
    PricingRequest, Result, SolcleanError,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use super::evaluator;
use super::resolver::{GridResolver, ResolvedGrid};
use super::special::{OverridePrice, SpecialSiteOverride};
use crate::config::PricingSettings;
use crate::store::TariffStore;
use crate::telemetry::TarifMetrics;

/// Tariff resolution engine over a tariff store
pub struct TariffEngine<S> {
    store: Arc<S>,
    resolver: GridResolver<S>,
    special: SpecialSiteOverride<S>,
    settings: PricingSettings,
    metrics: Option<Arc<TarifMetrics>>,
}

impl<S: TariffStore> TariffEngine<S> {
    pub fn new(store: Arc<S>, settings: PricingSettings) -> Self {
        Self {
            resolver: GridResolver::new(store.clone()),
            special: SpecialSiteOverride::new(store.clone()),
            store,
            settings,
            metrics: None,
        }
    }

    /// Record quotes and failures in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<TarifMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    /// Price a service for a target
    #[instrument(skip(self, request), fields(service_code = %request.service_code))]
    pub async fn quote(&self, request: &PricingRequest) -> Result<PriceQuote> {
        let started = Instant::now();
        let result = self.compute(request).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(quote) => {
                    metrics.record_quote(quote.source.label(), started.elapsed().as_secs_f64())
                }
                Err(err) => metrics.record_error(error_kind(err)),
            }
        }
        result
    }

    /// Grid that would price `target` at `as_of`
    pub async fn resolve_grid(
        &self,
        target: &PriceTarget,
        as_of: NaiveDate,
    ) -> Result<Option<ResolvedGrid>> {
        Ok(self.resolver.resolve(target, as_of).await?)
    }

    /// Special site price that would bypass grids, if any
    pub async fn check_override(
        &self,
        site_id: &str,
        service_code: &str,
        surface: Decimal,
        as_of: NaiveDate,
    ) -> Result<Option<OverridePrice>> {
        self.special
            .check_override(site_id, service_code, surface, as_of)
            .await
    }

    async fn compute(&self, request: &PricingRequest) -> Result<PriceQuote> {
        check_surface(request.surface)?;
        let as_of = request.effective_date();

        if let Some(site_id) = request.target.site_id.as_deref() {
            if let Some(price) = self
                .special
                .check_override(site_id, &request.service_code, request.surface, as_of)
                .await?
            {
                return Ok(self.override_quote(request, as_of, price));
            }
        }

        let resolved = self
            .resolver
            .resolve(&request.target, as_of)
            .await?
            .ok_or_else(|| {
                warn!(price_target = ?request.target, %as_of, "No applicable tariff grid");
                PricingError::NoApplicableGrid {
                    site: request.target.site_id.clone(),
                    client: request.target.client_id.clone(),
                    group: request.target.group_id.clone(),
                    as_of,
                }
            })?;

        let evaluation =
            evaluator::evaluate(&resolved.grid, &request.service_code, request.surface, as_of)?;
        Ok(self.grid_quote(request, as_of, resolved, evaluation))
    }

    fn override_quote(
        &self,
        request: &PricingRequest,
        as_of: NaiveDate,
        price: OverridePrice,
    ) -> PriceQuote {
        let total = self.round(price.total);
        let source = PriceSource::SpecialTariff {
            tariff_id: price.tariff_id,
            mechanism: price.mechanism,
        };
        self.build_quote(request, as_of, source, total, total, total, Vec::new(), Vec::new())
    }

    fn grid_quote(
        &self,
        request: &PricingRequest,
        as_of: NaiveDate,
        resolved: ResolvedGrid,
        evaluation: LineEvaluation,
    ) -> PriceQuote {
        let source = PriceSource::Grid {
            grid_id: resolved.grid.id,
            scope: resolved.matched_scope,
        };
        let round_all = |applied: Vec<AppliedAdjustment>| -> Vec<AppliedAdjustment> {
            applied
                .into_iter()
                .map(|a| AppliedAdjustment {
                    before: self.round(a.before),
                    after: self.round(a.after),
                    ..a
                })
                .collect()
        };
        self.build_quote(
            request,
            as_of,
            source,
            self.round(evaluation.unit_price),
            self.round(evaluation.base_total),
            self.round(evaluation.total_price),
            round_all(evaluation.applied_surcharges),
            round_all(evaluation.applied_discounts),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_quote(
        &self,
        request: &PricingRequest,
        as_of: NaiveDate,
        source: PriceSource,
        unit_price: Decimal,
        base_total: Decimal,
        total_price: Decimal,
        applied_surcharges: Vec<AppliedAdjustment>,
        applied_discounts: Vec<AppliedAdjustment>,
    ) -> PriceQuote {
        let fingerprint = fingerprint(request, as_of, &source, total_price);
        debug!(source = source.label(), %total_price, %fingerprint, "Quote computed");

        PriceQuote {
            service_code: request.service_code.clone(),
            site_id: request.target.site_id.clone(),
            surface: request.surface,
            as_of,
            source,
            unit_price,
            base_total,
            total_price,
            applied_surcharges,
            applied_discounts,
            currency: self.settings.currency.clone(),
            fingerprint,
        }
    }

    fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.settings.money_scale,
            RoundingStrategy::MidpointAwayFromZero,
        )
    }
}

/// Deterministic hash of the inputs, the selected source and the total
fn fingerprint(
    request: &PricingRequest,
    as_of: NaiveDate,
    source: &PriceSource,
    total_price: Decimal,
) -> String {
    let source = match source {
        PriceSource::SpecialTariff { tariff_id, .. } => format!("special:{}", tariff_id),
        PriceSource::Grid { grid_id, scope } => format!("grid:{}:{}", scope, grid_id),
    };
    let target = &request.target;
    let hash = blake3::hash(
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            request.service_code,
            target.site_id.as_deref().unwrap_or(""),
            target.client_id.as_deref().unwrap_or(""),
            target.group_id.as_deref().unwrap_or(""),
            request.surface.normalize(),
            as_of,
            source,
            total_price.normalize(),
        )
        .as_bytes(),
    );
    hash.to_hex().to_string()
}

/// Metrics label of a failed computation
fn error_kind(err: &SolcleanError) -> &'static str {
    match err {
        SolcleanError::Pricing(e) => e.code(),
        SolcleanError::Store(_) => "store",
        SolcleanError::Validation(_) => "validation",
        SolcleanError::Config(_) | SolcleanError::Serialization(_) | SolcleanError::Internal(_) => {
            "internal"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTariffStore;
    use rust_decimal_macros::dec;
    use solclean_common::{
        GridLine, GridScope, OverrideMechanism, PriceAdjustment, ScopeType, SpecialSiteTariff,
        SurfaceTier, TariffGrid, Validity,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> Validity {
        Validity::starting(date(2024, 1, 1))
    }

    async fn engine_with(
        grids: Vec<TariffGrid>,
        special: Vec<SpecialSiteTariff>,
    ) -> TariffEngine<InMemoryTariffStore> {
        let store = Arc::new(InMemoryTariffStore::new());
        for grid in grids {
            store.upsert_grid(grid).await.unwrap();
        }
        for tariff in special {
            store.upsert_special_tariff(tariff).await.unwrap();
        }
        TariffEngine::new(store, PricingSettings::default())
    }

    #[tokio::test]
    async fn test_negative_surface_rejected() {
        let engine = engine_with(vec![], vec![]).await;
        let err = engine
            .quote(&PricingRequest::new("NM04", dec!(-1)).at(date(2024, 6, 1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SolcleanError::Pricing(PricingError::InvalidSurface(_))
        ));
    }

    #[tokio::test]
    async fn test_check_override_rejects_negative_surface() {
        let engine = engine_with(
            vec![],
            vec![SpecialSiteTariff::forfait(
                "sp-1",
                "S1",
                window(),
                dec!(500),
                dec!(1000),
                dec!(0.40),
            )],
        )
        .await;
        let err = engine
            .check_override("S1", "NM04", dec!(-1), date(2024, 6, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SolcleanError::Pricing(PricingError::InvalidSurface(_))
        ));
    }

    #[tokio::test]
    async fn test_no_grid_is_distinct_from_missing_line() {
        let engine = engine_with(vec![], vec![]).await;
        let err = engine
            .quote(&PricingRequest::new("NM04", dec!(10)).for_site("S1").at(date(2024, 6, 1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SolcleanError::Pricing(PricingError::NoApplicableGrid { ref site, .. }) if site.as_deref() == Some("S1")
        ));

        let engine = engine_with(
            vec![TariffGrid::new("general", "Général", GridScope::General, window())
                .with_line(GridLine::flat("DEP01", dec!(80)))],
            vec![],
        )
        .await;
        let err = engine
            .quote(&PricingRequest::new("NM04", dec!(10)).at(date(2024, 6, 1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SolcleanError::Pricing(PricingError::NoPricingLineForService { .. })
        ));
    }

    #[tokio::test]
    async fn test_grid_quote_is_rounded() {
        let grid = TariffGrid::new("general", "Général", GridScope::General, window()).with_line(
            GridLine::tiered("NM04", vec![SurfaceTier::open(dec!(0), dec!(1.333))])
                .with_discount(PriceAdjustment::percent("Remise", dec!(3))),
        );
        let engine = engine_with(vec![grid], vec![]).await;

        let quote = engine
            .quote(&PricingRequest::new("NM04", dec!(10)).at(date(2024, 6, 1)))
            .await
            .unwrap();

        // 13.33 * 0.97 = 12.9301
        assert_eq!(quote.unit_price, dec!(1.33));
        assert_eq!(quote.base_total, dec!(13.33));
        assert_eq!(quote.total_price, dec!(12.93));
        assert_eq!(quote.applied_discounts[0].after, dec!(12.93));
        assert_eq!(quote.currency, "EUR");
        assert_eq!(
            quote.source,
            PriceSource::Grid {
                grid_id: "general".to_string(),
                scope: ScopeType::General,
            }
        );
    }

    #[tokio::test]
    async fn test_override_skips_grids() {
        let engine = engine_with(
            vec![],
            vec![SpecialSiteTariff::forfait(
                "sp-1",
                "S1",
                window(),
                dec!(500),
                dec!(1000),
                dec!(0.40),
            )],
        )
        .await;

        // No grid at all: the override alone prices the request
        let quote = engine
            .quote(&PricingRequest::new("NM04", dec!(1500)).for_site("S1").at(date(2024, 6, 1)))
            .await
            .unwrap();
        assert_eq!(quote.total_price, dec!(700));
        assert_eq!(
            quote.source,
            PriceSource::SpecialTariff {
                tariff_id: "sp-1".to_string(),
                mechanism: OverrideMechanism::Forfait,
            }
        );
        assert!(quote.applied_surcharges.is_empty());
    }

    #[tokio::test]
    async fn test_quotes_are_deterministic() {
        let grid = TariffGrid::new("general", "Général", GridScope::General, window())
            .with_line(GridLine::flat("NM04", dec!(120)));
        let engine = engine_with(vec![grid], vec![]).await;
        let request = PricingRequest::new("NM04", dec!(42)).for_client("C1").at(date(2024, 6, 1));

        let a = engine.quote(&request).await.unwrap();
        let b = engine.quote(&request).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint.len(), 64);

        let other = engine
            .quote(&PricingRequest::new("NM04", dec!(43)).for_client("C1").at(date(2024, 6, 1)))
            .await
            .unwrap();
        assert_ne!(a.fingerprint, other.fingerprint);
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let grid = TariffGrid::new("general", "Général", GridScope::General, window())
            .with_line(GridLine::flat("NM04", dec!(120)));
        let metrics = Arc::new(TarifMetrics::new().unwrap());
        let engine = engine_with(vec![grid], vec![])
            .await
            .with_metrics(metrics.clone());

        engine
            .quote(&PricingRequest::new("NM04", dec!(1)).at(date(2024, 6, 1)))
            .await
            .unwrap();
        engine
            .quote(&PricingRequest::new("XX99", dec!(1)).at(date(2024, 6, 1)))
            .await
            .unwrap_err();

        assert_eq!(metrics.quotes_total.with_label_values(&["grid"]).get(), 1);
        assert_eq!(
            metrics
                .pricing_errors_total
                .with_label_values(&["no_pricing_line_for_service"])
                .get(),
            1
        );
    }
}
