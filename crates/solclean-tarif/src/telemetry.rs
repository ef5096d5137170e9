//! Prometheus metrics for the pricing path

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

/// Prometheus metrics for quote computation
pub struct TarifMetrics {
    /// Quotes produced, by price source
    pub quotes_total: IntCounterVec,
    /// Failed computations, by error code
    pub pricing_errors_total: IntCounterVec,
    /// Time spent computing one quote
    pub quote_duration_seconds: Histogram,
}

impl TarifMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            quotes_total: IntCounterVec::new(
                Opts::new("solclean_quotes_total", "Total quotes computed"),
                &["source"],
            )?,
            pricing_errors_total: IntCounterVec::new(
                Opts::new(
                    "solclean_pricing_errors_total",
                    "Total price computations that failed",
                ),
                &["kind"],
            )?,
            quote_duration_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "solclean_quote_duration_seconds",
                    "Quote computation duration",
                )
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.quotes_total.clone()))?;
        registry.register(Box::new(self.pricing_errors_total.clone()))?;
        registry.register(Box::new(self.quote_duration_seconds.clone()))?;
        Ok(())
    }

    pub fn record_quote(&self, source: &str, elapsed_secs: f64) {
        self.quotes_total.with_label_values(&[source]).inc();
        self.quote_duration_seconds.observe(elapsed_secs);
    }

    pub fn record_error(&self, kind: &str) {
        self.pricing_errors_total.with_label_values(&[kind]).inc();
    }
}
