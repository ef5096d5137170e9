//! # Solclean Tarif
//!
//! Tariff resolution engine for solar-panel cleaning services.
//!
//! ## Resolution
//!
//! ```text
//! request (service, site, client, group, surface, date)
//!    │
//!    ├─► special site tariff? ── yes ─► forfait | fixed price
//!    │
//!    └─► grid resolver: site > client > group > general
//!           └─► line evaluator: flat | tiers, then surcharges, then discounts
//! ```
//!
//! The store behind [`store::TariffStore`] is the only state; pricing itself
//! never writes.

pub mod config;
pub mod pricing;
pub mod store;
pub mod telemetry;

pub use config::{PricingSettings, TarifConfig};
pub use pricing::{
    GridResolver, OverridePrice, ResolvedGrid, SpecialSiteOverride, TariffEngine,
};
pub use store::{InMemoryTariffStore, StoreStats, TariffStore};
pub use telemetry::TarifMetrics;
