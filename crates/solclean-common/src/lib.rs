//! # Solclean Common
//!
//! Shared tariff types and errors for the Solclean pricing engine.
//!
//! ## Core Types
//!
//! - [`TariffGrid`]: scoped, time-bounded collection of pricing lines
//! - [`GridLine`]: pricing rule of a single service inside a grid
//! - [`SpecialSiteTariff`]: site override that supersedes every grid
//! - [`PricingRequest`]/[`PriceQuote`]: input and output of a price computation
//!
//! ## Precedence
//!
//! ```text
//! special site tariff > site grid > client grid > group grid > general grid
//! ```

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{PricingError, Result, SolcleanError, StoreError, ValidationError};
pub use types::{
    catalog::TariffCatalog,
    grid::{
        AdjustmentKind, AdjustmentValue, GridLine, LinePricing, PriceAdjustment, RuleCondition,
        SurfaceTier, TariffGrid, TierMode,
    },
    pricing::{
        check_surface, AppliedAdjustment, LineEvaluation, OverrideMechanism, PriceQuote,
        PriceSource, PricingRequest, PriceTarget,
    },
    scope::{GridScope, ScopeType, Validity},
    special::{FixedServicePrice, SpecialPricing, SpecialSiteTariff},
};

/// Solclean version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default currency for quotes
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Default number of decimal places for money amounts in quotes
pub const DEFAULT_MONEY_SCALE: u32 = 2;
