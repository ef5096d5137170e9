//! Error types for the Solclean pricing engine
//!
//! Provides a unified error type and domain-specific error variants

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using SolcleanError
pub type Result<T> = std::result::Result<T, SolcleanError>;

/// Unified error type for Solclean operations
#[derive(Debug, Error)]
pub enum SolcleanError {
    // Pricing errors
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    // Store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Price computation errors
///
/// All of them are local to a single computation and deterministic: retrying
/// with the same inputs and the same persisted data yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error(
        "No applicable grid for site={site:?} client={client:?} group={group:?} at {as_of}"
    )]
    NoApplicableGrid {
        site: Option<String>,
        client: Option<String>,
        group: Option<String>,
        as_of: NaiveDate,
    },

    #[error("Grid {grid_id} has no pricing line for service {service_code}")]
    NoPricingLineForService {
        grid_id: String,
        service_code: String,
    },

    #[error("Surface {surface} is not covered by any tier of service {service_code} in grid {grid_id}")]
    AmbiguousTierBoundary {
        grid_id: String,
        service_code: String,
        surface: Decimal,
    },

    #[error("Invalid surface: {0} (must be zero or positive)")]
    InvalidSurface(Decimal),

    #[error("Pricing calculation overflow")]
    Overflow,
}

impl PricingError {
    /// Stable machine-readable code, used for metrics labels and API payloads
    pub fn code(&self) -> &'static str {
        match self {
            PricingError::NoApplicableGrid { .. } => "no_applicable_grid",
            PricingError::NoPricingLineForService { .. } => "no_pricing_line_for_service",
            PricingError::AmbiguousTierBoundary { .. } => "ambiguous_tier_boundary",
            PricingError::InvalidSurface(_) => "invalid_surface",
            PricingError::Overflow => "overflow",
        }
    }
}

/// Tariff store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Tariff grid not found: {0}")]
    GridNotFound(String),

    #[error("Special site tariff not found: {0}")]
    SpecialTariffNotFound(String),

    #[error("Rejected invalid record: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Data-integrity errors raised when an admin write is validated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Scope entity id must not be empty")]
    EmptyScopeEntity,

    #[error("Validity window ends ({end}) before it starts ({start})")]
    InvertedValidity { start: NaiveDate, end: NaiveDate },

    #[error("Duplicate service code {0}")]
    DuplicateServiceCode(String),

    #[error("Negative amount in {0}")]
    NegativeAmount(String),

    #[error("Service {0} has a tiered pricing with no tier")]
    EmptyTiers(String),

    #[error("Tier {index} of service {service_code} has max <= min")]
    EmptyTierRange { service_code: String, index: usize },

    #[error("Tiers {index} and {next} of service {service_code} overlap or are unsorted")]
    OverlappingTiers {
        service_code: String,
        index: usize,
        next: usize,
    },

    #[error("Only the last tier of service {0} may be unbounded")]
    UnboundedTierNotLast(String),

    #[error("Discount {0} exceeds 100%")]
    DiscountAboveHundredPercent(String),

    #[error("Invalid month {month} in condition of {label}")]
    InvalidMonth { label: String, month: u32 },

    #[error("Special tariff {0} has an empty fixed price list")]
    EmptyFixedPrices(String),

    #[error("Duplicate record id {0}")]
    DuplicateId(String),
}

// Implement From for common external error types
impl From<serde_json::Error> for SolcleanError {
    fn from(err: serde_json::Error) -> Self {
        SolcleanError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SolcleanError {
    fn from(err: std::io::Error) -> Self {
        SolcleanError::Store(StoreError::Storage(err.to_string()))
    }
}

impl From<anyhow::Error> for SolcleanError {
    fn from(err: anyhow::Error) -> Self {
        SolcleanError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}
