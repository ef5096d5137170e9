//! Pricing module
//!
//! - [`resolver`]: picks the grid applying to a target
//! - [`evaluator`]: prices a service from a grid line
//! - [`special`]: special site tariffs that bypass grids
//! - [`engine`]: the three combined into quotes

pub mod engine;
pub mod evaluator;
pub mod resolver;
pub mod special;

pub use engine::TariffEngine;
pub use resolver::{GridResolver, ResolvedGrid, ScopeStrategy, SCOPE_STRATEGIES};
pub use special::{OverridePrice, SpecialSiteOverride};
