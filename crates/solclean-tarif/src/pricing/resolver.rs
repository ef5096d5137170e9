//! Grid resolver
//!
//! Picks the single grid that applies to a (site, client, group) target at a
//! reference date. Scope precedence is data, not control flow: the
//! [`SCOPE_STRATEGIES`] table is tried in order and the first strategy that
//! finds a grid wins.

use chrono::NaiveDate;
use solclean_common::{GridScope, PriceTarget, ScopeType, StoreError, TariffGrid};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::store::TariffStore;

/// Pure lookup of one scope level among applicable candidates
pub type ScopeStrategy = for<'a> fn(&'a [TariffGrid], &PriceTarget) -> Option<&'a TariffGrid>;

/// Scope levels from highest to lowest precedence
pub const SCOPE_STRATEGIES: [(ScopeType, ScopeStrategy); 4] = [
    (ScopeType::Site, site_grid as ScopeStrategy),
    (ScopeType::Client, client_grid as ScopeStrategy),
    (ScopeType::Group, group_grid as ScopeStrategy),
    (ScopeType::General, general_grid as ScopeStrategy),
];

fn entity_grid<'a>(
    candidates: &'a [TariffGrid],
    scope: ScopeType,
    entity: Option<&str>,
) -> Option<&'a TariffGrid> {
    let entity = entity?;
    candidates
        .iter()
        .find(|g| g.scope.scope_type() == scope && g.scope.entity_id() == Some(entity))
}

pub fn site_grid<'a>(candidates: &'a [TariffGrid], target: &PriceTarget) -> Option<&'a TariffGrid> {
    entity_grid(candidates, ScopeType::Site, target.site_id.as_deref())
}

pub fn client_grid<'a>(
    candidates: &'a [TariffGrid],
    target: &PriceTarget,
) -> Option<&'a TariffGrid> {
    entity_grid(candidates, ScopeType::Client, target.client_id.as_deref())
}

pub fn group_grid<'a>(candidates: &'a [TariffGrid], target: &PriceTarget) -> Option<&'a TariffGrid> {
    entity_grid(candidates, ScopeType::Group, target.group_id.as_deref())
}

pub fn general_grid<'a>(
    candidates: &'a [TariffGrid],
    _target: &PriceTarget,
) -> Option<&'a TariffGrid> {
    candidates.iter().find(|g| g.scope == GridScope::General)
}

/// Active grids valid at `as_of`, ordered by priority (stable, so equal
/// priorities keep store order)
pub fn candidates(grids: impl IntoIterator<Item = TariffGrid>, as_of: NaiveDate) -> Vec<TariffGrid> {
    let mut candidates: Vec<TariffGrid> = grids
        .into_iter()
        .filter(|g| g.is_applicable(as_of))
        .collect();
    candidates.sort_by_key(|g| g.priority);
    candidates
}

/// Run the scope strategies over prepared candidates
pub fn select<'a>(
    candidates: &'a [TariffGrid],
    target: &PriceTarget,
) -> Option<(ScopeType, &'a TariffGrid)> {
    SCOPE_STRATEGIES
        .iter()
        .find_map(|(scope, strategy)| strategy(candidates, target).map(|grid| (*scope, grid)))
}

/// Grid chosen for a target, with the scope level that matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrid {
    pub grid: TariffGrid,
    pub matched_scope: ScopeType,
}

/// Resolve among an in-memory list of grids
pub fn resolve_in(
    grids: impl IntoIterator<Item = TariffGrid>,
    target: &PriceTarget,
    as_of: NaiveDate,
) -> Option<ResolvedGrid> {
    let candidates = candidates(grids, as_of);
    let resolved = select(&candidates, target).map(|(matched_scope, grid)| ResolvedGrid {
        grid: grid.clone(),
        matched_scope,
    });

    match &resolved {
        Some(r) => debug!(
            grid_id = %r.grid.id,
            scope = %r.matched_scope,
            candidates = candidates.len(),
            "Resolved tariff grid"
        ),
        None => debug!(candidates = candidates.len(), "No tariff grid matched"),
    }
    resolved
}

/// Grid resolver backed by a tariff store
pub struct GridResolver<S> {
    store: Arc<S>,
}

impl<S: TariffStore> GridResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve the grid applying to `target` at `as_of`.
    ///
    /// `Ok(None)` means no grid applies; it is up to the caller to treat it
    /// as a missing price.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        target: &PriceTarget,
        as_of: NaiveDate,
    ) -> Result<Option<ResolvedGrid>, StoreError> {
        let grids = self.store.active_grids().await?;
        Ok(resolve_in(grids, target, as_of))
    }
}
