//! # Solclean Service
//!
//! REST front of the tariff engine: quotes for the invoicing and quoting
//! flows, plus the admin lifecycle of grids and special site tariffs.

pub mod api;
pub mod error;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use prometheus::Registry;
use solclean_tarif::{InMemoryTariffStore, TariffEngine};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TariffEngine<InMemoryTariffStore>>,
    pub registry: Registry,
}

impl AppState {
    pub fn new(engine: TariffEngine<InMemoryTariffStore>, registry: Registry) -> Self {
        Self {
            engine: Arc::new(engine),
            registry,
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    Router::new()
        .route("/health", get(api::health))
        .route("/metrics", get(api::metrics))
        .route("/api/v1/version", get(api::version))
        .route("/api/v1/stats", get(api::stats))
        // Pricing
        .route("/api/v1/quotes", post(api::create_quote))
        // Tariff grids
        .route("/api/v1/grids", get(api::list_grids).post(api::upsert_grid))
        .route("/api/v1/grids/:id", get(api::get_grid))
        .route("/api/v1/grids/:id/active", post(api::set_grid_active))
        .route("/api/v1/grids/:id/duplicate", post(api::duplicate_grid))
        // Special site tariffs
        .route(
            "/api/v1/special-tariffs",
            get(api::list_special_tariffs).post(api::upsert_special_tariff),
        )
        .route(
            "/api/v1/special-tariffs/:id/active",
            post(api::set_special_tariff_active),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
