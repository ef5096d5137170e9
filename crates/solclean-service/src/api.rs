//! Request handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use solclean_common::{
    PriceQuote, PricingRequest, SpecialSiteTariff, StoreError, TariffGrid, VERSION,
};
use solclean_tarif::{StoreStats, TariffStore};
use tracing::info;

use crate::{error::ApiError, AppState};

/// Body of the activation toggles
#[derive(Debug, Deserialize)]
pub struct ActiveToggle {
    pub active: bool,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

pub async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "solclean-service",
        "version": VERSION,
        "description": "Tariff resolution engine for solar-panel cleaning services",
    }))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}

pub async fn stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.engine.store().stats())
}

pub async fn create_quote(
    State(state): State<AppState>,
    Json(request): Json<PricingRequest>,
) -> Result<Json<PriceQuote>, ApiError> {
    let quote = state.engine.quote(&request).await?;
    Ok(Json(quote))
}

pub async fn list_grids(State(state): State<AppState>) -> Result<Json<Vec<TariffGrid>>, ApiError> {
    Ok(Json(state.engine.store().list_grids().await?))
}

pub async fn get_grid(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TariffGrid>, ApiError> {
    let grid = state
        .engine
        .store()
        .get_grid(&id)
        .await?
        .ok_or(StoreError::GridNotFound(id))?;
    Ok(Json(grid))
}

pub async fn upsert_grid(
    State(state): State<AppState>,
    Json(grid): Json<TariffGrid>,
) -> Result<Json<TariffGrid>, ApiError> {
    state.engine.store().upsert_grid(grid.clone()).await?;
    info!(grid_id = %grid.id, scope = %grid.scope.scope_type(), "Grid saved");
    Ok(Json(grid))
}

pub async fn set_grid_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(toggle): Json<ActiveToggle>,
) -> Result<Json<TariffGrid>, ApiError> {
    let grid = state
        .engine
        .store()
        .set_grid_active(&id, toggle.active)
        .await?;
    Ok(Json(grid))
}

pub async fn duplicate_grid(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TariffGrid>), ApiError> {
    let copy = state.engine.store().duplicate_grid(&id).await?;
    info!(source_id = %id, grid_id = %copy.id, "Grid duplicated");
    Ok((StatusCode::CREATED, Json(copy)))
}

pub async fn list_special_tariffs(
    State(state): State<AppState>,
) -> Result<Json<Vec<SpecialSiteTariff>>, ApiError> {
    Ok(Json(state.engine.store().list_special_tariffs().await?))
}

pub async fn upsert_special_tariff(
    State(state): State<AppState>,
    Json(tariff): Json<SpecialSiteTariff>,
) -> Result<Json<SpecialSiteTariff>, ApiError> {
    state
        .engine
        .store()
        .upsert_special_tariff(tariff.clone())
        .await?;
    info!(tariff_id = %tariff.id, site_id = %tariff.site_id, "Special site tariff saved");
    Ok(Json(tariff))
}

pub async fn set_special_tariff_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(toggle): Json<ActiveToggle>,
) -> Result<Json<SpecialSiteTariff>, ApiError> {
    let tariff = state
        .engine
        .store()
        .set_special_tariff_active(&id, toggle.active)
        .await?;
    Ok(Json(tariff))
}

#[cfg(test)]
mod tests {
    use crate::{router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use chrono::NaiveDate;
    use prometheus::Registry;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use solclean_common::{
        GridLine, GridScope, PriceQuote, PriceSource, SpecialSiteTariff, SurfaceTier,
        TariffGrid, Validity,
    };
    use solclean_tarif::{
        InMemoryTariffStore, PricingSettings, TariffEngine, TariffStore, TarifMetrics,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn window() -> Validity {
        Validity::starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn general_grid() -> TariffGrid {
        TariffGrid::new("g-general", "Général", GridScope::General, window()).with_line(
            GridLine::tiered(
                "NM04",
                vec![
                    SurfaceTier::bounded(dec!(0), dec!(500), dec!(1.60)),
                    SurfaceTier::bounded(dec!(500), dec!(1000), dec!(1.50)),
                    SurfaceTier::open(dec!(1000), dec!(1.40)),
                ],
            ),
        )
    }

    fn forfait() -> SpecialSiteTariff {
        SpecialSiteTariff::forfait("sp-1", "S1", window(), dec!(500), dec!(1000), dec!(0.40))
    }

    async fn app() -> Router {
        let store = Arc::new(InMemoryTariffStore::new());
        store.upsert_grid(general_grid()).await.unwrap();
        store.upsert_special_tariff(forfait()).await.unwrap();

        let registry = Registry::new();
        let metrics = Arc::new(TarifMetrics::new().unwrap());
        metrics.register(&registry).unwrap();

        let engine = TariffEngine::new(store, PricingSettings::default()).with_metrics(metrics);
        router(AppState::new(engine, registry))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn quote_body(service_code: &str, site_id: &str, surface: &str) -> Value {
        json!({
            "service_code": service_code,
            "site_id": site_id,
            "client_id": "C1",
            "surface": surface,
            "as_of": "2024-06-01",
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send_json(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_quote_from_general_grid() {
        let app = app().await;
        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S2", "800")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let quote: PriceQuote = serde_json::from_value(body).unwrap();
        assert_eq!(quote.total_price, dec!(1200));
        assert_eq!(quote.unit_price, dec!(1.50));
        assert!(matches!(quote.source, PriceSource::Grid { ref grid_id, .. } if grid_id == "g-general"));
    }

    #[tokio::test]
    async fn test_quote_from_special_tariff() {
        let app = app().await;
        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S1", "1500")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"]["source"], "special_tariff");

        let quote: PriceQuote = serde_json::from_value(body).unwrap();
        assert_eq!(quote.total_price, dec!(700));
    }

    #[tokio::test]
    async fn test_quote_errors_carry_codes() {
        let app = app().await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("XX99", "S2", "10")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "no_pricing_line_for_service");

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S2", "-5")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_surface");
    }

    #[tokio::test]
    async fn test_deactivated_grid_leaves_no_fallback() {
        let app = app().await;
        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/grids/g-general/active",
            Some(json!({"active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], false);

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S2", "800")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "no_applicable_grid");
    }

    #[tokio::test]
    async fn test_deactivated_special_tariff_falls_back_to_grid() {
        let app = app().await;
        let (status, _) = send_json(
            &app,
            Method::POST,
            "/api/v1/special-tariffs/sp-1/active",
            Some(json!({"active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S1", "1500")),
        )
        .await;
        let quote: PriceQuote = serde_json::from_value(body).unwrap();
        // 1500 m² in the open tier at 1.40
        assert_eq!(quote.total_price, dec!(2100));
    }

    #[tokio::test]
    async fn test_grid_admin_lifecycle() {
        let app = app().await;

        let site_grid = TariffGrid::new("g-site", "Site S2", GridScope::Site("S2".to_string()), window())
            .with_line(GridLine::flat("NM04", dec!(900)));
        let (status, _) = send_json(
            &app,
            Method::POST,
            "/api/v1/grids",
            Some(serde_json::to_value(&site_grid).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, Method::GET, "/api/v1/grids/g-site", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Site S2");

        let (status, body) =
            send_json(&app, Method::POST, "/api/v1/grids/g-site/duplicate", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["active"], false);
        assert_eq!(body["name"], "Site S2 (copy)");
        assert_ne!(body["id"], "g-site");

        let (_, body) = send_json(&app, Method::GET, "/api/v1/grids", None).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        // The site grid now wins over the general grid
        let (_, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S2", "800")),
        )
        .await;
        let quote: PriceQuote = serde_json::from_value(body).unwrap();
        assert_eq!(quote.total_price, dec!(900));
    }

    #[tokio::test]
    async fn test_invalid_grid_rejected() {
        let app = app().await;
        let grid = TariffGrid::new("g-bad", "Broken", GridScope::General, window())
            .with_line(GridLine::tiered("NM04", vec![]));

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/grids",
            Some(serde_json::to_value(&grid).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation");

        let (status, body) = send_json(&app, Method::GET, "/api/v1/grids/g-bad", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "grid_not_found");
    }

    #[tokio::test]
    async fn test_special_tariff_listing() {
        let app = app().await;
        let (status, body) = send_json(&app, Method::GET, "/api/v1/special-tariffs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "sp-1");

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/special-tariffs/unknown/active",
            Some(json!({"active": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "special_tariff_not_found");
    }

    #[tokio::test]
    async fn test_metrics_exposed() {
        let app = app().await;
        send(
            &app,
            Method::POST,
            "/api/v1/quotes",
            Some(quote_body("NM04", "S2", "800")),
        )
        .await;

        let (status, bytes) = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("solclean_quotes_total"));
    }

    #[tokio::test]
    async fn test_stats() {
        let app = app().await;
        let (status, body) = send_json(&app, Method::GET, "/api/v1/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_grids"], 1);
        assert_eq!(body["active_special_tariffs"], 1);
    }
}
