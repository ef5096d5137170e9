//! HTTP mapping of engine errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use solclean_common::{PricingError, SolcleanError, StoreError};
use tracing::{error, warn};

/// Error returned by every handler
///
/// Rendered as `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl From<SolcleanError> for ApiError {
    fn from(err: SolcleanError) -> Self {
        let message = err.to_string();
        match err {
            SolcleanError::Pricing(PricingError::InvalidSurface(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_surface", message)
            }
            SolcleanError::Pricing(PricingError::Overflow) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "overflow", message)
            }
            // Data gaps in the tariff configuration
            SolcleanError::Pricing(e) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.code(), message)
            }
            SolcleanError::Store(e) => e.into(),
            SolcleanError::Validation(_) => {
                Self::new(StatusCode::BAD_REQUEST, "validation", message)
            }
            SolcleanError::Config(_)
            | SolcleanError::Serialization(_)
            | SolcleanError::Internal(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::GridNotFound(_) => Self::new(StatusCode::NOT_FOUND, "grid_not_found", message),
            StoreError::SpecialTariffNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "special_tariff_not_found", message)
            }
            StoreError::Invalid(_) => Self::new(StatusCode::BAD_REQUEST, "validation", message),
            StoreError::Storage(_) | StoreError::Serialization(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "Request failed");
        } else {
            warn!(code = self.code, message = %self.message, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use solclean_common::ValidationError;

    #[test]
    fn test_pricing_gaps_are_unprocessable() {
        let err: ApiError = SolcleanError::from(PricingError::NoApplicableGrid {
            site: Some("S1".to_string()),
            client: None,
            group: None,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        })
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "no_applicable_grid");

        let err: ApiError = SolcleanError::from(PricingError::NoPricingLineForService {
            grid_id: "g".to_string(),
            service_code: "NM04".to_string(),
        })
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "no_pricing_line_for_service");
    }

    #[test]
    fn test_overflow_is_a_server_fault() {
        let err: ApiError = SolcleanError::from(PricingError::Overflow).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "overflow");

        let err: ApiError = SolcleanError::from(PricingError::InvalidSurface(Decimal::NEGATIVE_ONE)).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_errors() {
        let err: ApiError = StoreError::GridNotFound("g".to_string()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = StoreError::Invalid(ValidationError::MissingField("id")).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "validation");

        let err: ApiError = SolcleanError::Internal("boom".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
