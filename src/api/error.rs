use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::api::auth::AuthError;
use crate::store::StoreError;
use crate::EcommerceError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a handler can fail with. Renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Domain(#[from] EcommerceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Domain(e) => match e {
                EcommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                EcommerceError::Conflict(_) => StatusCode::CONFLICT,
                EcommerceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EcommerceError::Validation(_)
                | EcommerceError::OutOfStock(_)
                | EcommerceError::LimitExceeded(_)
                | EcommerceError::InsufficientFunds(_)
                | EcommerceError::InvalidTransition(_)
                | EcommerceError::CouponRejected(_) => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken => Self::Unauthorized(e.to_string()),
            AuthError::Inactive | AuthError::Blocked | AuthError::WrongRole(_) => Self::Forbidden(e.to_string()),
            AuthError::Database(source) => Self::Domain(EcommerceError::Store(StoreError::Database(source))),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(EcommerceError::not_found("order")), StatusCode::NOT_FOUND),
            (EcommerceError::Conflict("coupon code already exists".into()).into(), StatusCode::CONFLICT),
            (EcommerceError::InsufficientFunds("low".into()).into(), StatusCode::BAD_REQUEST),
            (AuthError::InvalidToken.into(), StatusCode::UNAUTHORIZED),
            (AuthError::Blocked.into(), StatusCode::FORBIDDEN),
            (EcommerceError::Store(StoreError::corrupt("orders", "bad status")).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }

    #[test]
    fn test_store_detail_is_hidden() {
        let response = ApiError::from(EcommerceError::Store(StoreError::corrupt("orders", "bad status"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
