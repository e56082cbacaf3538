//! Error types and their HTTP status mapping.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use product_search::CatalogError;

/// All errors a request handler can return.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// One or more fields failed validation.
    #[error("Validation failed")]
    Validation(BTreeMap<String, Vec<String>>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation { field, message } => ApiError::field(&field, message),
            CatalogError::UnknownStrategy { .. } => ApiError::field("search_type", err.to_string()),
            CatalogError::DuplicateProduct(_) => ApiError::field("name", err.to_string()),
            CatalogError::ProductNotFound(_) => ApiError::NotFound("Product not found.".into()),
            CatalogError::RecommendationNotFound(_) => {
                ApiError::NotFound("Recommendation not found.".into())
            }
            CatalogError::UnknownGenerator { .. } => ApiError::BadRequest(err.to_string()),
            other => {
                tracing::error!("Request failed: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::field("non_field_errors", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
