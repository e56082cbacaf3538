//! HTTP server: routing, auth, CORS and /health.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::routes;
use crate::state::AppState;
use crate::types::{ApiError, ApiResult};

/// Build the application router.
///
/// The API is mounted under both `/api/v1` and `/api`; `/health` bypasses
/// the auth layer.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", routes::api_routes())
        .nest("/api", routes::api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn run(state: Arc<AppState>, addr: &str) -> ApiResult<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("HTTP API listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(())
}

/// Checks the bearer token when one is configured.
async fn auth_layer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);

        if !authorized {
            tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
            return ApiError::Unauthorized.into_response();
        }
    }

    next.run(request).await
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let products = state.store.lock().await.count_products().ok();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "products": products,
    }))
}
