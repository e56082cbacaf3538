//! Strategy-based product search endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use product_search::{run_search, ProductSummary, SearchOutcome, SearchRequest};

use crate::state::AppState;
use crate::types::ApiResult;

/// Body returned by both search endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<ProductSummary>,
    pub count: usize,
    pub strategy_used: String,
    pub query: String,
    pub parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            success: outcome.success,
            results: outcome.results.iter().map(|p| p.summary()).collect(),
            count: outcome.count,
            strategy_used: outcome.strategy_used,
            query: outcome.query,
            parameters: outcome.parameters,
            error: outcome.error,
        }
    }
}

async fn execute(state: &AppState, request: SearchRequest) -> Response {
    let products = state.store.lock().await.all_products();
    match products {
        Ok(products) => {
            let outcome = run_search(&products, &request);
            tracing::debug!(
                strategy = %outcome.strategy_used,
                count = outcome.count,
                "search served"
            );
            Json(SearchResponse::from(outcome)).into_response()
        }
        Err(e) => {
            tracing::error!("Search failed: {e}");
            let body = SearchResponse {
                success: false,
                results: Vec::new(),
                count: 0,
                strategy_used: "error".to_string(),
                query: request.q,
                parameters: Value::Object(Default::default()),
                error: Some(e.to_string()),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// `POST /products/advanced_search`
pub async fn advanced_search(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    let request = request.validate()?;
    Ok(execute(&state, request).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub search_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

/// `GET /search`
pub async fn query_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let request = SearchRequest::from_lenient(
        params.q.as_deref(),
        params.category.as_deref(),
        params.search_type.as_deref(),
        params.min_price.as_deref(),
        params.max_price.as_deref(),
    );
    execute(&state, request).await
}
