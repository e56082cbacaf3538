//! Recommendation history, generation and the legacy chat endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use product_search::{
    NewRecommendation, RecommendationDraft, RecommendationQuery, RecommendationRequest,
    RecommendationStats, RecommendationView,
};

use crate::state::AppState;
use crate::types::ApiResult;

/// Shortest description the chat endpoint accepts.
const CHAT_MIN_CHARS: usize = 3;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<RecommendationView>>> {
    let query = RecommendationQuery {
        search: params.search.filter(|s| !s.trim().is_empty()),
        oldest_first: params.ordering.as_deref() == Some("created_at"),
    };
    let recs = state.store.lock().await.list_recommendations(&query)?;
    Ok(Json(recs.iter().map(|r| r.view()).collect()))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecommendationView>> {
    let rec = state.store.lock().await.get_recommendation(id)?;
    Ok(Json(rec.view()))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<Json<RecommendationStats>> {
    let stats = state.store.lock().await.recommendation_stats(Utc::now())?;
    Ok(Json(stats))
}

/// `POST /recommendations/generate`: generate, persist and report.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecommendationRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    let request = request.validate()?;
    let parameters = json!({
        "descripcion": request.description,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "generate_image": request.generate_image,
    });

    let draft = match state.recommender.recommend(&request).await {
        Ok(draft) => draft,
        Err(e) => {
            let body = json!({
                "status": "error",
                "error": generation_error(e),
                "producto": null,
                "imagen": null,
                "metadata": {
                    "descripcion": request.description,
                    "parameters": parameters,
                },
            });
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
        }
    };

    let saved = save(&state, &request, &draft).await;

    Ok(Json(json!({
        "status": "success",
        "producto": draft.product,
        "imagen": image_field(&draft),
        "metadata": {
            "descripcion": request.description,
            "parameters": parameters,
            "text_generation_success": true,
            "image_generation_success": draft.has_image(),
            "saved_recommendation": saved,
        },
    }))
    .into_response())
}

async fn save(state: &AppState, request: &RecommendationRequest, draft: &RecommendationDraft) -> Value {
    let rec = NewRecommendation {
        description: request.description.clone(),
        recommended_product: draft.product.clone(),
        image_url: draft.image_data_url(),
    };
    match state.store.lock().await.insert_recommendation(&rec) {
        Ok(saved) => {
            tracing::info!(id = saved.id, "recommendation saved");
            serde_json::to_value(saved.view()).unwrap_or(Value::Null)
        }
        Err(e) => {
            tracing::error!("Failed to save recommendation: {e}");
            Value::Null
        }
    }
}

fn image_field(draft: &RecommendationDraft) -> Value {
    if draft.has_image() {
        Value::String(draft.image_base64.clone())
    } else {
        Value::Null
    }
}

fn generation_error(err: product_search::CatalogError) -> String {
    match err {
        product_search::CatalogError::Generation(message) => message,
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub descripcion: String,
}

/// `POST /chat`: generate without persisting.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(json) => json,
        Err(_) => return chat_error(StatusCode::BAD_REQUEST, "Invalid JSON".to_string()),
    };
    let description = input.descripcion.trim();
    if description.chars().count() < CHAT_MIN_CHARS {
        return chat_error(
            StatusCode::BAD_REQUEST,
            "The description must be at least 3 characters long".to_string(),
        );
    }

    match state
        .recommender
        .recommend(&RecommendationRequest::new(description))
        .await
    {
        Ok(draft) => Json(json!({
            "producto": draft.product,
            "imagen": image_field(&draft),
            "status": "success",
        }))
        .into_response(),
        Err(e) => chat_error(StatusCode::INTERNAL_SERVER_ERROR, generation_error(e)),
    }
}

fn chat_error(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "error": error, "status": "error" }))).into_response()
}
