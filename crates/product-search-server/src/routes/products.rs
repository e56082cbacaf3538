//! Product CRUD, categories and quick-create handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use product_search::validation::ValidProduct;
use product_search::{
    validate_new_product, CatalogError, NewProduct, ProductDetail, ProductPatch, ProductQuery,
    ProductSummary,
};

use crate::state::AppState;
use crate::types::{ApiError, ApiResult};

/// Category given to products created through the quick endpoint.
const QUICK_CATEGORY: &str = "Unknown";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub ordering: Option<String>,
}

impl ListParams {
    fn into_query(self) -> ApiResult<ProductQuery> {
        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite())
                    .ok_or_else(|| ApiError::field("price", "Enter a number."))?,
            ),
        };
        let query = ProductQuery {
            search: self.search.filter(|s| !s.trim().is_empty()),
            category: self.category.filter(|c| !c.is_empty()),
            price,
            ..Default::default()
        };
        Ok(query.with_ordering(self.ordering.as_deref()))
    }
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    let query = params.into_query()?;
    let products = state.store.lock().await.list_products(&query)?;
    Ok(Json(products.iter().map(|p| p.summary()).collect()))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    let Json(input) = body?;
    let valid = validate_new_product(input)?;
    let product = state.store.lock().await.create_product(&valid)?;
    tracing::info!(id = product.id, name = %product.name, "product created");
    Ok((StatusCode::CREATED, Json(product.detail())))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductDetail>> {
    let product = state.store.lock().await.get_product(id)?;
    Ok(Json(product.detail()))
}

pub async fn replace_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<Json<ProductDetail>> {
    let Json(input) = body?;
    let valid = validate_new_product(input)?;
    let product = state.store.lock().await.update_product(id, &valid)?;
    Ok(Json(product.detail()))
}

pub async fn patch_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> ApiResult<Json<ProductDetail>> {
    let Json(patch) = body?;
    let product = state.store.lock().await.patch_product(id, patch)?;
    Ok(Json(product.detail()))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.store.lock().await.delete_product(id)?;
    tracing::info!(id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let categories = state.store.lock().await.categories()?;
    Ok(Json(json!({ "categories": categories })))
}

#[derive(Debug, Deserialize)]
pub struct QuickProduct {
    #[serde(default)]
    pub name: Option<String>,
}

/// Create a placeholder product from a bare name.
pub async fn quick_create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QuickProduct>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = body?;
    let name = input.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Ok(Json(json!({ "success": false, "error": "Product name is required" })));
    }

    let product = ValidProduct {
        name: name.to_string(),
        category: QUICK_CATEGORY.to_string(),
        price: 0.0,
        images: Vec::new(),
    };
    match state.store.lock().await.create_unique_product(&product) {
        Ok(created) => {
            tracing::info!(id = created.id, name = %created.name, "quick product created");
            Ok(Json(json!({ "success": true })))
        }
        Err(CatalogError::DuplicateProduct(_)) => Ok(Json(
            json!({ "success": false, "error": "Product already exists" }),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_search::ProductOrdering;

    #[test]
    fn test_list_params_parse() {
        let params = ListParams {
            search: Some("  ".to_string()),
            category: Some("Electronics".to_string()),
            price: Some("19.99".to_string()),
            ordering: Some("-price".to_string()),
        };
        let query = params.into_query().unwrap();
        assert_eq!(query.search, None);
        assert_eq!(query.category.as_deref(), Some("Electronics"));
        assert_eq!(query.price, Some(19.99));
        assert_eq!(query.ordering, ProductOrdering::Price);
        assert!(query.descending);
    }

    #[test]
    fn test_list_params_bad_price() {
        let params = ListParams {
            price: Some("cheap".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::Validation(_))));
    }
}
