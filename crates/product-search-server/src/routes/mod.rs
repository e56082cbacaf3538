//! API route table.

pub mod products;
pub mod recommendations;
pub mod search;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Routes mounted under each API prefix.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/advanced_search", post(search::advanced_search))
        .route("/products/categories", get(products::categories))
        .route("/products/quick", post(products::quick_create))
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::replace_product)
                .patch(products::patch_product)
                .delete(products::delete_product),
        )
        .route("/search", get(search::query_search))
        .route("/recommendations", get(recommendations::list))
        .route("/recommendations/generate", post(recommendations::generate))
        .route("/recommendations/statistics", get(recommendations::statistics))
        .route("/recommendations/:id", get(recommendations::get))
        .route("/chat", post(recommendations::chat))
}
