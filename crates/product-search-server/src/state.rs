//! Shared server state.

use tokio::sync::Mutex;

use product_search::{CatalogStore, Recommender};

/// State shared by every handler through axum's `State` extractor.
pub struct AppState {
    pub store: Mutex<CatalogStore>,
    pub recommender: Recommender,
    /// Bearer token required on `/api` routes, if set.
    pub token: Option<String>,
}

impl AppState {
    pub fn new(store: CatalogStore, recommender: Recommender, token: Option<String>) -> Self {
        Self {
            store: Mutex::new(store),
            recommender,
            token,
        }
    }
}
