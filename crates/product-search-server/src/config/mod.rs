//! Configuration loading and resolution.

use std::path::PathBuf;

use product_search::generator::{InferenceConfig, DEFAULT_BASE_URL};

/// Listen address used when none is given.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Resolve the catalog database path.
pub fn resolve_db_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }

    if let Ok(env_path) = std::env::var("PRODUCT_SEARCH_DB") {
        return env_path;
    }

    let cwd_db = PathBuf::from(".product-search/catalog.db");
    if cwd_db.exists() {
        return cwd_db.display().to_string();
    }

    resolve_default_db_path()
}

fn resolve_default_db_path() -> String {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    format!("{home}/.product-search/catalog.db")
}

/// Bearer token guarding the API: CLI flag, then `PRODUCT_SEARCH_TOKEN`.
pub fn resolve_token(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| std::env::var("PRODUCT_SEARCH_TOKEN").ok())
        .filter(|t| !t.is_empty())
}

/// Inference host settings: CLI flags first, then `HUGGINGFACE_API_KEY` and
/// `INFERENCE_BASE_URL`.
pub fn resolve_inference(api_key: Option<String>, base_url: Option<String>) -> InferenceConfig {
    let api_key = api_key
        .or_else(|| std::env::var("HUGGINGFACE_API_KEY").ok())
        .filter(|k| !k.is_empty());
    if api_key.is_none() {
        tracing::warn!("No inference API key configured");
    }
    let base_url = base_url
        .or_else(|| std::env::var("INFERENCE_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    InferenceConfig {
        base_url,
        api_key,
        ..Default::default()
    }
}
