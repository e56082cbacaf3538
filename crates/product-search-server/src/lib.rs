//! Product search server: HTTP API over the product catalog and the AI
//! recommendation pipeline.

pub mod config;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;

pub use config::{resolve_db_path, resolve_inference, resolve_token};
pub use server::{router, run};
pub use state::AppState;
