//! Product catalog library: SQLite storage, strategy-based search, and
//! AI-generated product recommendations.

pub mod generator;
pub mod loader;
pub mod recommend;
pub mod search;
pub mod storage;
pub mod strategy;
pub mod types;
pub mod validation;

pub use generator::{
    AiGenerator, GenerationOutput, GenerationParams, GeneratorFactory, ImageGenerator,
    InferenceClient, InferenceConfig, TextGenerator,
};
pub use loader::{JsonProductLoader, ProductLoader};
pub use recommend::{RecommendationDraft, RecommendationRequest, Recommender};
pub use search::{run_search, SearchRequest};
pub use storage::CatalogStore;
pub use strategy::{SearchContext, SearchOutcome, SearchStrategy, StrategyArgs, StrategyKind};
pub use types::*;
pub use validation::{format_price, validate_new_product, validate_patch, ValidProduct};
