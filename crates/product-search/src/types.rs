//! Core data types for the product catalog and stored recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::format_price;

/// Characters kept in a recommendation description preview.
const PREVIEW_CHARS: usize = 100;

/// A product row in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub images: Vec<String>,
}

impl Product {
    /// Compact view used in listings and search results.
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            price: self.price,
            price_formatted: format_price(self.price),
        }
    }

    /// Full view used for single-product responses.
    pub fn detail(&self) -> ProductDetail {
        ProductDetail {
            id: self.id,
            url: format!("/api/products/{}", self.id),
            name: self.name.clone(),
            category: self.category.clone(),
            price: self.price,
            price_formatted: format_price(self.price),
            images: self.images.clone(),
            has_images: !self.images.is_empty(),
            image_count: self.images.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub price_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub price_formatted: String,
    pub images: Vec<String>,
    pub has_images: bool,
    pub image_count: usize,
}

/// Input for creating (or fully replacing) a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Partial product update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Sort key for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrdering {
    #[default]
    Name,
    Price,
    Category,
}

/// Filters for the product listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Case-insensitive substring over name and category.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Exact price (compared in cents).
    pub price: Option<f64>,
    pub ordering: ProductOrdering,
    pub descending: bool,
}

impl ProductQuery {
    /// Parse an ordering parameter such as `price` or `-name`.
    /// Unknown fields fall back to ascending name.
    pub fn with_ordering(mut self, raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or("").trim();
        let (descending, field) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let ordering = match field {
            "name" => Some(ProductOrdering::Name),
            "price" => Some(ProductOrdering::Price),
            "category" => Some(ProductOrdering::Category),
            _ => None,
        };
        match ordering {
            Some(o) => {
                self.ordering = o;
                self.descending = descending;
            }
            None => {
                self.ordering = ProductOrdering::Name;
                self.descending = false;
            }
        }
        self
    }
}

/// Category with the number of products filed under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

/// A stored AI recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub description: String,
    pub recommended_product: String,
    /// `data:` URL of the generated image, or empty.
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn view(&self) -> RecommendationView {
        RecommendationView {
            id: self.id,
            description: self.description.clone(),
            description_preview: description_preview(&self.description),
            recommended_product: self.recommended_product.clone(),
            image_url: self.image_url.clone(),
            created_at: self.created_at,
            created_at_formatted: self.created_at.format("%d/%m/%Y %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationView {
    pub id: i64,
    pub description: String,
    pub description_preview: String,
    pub recommended_product: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub created_at_formatted: String,
}

/// Input for persisting a recommendation.
#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub description: String,
    pub recommended_product: String,
    pub image_url: String,
}

/// Filters for the recommendation listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct RecommendationQuery {
    /// Case-insensitive substring over description and recommended product.
    pub search: Option<String>,
    /// Oldest first when set; newest first otherwise.
    pub oldest_first: bool,
}

/// How often a category shows up among recommended products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub total_recommendations: u64,
    pub recent_recommendations: u64,
    pub top_categories: Vec<CategoryTally>,
    pub period_analyzed: String,
}

fn description_preview(description: &str) -> String {
    let mut chars = description.chars();
    let preview: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Errors that can occur in the catalog library.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Recommendation not found: {0}")]
    RecommendationNotFound(i64),

    #[error("Strategy '{requested}' is not supported. Available: {available}")]
    UnknownStrategy { requested: String, available: String },

    #[error("Generator type '{requested}' is not supported. Available types: {available}")]
    UnknownGenerator { requested: String, available: String },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Product already exists: {0}")]
    DuplicateProduct(String),
}

impl CatalogError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CatalogError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience result type.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn product(images: Vec<String>) -> Product {
        Product {
            id: 7,
            name: "Laptop Gamer".to_string(),
            category: "Electronics".to_string(),
            price: 1499.9,
            images,
        }
    }

    #[test]
    fn test_detail_view() {
        let detail = product(vec!["a.png".into(), "b.png".into()]).detail();
        assert_eq!(detail.url, "/api/products/7");
        assert_eq!(detail.price_formatted, "$1,499.90");
        assert!(detail.has_images);
        assert_eq!(detail.image_count, 2);

        let bare = product(vec![]).detail();
        assert!(!bare.has_images);
        assert_eq!(bare.image_count, 0);
    }

    #[test]
    fn test_ordering_parse() {
        let q = ProductQuery::default().with_ordering(Some("-price"));
        assert_eq!(q.ordering, ProductOrdering::Price);
        assert!(q.descending);

        let q = ProductQuery::default().with_ordering(Some("category"));
        assert_eq!(q.ordering, ProductOrdering::Category);
        assert!(!q.descending);

        let q = ProductQuery::default().with_ordering(Some("-rating"));
        assert_eq!(q.ordering, ProductOrdering::Name);
        assert!(!q.descending);
    }

    #[test]
    fn test_description_preview() {
        assert_eq!(description_preview("short"), "short");
        let exact: String = "x".repeat(100);
        assert_eq!(description_preview(&exact), exact);
        let long: String = "ñ".repeat(120);
        let preview = description_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 103);
    }

    #[test]
    fn test_recommendation_view_formats_date() {
        let created_at = DateTime::parse_from_rfc3339("2024-03-05T14:07:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let rec = Recommendation {
            id: 1,
            description: "a notebook for class".to_string(),
            recommended_product: "Spiral Notebook: 200 pages".to_string(),
            image_url: String::new(),
            created_at,
        };
        assert_eq!(rec.view().created_at_formatted, "05/03/2024 14:07");
    }
}
