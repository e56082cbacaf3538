//! Interchangeable product search strategies.
//!
//! Each strategy is a filter (and, for fuzzy matching, an ordering) over the
//! catalog rows. [`StrategyKind`] maps request keys to strategies and
//! [`SearchContext`] runs whichever strategy is currently selected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{CatalogError, Product};

/// Extra strategy inputs beyond the text query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyArgs {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub category: Option<String>,
}

impl StrategyArgs {
    /// The arguments that were actually supplied, as a JSON object.
    pub fn to_parameters(&self) -> Value {
        let mut map = Map::new();
        if let Some(v) = self.min_price {
            map.insert("min_price".to_string(), Value::from(v));
        }
        if let Some(v) = self.max_price {
            map.insert("max_price".to_string(), Value::from(v));
        }
        if let Some(c) = &self.category {
            map.insert("category".to_string(), Value::from(c.clone()));
        }
        Value::Object(map)
    }
}

/// A search algorithm over the product catalog.
pub trait SearchStrategy: Send + Sync {
    /// Identifier reported back to clients as `strategy_used`.
    fn name(&self) -> &'static str;

    /// Select (and possibly reorder) matching products.
    fn search(&self, products: &[Product], query: &str, args: &StrategyArgs) -> Vec<Product>;
}

fn icontains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Case-insensitive equality on name or category.
pub struct ExactMatchStrategy;

impl SearchStrategy for ExactMatchStrategy {
    fn name(&self) -> &'static str {
        "exact_match"
    }

    fn search(&self, products: &[Product], query: &str, _args: &StrategyArgs) -> Vec<Product> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let q = query.to_lowercase();
        products
            .iter()
            .filter(|p| p.name.to_lowercase() == q || p.category.to_lowercase() == q)
            .cloned()
            .collect()
    }
}

/// Case-insensitive substring on name or category.
pub struct ContainsStrategy;

impl SearchStrategy for ContainsStrategy {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn search(&self, products: &[Product], query: &str, _args: &StrategyArgs) -> Vec<Product> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let q = query.to_lowercase();
        products
            .iter()
            .filter(|p| icontains(&p.name, &q) || icontains(&p.category, &q))
            .cloned()
            .collect()
    }
}

/// Multi-word partial matching ranked by term overlap.
pub struct FuzzyStrategy;

/// Score for a word found in the name.
const NAME_HIT: u32 = 3;
/// Score for a word found in the category.
const CATEGORY_HIT: u32 = 2;
/// Bonus for a word that is the entire name.
const EXACT_NAME_BONUS: u32 = 5;

impl FuzzyStrategy {
    fn words(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Relevance of a product for the given lower-cased words.
    pub fn relevance(product: &Product, words: &[String]) -> u32 {
        let name = product.name.to_lowercase();
        let category = product.category.to_lowercase();
        words.iter().fold(0, |mut score, word| {
            if name.contains(word.as_str()) {
                score += NAME_HIT;
            }
            if category.contains(word.as_str()) {
                score += CATEGORY_HIT;
            }
            if *word == name {
                score += EXACT_NAME_BONUS;
            }
            score
        })
    }
}

impl SearchStrategy for FuzzyStrategy {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn search(&self, products: &[Product], query: &str, _args: &StrategyArgs) -> Vec<Product> {
        let words = Self::words(query);
        if words.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(u32, &Product)> = products
            .iter()
            .filter(|p| {
                let name = p.name.to_lowercase();
                let category = p.category.to_lowercase();
                words
                    .iter()
                    .any(|w| name.contains(w.as_str()) || category.contains(w.as_str()))
            })
            .map(|p| (Self::relevance(p, &words), p))
            .collect();

        // Stable: equal scores keep catalog order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, p)| p.clone()).collect()
    }
}

/// Inclusive price window.
pub struct PriceRangeStrategy;

impl SearchStrategy for PriceRangeStrategy {
    fn name(&self) -> &'static str {
        "price_range"
    }

    fn search(&self, products: &[Product], _query: &str, args: &StrategyArgs) -> Vec<Product> {
        products
            .iter()
            .filter(|p| args.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| args.max_price.map_or(true, |max| p.price <= max))
            .cloned()
            .collect()
    }
}

/// Category filter with an optional name query inside the category.
pub struct CategoryStrategy;

impl SearchStrategy for CategoryStrategy {
    fn name(&self) -> &'static str {
        "category"
    }

    fn search(&self, products: &[Product], query: &str, args: &StrategyArgs) -> Vec<Product> {
        let category = match args.category.as_deref() {
            Some(c) if !c.is_empty() => c.to_lowercase(),
            _ => return Vec::new(),
        };
        let name_query = query.trim().to_lowercase();

        products
            .iter()
            .filter(|p| icontains(&p.category, &category))
            .filter(|p| name_query.is_empty() || icontains(&p.name, &name_query))
            .cloned()
            .collect()
    }
}

/// Registered strategy keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Exact,
    #[default]
    Contains,
    Fuzzy,
    PriceRange,
    Category,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Exact,
        StrategyKind::Contains,
        StrategyKind::Fuzzy,
        StrategyKind::PriceRange,
        StrategyKind::Category,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            StrategyKind::Exact => "exact",
            StrategyKind::Contains => "contains",
            StrategyKind::Fuzzy => "fuzzy",
            StrategyKind::PriceRange => "price_range",
            StrategyKind::Category => "category",
        }
    }

    /// Build the strategy registered under this key.
    pub fn create(&self) -> Box<dyn SearchStrategy> {
        match self {
            StrategyKind::Exact => Box::new(ExactMatchStrategy),
            StrategyKind::Contains => Box::new(ContainsStrategy),
            StrategyKind::Fuzzy => Box::new(FuzzyStrategy),
            StrategyKind::PriceRange => Box::new(PriceRangeStrategy),
            StrategyKind::Category => Box::new(CategoryStrategy),
        }
    }

    /// All registered keys, in registration order.
    pub fn available() -> Vec<&'static str> {
        Self::ALL.iter().map(StrategyKind::key).collect()
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StrategyKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.key() == s)
            .ok_or_else(|| CatalogError::UnknownStrategy {
                requested: s.to_string(),
                available: Self::available().join(", "),
            })
    }
}

/// Result of running a strategy, with the metadata echoed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub results: Vec<Product>,
    pub count: usize,
    pub strategy_used: String,
    pub query: String,
    pub parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    /// Replace the result set, keeping `count` in sync.
    pub fn with_results(mut self, results: Vec<Product>) -> Self {
        self.count = results.len();
        self.results = results;
        self
    }
}

/// Runs the currently selected strategy; switchable at runtime.
pub struct SearchContext {
    strategy: Box<dyn SearchStrategy>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new(StrategyKind::default().create())
    }
}

impl SearchContext {
    pub fn new(strategy: Box<dyn SearchStrategy>) -> Self {
        Self { strategy }
    }

    pub fn set_strategy(&mut self, strategy: Box<dyn SearchStrategy>) {
        self.strategy = strategy;
    }

    pub fn current_strategy(&self) -> &dyn SearchStrategy {
        self.strategy.as_ref()
    }

    pub fn execute(&self, products: &[Product], query: &str, args: &StrategyArgs) -> SearchOutcome {
        let results = self.strategy.search(products, query, args);
        tracing::debug!(
            strategy = self.strategy.name(),
            matches = results.len(),
            "search executed"
        );
        SearchOutcome {
            success: true,
            count: results.len(),
            results,
            strategy_used: self.strategy.name().to_string(),
            query: query.to_string(),
            parameters: args.to_parameters(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, category: &str, price: f64) -> Product {
        Product {
            id,
            name: name.to_string(),
            category: category.to_string(),
            price,
            images: vec![],
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "Gaming Laptop", "Electronics", 1200.0),
            product(2, "Laptop", "Electronics", 800.0),
            product(3, "Laptop Sleeve", "Accessories", 25.0),
            product(4, "Notebook", "Stationery", 3.5),
            product(5, "Gaming Chair", "Furniture", 300.0),
        ]
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_exact_match() {
        let s = ExactMatchStrategy;
        let none = StrategyArgs::default();
        assert_eq!(ids(&s.search(&catalog(), "laptop", &none)), vec![2]);
        assert_eq!(ids(&s.search(&catalog(), "ELECTRONICS", &none)), vec![1, 2]);
        assert!(s.search(&catalog(), "lap", &none).is_empty());
        assert!(s.search(&catalog(), "  ", &none).is_empty());
    }

    #[test]
    fn test_contains() {
        let s = ContainsStrategy;
        let none = StrategyArgs::default();
        assert_eq!(ids(&s.search(&catalog(), "LAPTOP", &none)), vec![1, 2, 3]);
        assert_eq!(ids(&s.search(&catalog(), "station", &none)), vec![4]);
        assert!(s.search(&catalog(), "", &none).is_empty());
    }

    #[test]
    fn test_fuzzy_orders_by_relevance() {
        let s = FuzzyStrategy;
        let none = StrategyArgs::default();
        let results = s.search(&catalog(), "gaming laptop", &none);
        // Gaming Laptop: 3 + 3 = 6; Laptop: 3 + 5 = 8; Laptop Sleeve: 3;
        // Gaming Chair: 3.
        assert_eq!(ids(&results), vec![2, 1, 3, 5]);
    }

    #[test]
    fn test_fuzzy_scores_category_hits() {
        let words = vec!["electronics".to_string()];
        assert_eq!(FuzzyStrategy::relevance(&catalog()[0], &words), CATEGORY_HIT);
        let s = FuzzyStrategy;
        assert!(s.search(&catalog(), " \t ", &StrategyArgs::default()).is_empty());
    }

    #[test]
    fn test_price_range() {
        let s = PriceRangeStrategy;
        let both = StrategyArgs {
            min_price: Some(25.0),
            max_price: Some(800.0),
            ..Default::default()
        };
        assert_eq!(ids(&s.search(&catalog(), "", &both)), vec![2, 3, 5]);

        let min_only = StrategyArgs {
            min_price: Some(500.0),
            ..Default::default()
        };
        assert_eq!(ids(&s.search(&catalog(), "", &min_only)), vec![1, 2]);

        let max_only = StrategyArgs {
            max_price: Some(3.5),
            ..Default::default()
        };
        assert_eq!(ids(&s.search(&catalog(), "", &max_only)), vec![4]);

        assert_eq!(s.search(&catalog(), "", &StrategyArgs::default()).len(), 5);
    }

    #[test]
    fn test_category() {
        let s = CategoryStrategy;
        let args = StrategyArgs {
            category: Some("electro".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&s.search(&catalog(), "", &args)), vec![1, 2]);
        assert_eq!(ids(&s.search(&catalog(), " gaming ", &args)), vec![1]);
        assert!(s.search(&catalog(), "", &StrategyArgs::default()).is_empty());
    }

    #[test]
    fn test_factory_keys_and_names() {
        assert_eq!(
            StrategyKind::available(),
            vec!["exact", "contains", "fuzzy", "price_range", "category"]
        );
        let kind: StrategyKind = "exact".parse().unwrap();
        assert_eq!(kind.create().name(), "exact_match");

        let err = "semantic".parse::<StrategyKind>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("semantic"));
        assert!(msg.contains("price_range"));
    }

    #[test]
    fn test_context_switches_strategy() {
        let mut ctx = SearchContext::default();
        assert_eq!(ctx.current_strategy().name(), "contains");

        ctx.set_strategy(StrategyKind::PriceRange.create());
        let args = StrategyArgs {
            max_price: Some(30.0),
            ..Default::default()
        };
        let outcome = ctx.execute(&catalog(), "", &args);
        assert!(outcome.success);
        assert_eq!(outcome.strategy_used, "price_range");
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.parameters, serde_json::json!({ "max_price": 30.0 }));
    }
}
