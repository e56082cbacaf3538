//! Strategy selection for incoming search requests.

use serde::{Deserialize, Serialize};

use crate::strategy::{SearchContext, SearchOutcome, StrategyArgs, StrategyKind};
use crate::types::{CatalogResult, Product};
use crate::validation::{check_max_chars, check_price_bounds};

const MAX_QUERY_CHARS: usize = 255;
const MAX_CATEGORY_CHARS: usize = 100;

/// Parameters accepted by the search endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub search_type: Option<StrategyKind>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    /// A price parameter was supplied, even if it did not parse.
    #[serde(skip)]
    pub price_requested: bool,
}

impl SearchRequest {
    /// Trim text fields and check lengths and price bounds.
    pub fn validate(mut self) -> CatalogResult<Self> {
        self.q = self.q.trim().to_string();
        self.category = self.category.trim().to_string();
        check_max_chars("q", &self.q, MAX_QUERY_CHARS)?;
        check_max_chars("category", &self.category, MAX_CATEGORY_CHARS)?;
        check_price_bounds(self.min_price, self.max_price)?;
        Ok(self)
    }

    /// Build a request from loosely typed query-string values.
    ///
    /// Unknown search types fall back to `contains`. A price that does not
    /// parse leaves its bound unset but still selects the price strategy.
    pub fn from_lenient(
        q: Option<&str>,
        category: Option<&str>,
        search_type: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
    ) -> Self {
        let parse_price = |raw: Option<&str>| {
            raw.map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        Self {
            q: q.unwrap_or("").trim().to_string(),
            category: category.unwrap_or("").trim().to_string(),
            search_type: Some(
                search_type
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or_default(),
            ),
            min_price: parse_price(min_price),
            max_price: parse_price(max_price),
            price_requested: [min_price, max_price]
                .into_iter()
                .any(|raw| raw.is_some_and(|s| !s.is_empty())),
        }
    }
}

/// Pick a strategy for the request and run it over `products`.
///
/// Price bounds win over everything else (with the text query applied as
/// an extra name filter), then a category, then the requested type.
pub fn run_search(products: &[Product], request: &SearchRequest) -> SearchOutcome {
    let mut context = SearchContext::default();

    if request.price_requested || request.min_price.is_some() || request.max_price.is_some() {
        context.set_strategy(StrategyKind::PriceRange.create());
        let args = StrategyArgs {
            min_price: request.min_price,
            max_price: request.max_price,
            category: None,
        };
        let outcome = context.execute(products, &request.q, &args);
        if request.q.is_empty() {
            return outcome;
        }
        let needle = request.q.to_lowercase();
        let narrowed = outcome
            .results
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        return outcome.with_results(narrowed);
    }

    if !request.category.is_empty() {
        context.set_strategy(StrategyKind::Category.create());
        let args = StrategyArgs {
            category: Some(request.category.clone()),
            ..Default::default()
        };
        return context.execute(products, &request.q, &args);
    }

    let kind = request.search_type.unwrap_or_default();
    context.set_strategy(kind.create());
    context.execute(products, &request.q, &StrategyArgs::default())
}
