//! SQLite-backed catalog: products and stored recommendations.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::types::{
    CatalogError, CatalogResult, CategoryCount, CategoryTally, NewRecommendation, Product,
    ProductOrdering, ProductPatch, ProductQuery, Recommendation, RecommendationQuery,
    RecommendationStats,
};
use crate::validation::{validate_patch, ValidProduct};

/// Window for the "recent recommendations" statistic.
const RECENT_WINDOW_DAYS: i64 = 7;

/// How many of the latest recommendations feed the category tally.
const STATS_SAMPLE: u32 = 100;

/// Categories reported in the statistics.
const TOP_CATEGORIES: usize = 5;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price REAL NOT NULL DEFAULT 0,
    images TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
CREATE TABLE IF NOT EXISTS recommendations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    recommended_product TEXT NOT NULL,
    image_url TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_recommendations_created ON recommendations(created_at);
";

/// Product and recommendation tables behind one connection.
pub struct CatalogStore {
    db: Connection,
}

impl CatalogStore {
    /// Open or create a catalog database file.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!("Opening catalog database: {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Open a throwaway in-memory catalog.
    pub fn open_in_memory() -> CatalogResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> CatalogResult<Self> {
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    // ── Products ────────────────────────────────────────────────

    pub fn create_product(&self, product: &ValidProduct) -> CatalogResult<Product> {
        let images = serde_json::to_string(&product.images)?;
        self.db.execute(
            "INSERT INTO products (name, category, price, images) VALUES (?1, ?2, ?3, ?4)",
            params![product.name, product.category, product.price, images],
        )?;
        let id = self.db.last_insert_rowid();
        tracing::debug!(id, name = %product.name, "product created");
        self.get_product(id)
    }

    /// Create a product unless one with the same name already exists.
    pub fn create_unique_product(&self, product: &ValidProduct) -> CatalogResult<Product> {
        if self.product_exists_by_name(&product.name)? {
            return Err(CatalogError::DuplicateProduct(product.name.clone()));
        }
        self.create_product(product)
    }

    pub fn get_product(&self, id: i64) -> CatalogResult<Product> {
        self.db
            .query_row(
                "SELECT id, name, category, price, images FROM products WHERE id = ?1",
                params![id],
                product_from_row,
            )
            .optional()?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    /// Overwrite every field of an existing product.
    pub fn update_product(&self, id: i64, product: &ValidProduct) -> CatalogResult<Product> {
        let images = serde_json::to_string(&product.images)?;
        let rows = self.db.execute(
            "UPDATE products SET name = ?1, category = ?2, price = ?3, images = ?4 WHERE id = ?5",
            params![product.name, product.category, product.price, images, id],
        )?;
        if rows == 0 {
            return Err(CatalogError::ProductNotFound(id));
        }
        self.get_product(id)
    }

    /// Validate and apply only the fields present in `patch`.
    pub fn patch_product(&self, id: i64, patch: ProductPatch) -> CatalogResult<Product> {
        let current = self.get_product(id)?;
        let merged = validate_patch(&current, patch)?;
        self.update_product(id, &merged)
    }

    pub fn delete_product(&self, id: i64) -> CatalogResult<()> {
        let rows = self
            .db
            .execute("DELETE FROM products WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(CatalogError::ProductNotFound(id));
        }
        tracing::debug!(id, "product deleted");
        Ok(())
    }

    pub fn product_exists_by_name(&self, name: &str) -> CatalogResult<bool> {
        let found: Option<i64> = self
            .db
            .query_row(
                "SELECT id FROM products WHERE name = ?1 LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Every product, in insertion order.
    pub fn all_products(&self) -> CatalogResult<Vec<Product>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, name, category, price, images FROM products ORDER BY id")?;
        let rows = stmt.query_map([], product_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_products(&self) -> CatalogResult<u64> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Filtered and ordered product listing.
    pub fn list_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut products: Vec<Product> = self
            .all_products()?
            .into_iter()
            .filter(|p| match &needle {
                Some(n) => p.name.to_lowercase().contains(n) || p.category.to_lowercase().contains(n),
                None => true,
            })
            .filter(|p| query.category.as_ref().map_or(true, |c| &p.category == c))
            .filter(|p| query.price.map_or(true, |price| same_cents(p.price, price)))
            .collect();

        products.sort_by(|a, b| {
            let primary = match query.ordering {
                ProductOrdering::Name => a.name.cmp(&b.name),
                ProductOrdering::Category => a.category.cmp(&b.category),
                ProductOrdering::Price => a.price.total_cmp(&b.price),
            };
            let primary = if query.descending {
                primary.reverse()
            } else {
                primary
            };
            primary.then(a.id.cmp(&b.id))
        });

        Ok(products)
    }

    /// Distinct categories with product counts, ordered by name.
    pub fn categories(&self) -> CatalogResult<Vec<CategoryCount>> {
        let mut stmt = self.db.prepare(
            "SELECT category, COUNT(id) FROM products GROUP BY category ORDER BY category",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(CategoryCount {
                name: row.get(0)?,
                count: count as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Recommendations ─────────────────────────────────────────

    pub fn insert_recommendation(&self, rec: &NewRecommendation) -> CatalogResult<Recommendation> {
        self.insert_recommendation_at(rec, Utc::now())
    }

    /// Insert with an explicit creation time.
    pub fn insert_recommendation_at(
        &self,
        rec: &NewRecommendation,
        created_at: DateTime<Utc>,
    ) -> CatalogResult<Recommendation> {
        self.db.execute(
            "INSERT INTO recommendations (description, recommended_product, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![rec.description, rec.recommended_product, rec.image_url, created_at],
        )?;
        let id = self.db.last_insert_rowid();
        tracing::debug!(id, "recommendation stored");
        self.get_recommendation(id)
    }

    pub fn get_recommendation(&self, id: i64) -> CatalogResult<Recommendation> {
        self.db
            .query_row(
                "SELECT id, description, recommended_product, image_url, created_at
                 FROM recommendations WHERE id = ?1",
                params![id],
                recommendation_from_row,
            )
            .optional()?
            .ok_or(CatalogError::RecommendationNotFound(id))
    }

    pub fn list_recommendations(
        &self,
        query: &RecommendationQuery,
    ) -> CatalogResult<Vec<Recommendation>> {
        let sql = if query.oldest_first {
            "SELECT id, description, recommended_product, image_url, created_at
             FROM recommendations ORDER BY created_at ASC, id ASC"
        } else {
            "SELECT id, description, recommended_product, image_url, created_at
             FROM recommendations ORDER BY created_at DESC, id DESC"
        };
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt.query_map([], recommendation_from_row)?;
        let all = rows.collect::<Result<Vec<_>, _>>()?;

        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Ok(match needle {
            Some(n) => all
                .into_iter()
                .filter(|r| {
                    r.description.to_lowercase().contains(&n)
                        || r.recommended_product.to_lowercase().contains(&n)
                })
                .collect(),
            None => all,
        })
    }

    /// Totals, recent activity, and the categories recommendations map onto.
    pub fn recommendation_stats(&self, now: DateTime<Utc>) -> CatalogResult<RecommendationStats> {
        let total: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM recommendations", [], |row| row.get(0))?;

        let since = now - Duration::days(RECENT_WINDOW_DAYS);
        let recent: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM recommendations WHERE created_at >= ?1",
            params![since],
            |row| row.get(0),
        )?;

        let mut stmt = self.db.prepare(
            "SELECT recommended_product FROM recommendations
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let names = stmt
            .query_map(params![STATS_SAMPLE], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let products = self.all_products()?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for recommended in &names {
            let name = product_name_part(recommended).to_lowercase();
            if name.is_empty() {
                continue;
            }
            for p in products.iter().filter(|p| p.name.to_lowercase().contains(&name)) {
                *counts.entry(p.category.clone()).or_default() += 1;
            }
        }

        let mut top: Vec<CategoryTally> = counts
            .into_iter()
            .map(|(category, count)| CategoryTally { category, count })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        top.truncate(TOP_CATEGORIES);

        Ok(RecommendationStats {
            total_recommendations: total as u64,
            recent_recommendations: recent as u64,
            top_categories: top,
            period_analyzed: format!("{RECENT_WINDOW_DAYS} days"),
        })
    }
}

/// Text before the first `:` of a recommendation, trimmed.
pub fn product_name_part(recommendation: &str) -> &str {
    recommendation
        .split(':')
        .next()
        .unwrap_or(recommendation)
        .trim()
}

fn same_cents(a: f64, b: f64) -> bool {
    (a * 100.0).round() == (b * 100.0).round()
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let images: String = row.get(4)?;
    let images = serde_json::from_str(&images).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price: row.get(3)?,
        images,
    })
}

fn recommendation_from_row(row: &Row<'_>) -> rusqlite::Result<Recommendation> {
    Ok(Recommendation {
        id: row.get(0)?,
        description: row.get(1)?,
        recommended_product: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}
