//! Bulk product import from files.

use std::path::{Path, PathBuf};

use crate::types::{CatalogError, CatalogResult, NewProduct};

/// Source of product records for a bulk import.
pub trait ProductLoader {
    fn load(&self) -> CatalogResult<Vec<NewProduct>>;
}

/// Reads a JSON array of products from disk.
#[derive(Debug, Clone)]
pub struct JsonProductLoader {
    path: PathBuf,
}

impl JsonProductLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProductLoader for JsonProductLoader {
    fn load(&self) -> CatalogResult<Vec<NewProduct>> {
        let data = std::fs::read(&self.path)?;
        let records: Vec<NewProduct> = serde_json::from_slice(&data).map_err(|e| {
            CatalogError::validation("file", format!("{}: {e}", self.path.display()))
        })?;
        tracing::debug!(count = records.len(), path = %self.path.display(), "loaded products");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "notebook", "category": "stationery", "price": 3.5},
                {"name": "Laptop", "price": 899.99, "images": ["a.png"]}
            ]"#,
        )
        .unwrap();

        let records = JsonProductLoader::new(&path).load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category.as_deref(), Some("stationery"));
        assert_eq!(records[1].category, None);
        assert_eq!(records[1].images.as_deref(), Some(&["a.png".to_string()][..]));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = JsonProductLoader::new(dir.path().join("nope.json"));
        assert!(matches!(missing.load(), Err(CatalogError::Io(_))));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"name\": \"not an array\"}").unwrap();
        let err = JsonProductLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "file"));
    }
}
