//! Input validation and normalization for products and API requests.

use crate::types::{CatalogError, CatalogResult, NewProduct, Product, ProductPatch};

/// Upper bound for a product price.
pub const MAX_PRICE: f64 = 999_999.99;

/// Maximum number of image URLs per product.
pub const MAX_IMAGES: usize = 10;

const MIN_NAME_CHARS: usize = 2;
const DEFAULT_CATEGORY: &str = "General";

/// A product that passed validation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidProduct {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub images: Vec<String>,
}

/// Format a price as `$1,234.56`.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() || price == 0.0 {
        return "$0.00".to_string();
    }

    let cents = (price.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}

/// Capitalize the first letter of every word and lowercase the rest.
/// Any non-letter character starts a new word.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

pub fn validate_name(name: &str) -> CatalogResult<String> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_NAME_CHARS {
        return Err(CatalogError::validation(
            "name",
            "Product name must be at least 2 characters long.",
        ));
    }
    if trimmed.chars().all(|c| c.is_numeric()) {
        return Err(CatalogError::validation(
            "name",
            "Product name cannot consist only of digits.",
        ));
    }
    Ok(title_case(trimmed))
}

pub fn validate_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => title_case(c),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

pub fn validate_price(price: f64) -> CatalogResult<f64> {
    if !price.is_finite() {
        return Err(CatalogError::validation("price", "Price must be a number."));
    }
    if price < 0.0 {
        return Err(CatalogError::validation("price", "Price cannot be negative."));
    }
    if price > MAX_PRICE {
        return Err(CatalogError::validation(
            "price",
            "Price cannot exceed $999,999.99.",
        ));
    }
    Ok((price * 100.0).round() / 100.0)
}

pub fn validate_images(images: Vec<String>) -> CatalogResult<Vec<String>> {
    if images.len() > MAX_IMAGES {
        return Err(CatalogError::validation(
            "images",
            "A product cannot have more than 10 images.",
        ));
    }
    Ok(images)
}

/// Validate a create/replace payload.
pub fn validate_new_product(input: NewProduct) -> CatalogResult<ValidProduct> {
    Ok(ValidProduct {
        name: validate_name(&input.name)?,
        category: validate_category(input.category.as_deref()),
        price: validate_price(input.price)?,
        images: validate_images(input.images.unwrap_or_default())?,
    })
}

/// Apply a partial update on top of an existing product, validating only
/// the fields that are present.
pub fn validate_patch(current: &Product, patch: ProductPatch) -> CatalogResult<ValidProduct> {
    let name = match patch.name {
        Some(n) => validate_name(&n)?,
        None => current.name.clone(),
    };
    let category = match patch.category {
        Some(c) => validate_category(Some(&c)),
        None => current.category.clone(),
    };
    let price = match patch.price {
        Some(p) => validate_price(p)?,
        None => current.price,
    };
    let images = match patch.images {
        Some(i) => validate_images(i)?,
        None => current.images.clone(),
    };
    Ok(ValidProduct {
        name,
        category,
        price,
        images,
    })
}

/// Check that a text field does not exceed `max` characters.
pub fn check_max_chars(field: &str, value: &str, max: usize) -> CatalogResult<()> {
    if value.chars().count() > max {
        return Err(CatalogError::validation(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(())
}

/// Validate optional price bounds for a search.
pub fn check_price_bounds(min: Option<f64>, max: Option<f64>) -> CatalogResult<()> {
    for (field, value) in [("min_price", min), ("max_price", max)] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(CatalogError::validation(
                    field,
                    "Ensure this value is greater than or equal to 0.",
                ));
            }
        }
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(CatalogError::validation(
                "non_field_errors",
                "Minimum price cannot be greater than maximum price.",
            ));
        }
    }
    Ok(())
}
