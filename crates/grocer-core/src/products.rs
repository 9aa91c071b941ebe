use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::price::parse_price;
use crate::stores::Store;

/// A grocery listing from one retailer's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog id. Unique across stores, but a product only ever belongs to one.
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    /// Free-text pack size as listed by the retailer, e.g. `"500g"` or `"2 L"`.
    pub size: Option<String>,
    pub category: String,
    pub store: Store,
    /// Price exactly as scraped, e.g. `"$4.50 each"`.
    pub price: String,
    /// Derived from [`Product::price`]; see [`Product::reprice`].
    pub price_numeric: Option<Decimal>,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub last_scraped: Option<DateTime<Utc>>,
}

impl Product {
    /// Re-derives `price_numeric` from the raw price string.
    ///
    /// The raw string is the source of truth; any stored numeric value is a
    /// cache of this derivation.
    pub fn reprice(&mut self) {
        self.price_numeric = parse_price(&self.price);
    }

    /// Returns a copy with `price_numeric` re-derived.
    #[must_use]
    pub fn repriced(mut self) -> Self {
        self.reprice();
        self
    }

    /// Size with case and whitespace normalized, `None` when blank.
    #[must_use]
    pub fn normalized_size(&self) -> Option<String> {
        self.size.as_deref().and_then(normalize_attribute)
    }

    /// Brand with case and whitespace normalized, `None` when blank.
    #[must_use]
    pub fn normalized_brand(&self) -> Option<String> {
        self.brand.as_deref().and_then(normalize_attribute)
    }

    /// Text sent to the encoder when looking for this product elsewhere.
    ///
    /// Brand is prepended unless the name already carries it; size is appended
    /// so pack-size variants embed apart from each other.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(brand) = self.brand.as_deref().map(str::trim) {
            if !brand.is_empty() && !self.name.to_lowercase().contains(&brand.to_lowercase()) {
                parts.push(brand);
            }
        }
        parts.push(self.name.trim());
        if let Some(size) = self.size.as_deref().map(str::trim) {
            if !size.is_empty() {
                parts.push(size);
            }
        }
        parts.join(" ")
    }

    /// Price of `quantity` units, when the price could be parsed and the
    /// product fits in a [`Decimal`].
    #[must_use]
    pub fn line_price(&self, quantity: u32) -> Option<Decimal> {
        self.price_numeric?.checked_mul(Decimal::from(quantity))
    }
}

/// Normalizes a size or brand string for equality comparison.
///
/// Lower-cases and drops all whitespace, so `"500 g"`, `"500G"` and `"500g"`
/// compare equal. Blank input normalizes to `None`.
#[must_use]
pub fn normalize_attribute(raw: &str) -> Option<String> {
    let normalized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
