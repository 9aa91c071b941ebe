//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use grocer_core::{parse_price, Product, Store};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, name, brand, size, category, store, price, price_numeric, \
                               product_url, image_url, last_scraped, created_at, updated_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: String,
    pub store: String,
    pub price: String,
    /// Cached for sorting only; re-derived from `price` on conversion.
    pub price_numeric: Option<Decimal>,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub last_scraped: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let store = row.store.parse::<Store>().map_err(|e| DbError::InvalidRow {
            table: "products",
            reason: format!("product {}: {e}", row.id),
        })?;

        Ok(Product {
            id: row.id,
            name: row.name,
            brand: row.brand,
            size: row.size,
            category: row.category,
            store,
            price: row.price,
            price_numeric: None,
            product_url: row.product_url,
            image_url: row.image_url,
            last_scraped: row.last_scraped,
        }
        .repriced())
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, DbError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Fields needed to insert a product. `price_numeric` is derived, never given.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: String,
    pub store: Store,
    pub price: String,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
}

/// Ordering for catalog listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Name,
    PriceLow,
    PriceHigh,
}

impl ProductSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::Name => "LOWER(name) ASC, id ASC",
            Self::PriceLow => "price_numeric ASC NULLS LAST, id ASC",
            Self::PriceHigh => "price_numeric DESC NULLS LAST, id ASC",
        }
    }
}

/// Input filters for catalog listing.
///
/// `search` matches name or brand case-insensitively as a substring.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters<'a> {
    pub store: Option<Store>,
    pub category: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub search: Option<&'a str>,
    pub sort: ProductSort,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

/// Inserts a product, deriving `price_numeric` from `price`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_product(pool: &PgPool, product: &NewProduct) -> Result<Product, DbError> {
    let sql = format!(
        "INSERT INTO products \
             (name, brand, size, category, store, price, price_numeric, product_url, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.size)
        .bind(&product.category)
        .bind(product.store.as_str())
        .bind(&product.price)
        .bind(parse_price(&product.price))
        .bind(&product.product_url)
        .bind(&product.image_url)
        .fetch_one(pool)
        .await?;

    Product::try_from(row)
}

/// Returns the product with `id`, or `None` if absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if the stored store name is not recognised.
pub async fn find_product(pool: &PgPool, id: i64) -> Result<Option<Product>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Product::try_from).transpose()
}

/// Returns every product whose id is in `ids`. Order is not guaranteed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored store name is not recognised.
pub async fn list_products_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Product>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(ids)
        .fetch_all(pool)
        .await?;

    into_products(rows)
}

/// Filtered, sorted page of the catalog, plus the total matching count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails, or [`DbError::InvalidRow`]
/// if a stored store name is not recognised.
pub async fn list_products(
    pool: &PgPool,
    filters: &ProductFilters<'_>,
) -> Result<(Vec<Product>, i64), DbError> {
    const WHERE: &str = "WHERE ($1::TEXT IS NULL OR store = $1) \
                           AND ($2::TEXT IS NULL OR category = $2) \
                           AND ($3::TEXT IS NULL OR brand = $3) \
                           AND ($4::TEXT IS NULL \
                                OR name ILIKE '%' || $4 || '%' \
                                OR brand ILIKE '%' || $4 || '%')";

    let store = filters.store.map(Store::as_str);
    let search = filters
        .search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(escape_like);
    let limit = i64::from(filters.limit.max(1));
    let offset = i64::from(filters.page.max(1) - 1) * limit;

    let total: i64 = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM products {WHERE}"))
        .bind(store)
        .bind(filters.category)
        .bind(filters.brand)
        .bind(search.as_deref())
        .fetch_one(pool)
        .await?;

    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products {WHERE} ORDER BY {} LIMIT $5 OFFSET $6",
        filters.sort.order_by()
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(store)
        .bind(filters.category)
        .bind(filters.brand)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((into_products(rows)?, total))
}

/// Distinct store names present in the catalog.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stores(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let stores =
        sqlx::query_scalar::<_, String>("SELECT DISTINCT store FROM products ORDER BY store")
            .fetch_all(pool)
            .await?;
    Ok(stores)
}

/// Categories with product counts, optionally limited to one store.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(
    pool: &PgPool,
    store: Option<Store>,
) -> Result<Vec<CategoryCount>, DbError> {
    let rows = sqlx::query_as::<_, CategoryCount>(
        "SELECT category AS name, COUNT(*) AS count \
         FROM products \
         WHERE ($1::TEXT IS NULL OR store = $1) \
         GROUP BY category \
         ORDER BY category",
    )
    .bind(store.map(Store::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Distinct non-empty brands, optionally narrowed by store and category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands(
    pool: &PgPool,
    store: Option<Store>,
    category: Option<&str>,
) -> Result<Vec<String>, DbError> {
    let brands = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT brand FROM products \
         WHERE brand IS NOT NULL AND brand <> '' \
           AND ($1::TEXT IS NULL OR store = $1) \
           AND ($2::TEXT IS NULL OR category = $2) \
         ORDER BY brand",
    )
    .bind(store.map(Store::as_str))
    .bind(category)
    .fetch_all(pool)
    .await?;
    Ok(brands)
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("milk"), "milk");
    }

    #[test]
    fn sort_order_is_deterministic() {
        for sort in [ProductSort::Name, ProductSort::PriceLow, ProductSort::PriceHigh] {
            assert!(sort.order_by().ends_with("id ASC"));
        }
    }
}
