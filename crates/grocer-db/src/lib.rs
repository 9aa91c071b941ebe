//! Postgres persistence for the grocery catalog and session carts.

use thiserror::Error;

pub mod carts;
pub mod catalog;
pub mod pool;
pub mod products;

pub use carts::{
    add_cart_item, get_cart, get_or_create_cart, list_cart_items, remove_cart_item, CartItemRow,
    CartRow,
};
pub use catalog::PgCatalog;
pub use pool::{connect_pool, connect_pool_from_config, health_check, run_migrations, PoolConfig};
pub use products::{
    find_product, insert_product, list_brands, list_categories, list_products,
    list_products_by_ids, list_stores, CategoryCount, NewProduct, ProductFilters, ProductRow,
    ProductSort,
};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    /// A stored row that cannot be turned into a domain value.
    #[error("invalid row in {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_row_names_the_table() {
        let err = DbError::InvalidRow {
            table: "products",
            reason: "unknown store 'Aldi'".to_string(),
        };
        assert_eq!(err.to_string(), "invalid row in products: unknown store 'Aldi'");
    }
}
