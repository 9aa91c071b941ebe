use grocer_core::{Product, ProductCatalog};
use sqlx::PgPool;

use crate::products::{find_product, list_products_by_ids};
use crate::DbError;

/// [`ProductCatalog`] backed by the `products` table.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ProductCatalog for PgCatalog {
    type Error = DbError;

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>, DbError> {
        find_product(&self.pool, id).await
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, DbError> {
        list_products_by_ids(&self.pool, ids).await
    }
}
