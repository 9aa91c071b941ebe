use std::future::Future;

use crate::products::Product;

/// Read access to the product catalog owned by the relational store.
///
/// Implemented by `grocer-db` against Postgres; the matching engine only
/// ever needs these two key lookups.
pub trait ProductCatalog: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the product with `id`, or `None` when it does not exist.
    fn get_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send;

    /// Returns every product whose id is in `ids`. Order is not guaranteed and
    /// unknown ids are silently absent from the result.
    fn list_by_ids(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send;
}
