//! Database operations for session carts (`carts`, `cart_items`).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartRow {
    pub id: i64,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns the cart for `session_id`, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cart(pool: &PgPool, session_id: &str) -> Result<Option<CartRow>, DbError> {
    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id, session_id, created_at, updated_at FROM carts WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns the cart for `session_id`, creating it on first use.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn get_or_create_cart(pool: &PgPool, session_id: &str) -> Result<CartRow, DbError> {
    // The no-op update makes RETURNING yield the existing row on conflict.
    let row = sqlx::query_as::<_, CartRow>(
        "INSERT INTO carts (session_id) VALUES ($1) \
         ON CONFLICT (session_id) DO UPDATE SET session_id = EXCLUDED.session_id \
         RETURNING id, session_id, created_at, updated_at",
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Adds `quantity` of a product to the session's cart.
///
/// Adding a product already in the cart increments its quantity. The cart
/// is created if needed.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn add_cart_item(
    pool: &PgPool,
    session_id: &str,
    product_id: i64,
    quantity: i32,
) -> Result<CartItemRow, DbError> {
    let exists: bool =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(DbError::NotFound);
    }

    let cart = get_or_create_cart(pool, session_id).await?;

    let row = sqlx::query_as::<_, CartItemRow>(
        "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET \
             quantity   = cart_items.quantity + EXCLUDED.quantity, \
             updated_at = NOW() \
         RETURNING id, cart_id, product_id, quantity, created_at, updated_at",
    )
    .bind(cart.id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        session_id,
        product_id,
        quantity = row.quantity,
        "cart item upserted"
    );
    Ok(row)
}

/// Items in the session's cart, oldest first. A missing cart has no items.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cart_items(pool: &PgPool, session_id: &str) -> Result<Vec<CartItemRow>, DbError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        "SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, ci.created_at, ci.updated_at \
         FROM cart_items ci \
         JOIN carts c ON c.id = ci.cart_id \
         WHERE c.session_id = $1 \
         ORDER BY ci.created_at, ci.id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Removes a product from the session's cart and returns the deleted item.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the cart or the item does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn remove_cart_item(
    pool: &PgPool,
    session_id: &str,
    product_id: i64,
) -> Result<CartItemRow, DbError> {
    let row = sqlx::query_as::<_, CartItemRow>(
        "DELETE FROM cart_items ci \
         USING carts c \
         WHERE c.id = ci.cart_id AND c.session_id = $1 AND ci.product_id = $2 \
         RETURNING ci.id, ci.cart_id, ci.product_id, ci.quantity, ci.created_at, ci.updated_at",
    )
    .bind(session_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}
