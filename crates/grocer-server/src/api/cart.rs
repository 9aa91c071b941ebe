use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use grocer_core::Product;
use grocer_db::CartItemRow;
use grocer_matching::{BasketComparison, CartLine, Match};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const MAX_SESSION_ID_LEN: usize = 128;
const MAX_QUANTITY: i64 = 999;

#[derive(Debug, Deserialize)]
pub(super) struct AddItemRequest {
    pub session_id: String,
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub(super) struct CartItemData {
    pub cart_item_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

impl From<CartItemRow> for CartItemData {
    fn from(row: CartItemRow) -> Self {
        Self {
            cart_item_id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CartItemView {
    pub cart_item_id: i64,
    pub quantity: u32,
    pub product: Product,
    pub line_total: Option<Decimal>,
    pub alternatives: Vec<Match>,
}

pub(super) fn validate_session_id(request_id: &str, session_id: &str) -> Result<(), ApiError> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_SESSION_ID_LEN {
        return Err(ApiError::validation(
            request_id,
            format!("session_id must be 1-{MAX_SESSION_ID_LEN} characters"),
        ));
    }
    Ok(())
}

pub(super) fn validate_quantity(request_id: &str, quantity: i64) -> Result<i32, ApiError> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(ApiError::validation(
            request_id,
            format!("quantity must be between 1 and {MAX_QUANTITY}"),
        ));
    }
    i32::try_from(quantity).map_err(|_| ApiError::validation(request_id, "quantity out of range"))
}

/// Loads the session's cart as priced lines, in the order items were added.
/// Items whose product has since left the catalog are skipped.
async fn load_cart(
    state: &AppState,
    request_id: &str,
    session_id: &str,
) -> Result<Vec<(CartItemRow, CartLine)>, ApiError> {
    let items = grocer_db::list_cart_items(&state.pool, session_id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let mut products: HashMap<i64, Product> = grocer_db::list_products_by_ids(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let product = products.remove(&item.product_id)?;
            let quantity = u32::try_from(item.quantity).unwrap_or(1);
            Some((item, CartLine::new(product, quantity)))
        })
        .collect())
}

pub(super) async fn add_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CartItemData>>), ApiError> {
    let rid = req_id.0;
    validate_session_id(&rid, &body.session_id)?;
    let quantity = validate_quantity(&rid, body.quantity)?;

    let row = grocer_db::add_cart_item(&state.pool, &body.session_id, body.product_id, quantity)
        .await
        .map_err(|e| match e {
            grocer_db::DbError::NotFound => ApiError::new(
                rid.clone(),
                "not_found",
                format!("product {} not found", body.product_id),
            ),
            other => map_db_error(rid.clone(), &other),
        })?;

    tracing::info!(
        product_id = row.product_id,
        quantity = row.quantity,
        "cart item added"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CartItemData::from(row), rid)),
    ))
}

pub(super) async fn get_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CartItemView>>>, ApiError> {
    let rid = req_id.0;
    validate_session_id(&rid, &session_id)?;

    let lines = load_cart(&state, &rid, &session_id).await?;
    let products: Vec<Product> = lines.iter().map(|(_, l)| l.product.clone()).collect();
    let alternatives = state.engine.alternatives_for_many(&products).await;

    let data = lines
        .into_iter()
        .zip(alternatives)
        .map(|((item, line), alternatives)| CartItemView {
            cart_item_id: item.id,
            quantity: line.quantity,
            line_total: line.product.line_price(line.quantity),
            product: line.product,
            alternatives,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, rid)))
}

pub(super) async fn remove_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((session_id, product_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<CartItemData>>, ApiError> {
    let rid = req_id.0;
    validate_session_id(&rid, &session_id)?;

    let row = grocer_db::remove_cart_item(&state.pool, &session_id, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(CartItemData::from(row), rid)))
}

pub(super) async fn compare_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<BasketComparison>>, ApiError> {
    let rid = req_id.0;
    validate_session_id(&rid, &session_id)?;

    let lines: Vec<CartLine> = load_cart(&state, &rid, &session_id)
        .await?
        .into_iter()
        .map(|(_, line)| line)
        .collect();
    let comparison = state.engine.compare_cart(&lines).await;

    Ok(Json(ApiResponse::new(comparison, rid)))
}
