//! Facet listings for filter dropdowns.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use grocer_db::CategoryCount;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, non_blank, parse_store, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct FacetQuery {
    pub store: Option<String>,
    pub category: Option<String>,
}

pub(super) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let stores = grocer_db::list_stores(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(stores, req_id.0)))
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FacetQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryCount>>>, ApiError> {
    let store = parse_store(&req_id.0, query.store.as_deref())?;
    let categories = grocer_db::list_categories(&state.pool, store)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(categories, req_id.0)))
}

pub(super) async fn list_brands(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FacetQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let store = parse_store(&req_id.0, query.store.as_deref())?;
    let brands = grocer_db::list_brands(&state.pool, store, non_blank(query.category.as_deref()))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(brands, req_id.0)))
}
