use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use grocer_core::Product;
use grocer_db::{ProductFilters, ProductSort};
use grocer_matching::{Match, PriceSort, ProductPage, SearchOutcome, SearchRequest};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, map_match_error, non_blank, parse_pagination, parse_store, ApiError,
    ApiResponse, AppState, Pagination,
};

/// Which backend produced a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum ListingSource {
    Semantic,
    Catalog,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductList {
    pub products: Vec<Product>,
    pub total: usize,
    pub page: u32,
    pub pages: usize,
    pub limit: u32,
    pub source: ListingSource,
}

impl ProductList {
    fn semantic(page: ProductPage) -> Self {
        Self {
            products: page.products,
            total: page.total,
            page: page.page,
            pages: page.pages,
            limit: page.limit,
            source: ListingSource::Semantic,
        }
    }

    fn catalog(products: Vec<Product>, total: i64, pagination: Pagination) -> Self {
        let total = usize::try_from(total).unwrap_or(0);
        Self {
            products,
            total,
            page: pagination.page,
            pages: total.div_ceil(pagination.limit.max(1) as usize),
            limit: pagination.limit,
            source: ListingSource::Catalog,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub search: Option<String>,
    pub store: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub(super) fn parse_sort(request_id: &str, raw: Option<&str>) -> Result<ProductSort, ApiError> {
    match non_blank(raw) {
        None | Some("name") => Ok(ProductSort::Name),
        Some("price_low") => Ok(ProductSort::PriceLow),
        Some("price_high") => Ok(ProductSort::PriceHigh),
        Some(other) => Err(ApiError::validation(
            request_id,
            format!("invalid sort '{other}'; expected name, price_low or price_high"),
        )),
    }
}

/// Semantic results are relevance-ordered unless a price order is asked for.
fn semantic_sort(sort: ProductSort) -> PriceSort {
    match sort {
        ProductSort::Name => PriceSort::Relevance,
        ProductSort::PriceLow => PriceSort::PriceLow,
        ProductSort::PriceHigh => PriceSort::PriceHigh,
    }
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<ProductList>>, ApiError> {
    let rid = req_id.0;
    let pagination = parse_pagination(&rid, query.page, query.limit)?;
    let store = parse_store(&rid, query.store.as_deref())?;
    let sort = parse_sort(&rid, query.sort.as_deref())?;
    let category = non_blank(query.category.as_deref());
    let brand = non_blank(query.brand.as_deref());
    let search = non_blank(query.search.as_deref());

    if let Some(text) = search {
        let request = SearchRequest {
            query: text.to_owned(),
            store,
            category: category.map(str::to_owned),
            brand: brand.map(str::to_owned),
            sort: semantic_sort(sort),
            page: pagination.page,
            limit: pagination.limit,
        };
        match state
            .engine
            .search(&request)
            .await
            .map_err(|e| map_match_error(rid.clone(), &e))?
        {
            SearchOutcome::Ranked(page) => {
                return Ok(Json(ApiResponse::new(ProductList::semantic(page), rid)));
            }
            SearchOutcome::IndexUnavailable => {
                tracing::info!(query = text, "falling back to catalog text search");
            }
        }
    }

    let (products, total) = grocer_db::list_products(
        &state.pool,
        &ProductFilters {
            store,
            category,
            brand,
            search,
            sort,
            page: pagination.page,
            limit: pagination.limit,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        ProductList::catalog(products, total, pagination),
        rid,
    )))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = grocer_db::find_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "not_found", format!("product {id} not found"))
        })?;

    Ok(Json(ApiResponse::new(product, req_id.0)))
}

pub(super) async fn list_alternatives(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Match>>>, ApiError> {
    let matches = state
        .engine
        .alternatives(id)
        .await
        .map_err(|e| map_match_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(matches, req_id.0)))
}
