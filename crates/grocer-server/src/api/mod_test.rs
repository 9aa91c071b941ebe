use super::cart::{validate_quantity, validate_session_id};
use super::products::parse_sort;
use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use grocer_core::Tuning;
use grocer_db::ProductSort;
use grocer_matching::{MatchEngine, QdrantIndex, TeiEncoder};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

/// Collaborators that refuse connections, so every lookup degrades.
fn engine_for(pool: PgPool) -> Arc<HybridEngine<PgCatalog>> {
    let encoder = TeiEncoder::new("http://127.0.0.1:9", 1, false).expect("encoder");
    let index = QdrantIndex::new("http://127.0.0.1:9", "test", None, 1).expect("index");
    Arc::new(MatchEngine::new(
        &Tuning::default(),
        encoder,
        index,
        PgCatalog::new(pool),
    ))
}

fn app_for(pool: PgPool) -> Router {
    let engine = engine_for(pool.clone());
    build_app(AppState { pool, engine }, &[])
}

/// An app whose pool never connects; only usable for requests rejected
/// before touching the database.
fn offline_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://grocer@127.0.0.1:1/unused")
        .expect("lazy pool");
    app_for(pool)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[test]
fn pagination_applies_defaults_and_bounds() {
    assert_eq!(
        parse_pagination("r", None, None).expect("defaults"),
        Pagination {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT
        }
    );
    assert_eq!(
        parse_pagination("r", Some(3), Some(100)).expect("max limit"),
        Pagination { page: 3, limit: 100 }
    );
    assert!(parse_pagination("r", Some(0), None).is_err());
    assert!(parse_pagination("r", None, Some(0)).is_err());
    assert!(parse_pagination("r", None, Some(101)).is_err());
    assert!(parse_pagination("r", Some(-2), None).is_err());
}

#[test]
fn store_parameter_is_optional_and_validated() {
    assert_eq!(parse_store("r", None).expect("absent"), None);
    assert_eq!(parse_store("r", Some("  ")).expect("blank"), None);
    assert_eq!(
        parse_store("r", Some("coles")).expect("known"),
        Some(Store::Coles)
    );
    let err = parse_store("r", Some("aldi")).unwrap_err();
    assert_eq!(err.error.code, "validation_error");
}

#[test]
fn sort_parameter_accepts_known_orders() {
    assert_eq!(parse_sort("r", None).expect("default"), ProductSort::Name);
    assert_eq!(parse_sort("r", Some("name")).expect("name"), ProductSort::Name);
    assert_eq!(
        parse_sort("r", Some("price_low")).expect("low"),
        ProductSort::PriceLow
    );
    assert_eq!(
        parse_sort("r", Some("price_high")).expect("high"),
        ProductSort::PriceHigh
    );
    assert!(parse_sort("r", Some("cheapest")).is_err());
}

#[test]
fn cart_inputs_are_validated() {
    assert!(validate_session_id("r", "abc-123").is_ok());
    assert!(validate_session_id("r", "   ").is_err());
    assert!(validate_session_id("r", &"x".repeat(129)).is_err());

    assert_eq!(validate_quantity("r", 2).expect("valid"), 2);
    assert!(validate_quantity("r", 0).is_err());
    assert!(validate_quantity("r", 1_000).is_err());
}

#[test]
fn api_error_codes_map_to_statuses() {
    for (code, status) in [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ] {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn unknown_product_maps_to_not_found() {
    let err = map_match_error("r".to_string(), &MatchError::UnknownProduct(7));
    assert_eq!(err.error.code, "not_found");
    assert_eq!(err.error.message, "product 7 not found");

    let err = map_db_error("r".to_string(), &DbError::NotFound);
    assert_eq!(err.error.code, "not_found");
}

#[tokio::test]
async fn invalid_limit_is_rejected_with_envelope() {
    let (status, json) = send(offline_app(), get("/api/v1/products?limit=500")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn invalid_sort_is_rejected() {
    let (status, json) = send(offline_app(), get("/api/v1/products?sort=random")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn invalid_store_filter_is_rejected() {
    let (status, _) = send(offline_app(), get("/api/v1/categories?store=aldi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let body = serde_json::json!({ "session_id": "s1", "product_id": 1, "quantity": 0 });
    let (status, json) = send(offline_app(), post_json("/api/v1/cart/items", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

// -------------------------------------------------------------------------
// Routes against a live database
// -------------------------------------------------------------------------

async fn seed_product(pool: &PgPool, name: &str, store: &str, price: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (name, brand, size, category, store, price) \
         VALUES ($1, 'Pauls', '2L', 'Dairy', $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(store)
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("seed product")
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn health_reports_database_ok(pool: PgPool) {
    let (status, json) = send(app_for(pool), get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn search_falls_back_to_catalog_when_index_is_down(pool: PgPool) {
    seed_product(&pool, "Full Cream Milk", "Coles", "$3.10").await;
    seed_product(&pool, "Sourdough Bread", "IGA", "$5.00").await;

    let (status, json) = send(app_for(pool), get("/api/v1/products?search=milk")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["source"], "catalog");
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["products"][0]["name"], "Full Cream Milk");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn unknown_product_returns_404(pool: PgPool) {
    let app = app_for(pool);
    let (status, json) = send(app.clone(), get("/api/v1/products/424242")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let (status, _) = send(app, get("/api/v1/products/424242/alternatives")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn cart_round_trip_and_compare(pool: PgPool) {
    let milk = seed_product(&pool, "Full Cream Milk", "Coles", "$3.10").await;
    let app = app_for(pool);

    let body = serde_json::json!({ "session_id": "s1", "product_id": milk, "quantity": 2 });
    let (status, json) = send(app.clone(), post_json("/api/v1/cart/items", &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["quantity"], 2);

    let (status, json) = send(app.clone(), get("/api/v1/cart/s1")).await;
    assert_eq!(status, StatusCode::OK);
    let items = json["data"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["line_total"], "6.20");
    assert!(items[0]["alternatives"].as_array().expect("alternatives").is_empty());

    let (status, json) = send(app.clone(), get("/api/v1/cart/s1/compare")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["best_deal"]["total"], "6.20");
    assert_eq!(json["data"]["stores"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["data"]["best_single_store"]["stores"][0], "Coles");

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/v1/cart/s1/items/{milk}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(app.clone(), delete).await;
    assert_eq!(status, StatusCode::OK);

    let missing = serde_json::json!({ "session_id": "s1", "product_id": -1 });
    let (status, _) = send(app, post_json("/api/v1/cart/items", &missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
