//! Live integration tests for grocer-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx
//! test harness, so they need `DATABASE_URL` pointing at a server the test
//! user can create databases on. Run with `cargo test -- --ignored`.

use grocer_core::{ProductCatalog, Store};
use grocer_db::{
    add_cart_item, get_cart, insert_product, list_brands, list_cart_items, list_categories,
    list_products, list_stores, remove_cart_item, DbError, NewProduct, PgCatalog,
    ProductFilters, ProductSort,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

fn new_product(name: &str, store: Store, brand: Option<&str>, price: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        brand: brand.map(str::to_string),
        size: Some("1L".to_string()),
        category: "Dairy".to_string(),
        store,
        price: price.to_string(),
        product_url: None,
        image_url: None,
    }
}

async fn seed(pool: &PgPool) -> Vec<i64> {
    let mut ids = Vec::new();
    for product in [
        new_product("Full Cream Milk", Store::Coles, Some("Dairy Farmers"), "$3.10"),
        new_product("Light Milk", Store::Woolworths, Some("Pauls"), "$2.90"),
        new_product("Oat Milk 100%", Store::Iga, Some("Oatly"), "N/A"),
    ] {
        let inserted = insert_product(pool, &product)
            .await
            .unwrap_or_else(|e| panic!("insert failed for {}: {e}", product.name));
        ids.push(inserted.id);
    }
    ids
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn catalog_lookups_round_trip(pool: PgPool) {
    let ids = seed(&pool).await;
    let catalog = PgCatalog::new(pool);

    let product = catalog
        .get_by_id(ids[0])
        .await
        .expect("query")
        .expect("product exists");
    assert_eq!(product.store, Store::Coles);
    assert_eq!(product.price_numeric, Some(Decimal::new(310, 2)));

    assert!(catalog.get_by_id(-1).await.expect("query").is_none());

    let mut found: Vec<i64> = catalog
        .list_by_ids(&[ids[2], ids[1], -5])
        .await
        .expect("query")
        .into_iter()
        .map(|p| p.id)
        .collect();
    found.sort_unstable();
    assert_eq!(found, vec![ids[1], ids[2]]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn list_products_filters_sorts_and_counts(pool: PgPool) {
    seed(&pool).await;

    let (page, total) = list_products(
        &pool,
        &ProductFilters {
            search: Some("milk"),
            sort: ProductSort::PriceLow,
            page: 1,
            limit: 2,
            ..ProductFilters::default()
        },
    )
    .await
    .expect("list");
    assert_eq!(total, 3);
    let names: Vec<&str> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Light Milk", "Full Cream Milk"]);

    // `%` is matched literally, not as a wildcard
    let (page, total) = list_products(
        &pool,
        &ProductFilters {
            search: Some("100%"),
            page: 1,
            limit: 10,
            ..ProductFilters::default()
        },
    )
    .await
    .expect("list");
    assert_eq!(total, 1);
    assert_eq!(page[0].store, Store::Iga);

    let (_, total) = list_products(
        &pool,
        &ProductFilters {
            store: Some(Store::Woolworths),
            brand: Some("Pauls"),
            page: 1,
            limit: 10,
            ..ProductFilters::default()
        },
    )
    .await
    .expect("list");
    assert_eq!(total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn facet_lists_reflect_catalog(pool: PgPool) {
    seed(&pool).await;

    assert_eq!(
        list_stores(&pool).await.expect("stores"),
        vec!["Coles", "IGA", "Woolworths"]
    );
    let categories = list_categories(&pool, Some(Store::Coles))
        .await
        .expect("categories");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].count, 1);
    assert_eq!(
        list_brands(&pool, None, Some("Dairy")).await.expect("brands"),
        vec!["Dairy Farmers", "Oatly", "Pauls"]
    );
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn cart_items_increment_and_remove(pool: PgPool) {
    let ids = seed(&pool).await;

    assert!(get_cart(&pool, "session-a").await.expect("query").is_none());

    add_cart_item(&pool, "session-a", ids[0], 1).await.expect("add");
    let item = add_cart_item(&pool, "session-a", ids[0], 2).await.expect("add again");
    assert_eq!(item.quantity, 3);
    add_cart_item(&pool, "session-a", ids[1], 1).await.expect("add second");

    let items = list_cart_items(&pool, "session-a").await.expect("list");
    assert_eq!(items.len(), 2);
    assert!(list_cart_items(&pool, "session-b").await.expect("list").is_empty());

    let removed = remove_cart_item(&pool, "session-a", ids[0]).await.expect("remove");
    assert_eq!(removed.product_id, ids[0]);
    assert!(matches!(
        remove_cart_item(&pool, "session-a", ids[0]).await,
        Err(DbError::NotFound)
    ));
    assert!(matches!(
        add_cart_item(&pool, "session-a", -1, 1).await,
        Err(DbError::NotFound)
    ));
}
