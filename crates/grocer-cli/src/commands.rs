//! Command handlers. Each prints its result to stdout as pretty JSON.

use std::collections::HashMap;
use std::path::Path;

use grocer_core::{AppConfig, Product};
use grocer_db::PgCatalog;
use grocer_matching::{CartLine, HybridEngine, SearchOutcome, SearchRequest};
use serde::Serialize;
use sqlx::PgPool;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    Ok(grocer_db::connect_pool_from_config(config).await?)
}

/// Loads config, connects, and wires the production engine.
async fn engine() -> anyhow::Result<HybridEngine<PgCatalog>> {
    let config = grocer_core::load_app_config()?;
    let tuning = grocer_core::load_tuning(&config.tuning_path)?;
    let pool = connect(&config).await?;
    Ok(grocer_matching::hybrid_engine(
        &config,
        &tuning,
        PgCatalog::new(pool),
    )?)
}

/// # Errors
///
/// Returns an error if setup fails, the vector index cannot serve the
/// query, or hydrating hits from the catalog fails.
pub(crate) async fn run_search(request: &SearchRequest) -> anyhow::Result<()> {
    let engine = engine().await?;
    match engine.search(request).await? {
        SearchOutcome::Ranked(page) => print_json(&page),
        SearchOutcome::IndexUnavailable => {
            anyhow::bail!("semantic search is unavailable; check the TEI and Qdrant endpoints")
        }
    }
}

/// # Errors
///
/// Returns an error if setup fails or the product does not exist.
pub(crate) async fn run_match(product_id: i64) -> anyhow::Result<()> {
    let engine = engine().await?;
    let matches = engine.alternatives(product_id).await?;
    print_json(&matches)
}

/// # Errors
///
/// Returns an error if setup fails, the session has no cart, or a query fails.
pub(crate) async fn run_compare(session_id: &str) -> anyhow::Result<()> {
    let engine = engine().await?;
    let pool = engine.catalog().pool();

    if grocer_db::get_cart(pool, session_id).await?.is_none() {
        anyhow::bail!("no cart found for session '{session_id}'");
    }
    let items = grocer_db::list_cart_items(pool, session_id).await?;
    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let mut products: HashMap<i64, Product> = grocer_db::list_products_by_ids(pool, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let lines: Vec<CartLine> = items
        .iter()
        .filter_map(|item| {
            let product = products.remove(&item.product_id)?;
            Some(CartLine::new(
                product,
                u32::try_from(item.quantity).unwrap_or(1),
            ))
        })
        .collect();
    tracing::info!(session_id, lines = lines.len(), "comparing cart");

    let comparison = engine.compare_cart(&lines).await;
    print_json(&comparison)
}

#[derive(Debug, Serialize)]
struct MigrationReport {
    applied: usize,
}

/// # Errors
///
/// Returns an error if config is invalid, the database is unreachable, or a
/// migration fails.
pub(crate) async fn run_migrate() -> anyhow::Result<()> {
    let config = grocer_core::load_app_config()?;
    let pool = connect(&config).await?;
    let applied = grocer_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations complete");
    print_json(&MigrationReport { applied })
}

/// Validates a tuning file without touching the database or collaborators.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub(crate) fn run_check_tuning(path: &Path) -> anyhow::Result<()> {
    let tuning = grocer_core::load_tuning(path)?;
    print_json(&tuning)
}
