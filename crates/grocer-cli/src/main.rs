mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use grocer_core::Store;
use grocer_matching::PriceSort;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "grocer-cli")]
#[command(about = "Cross-store grocery search, matching and basket comparison")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Semantic product search
    Search {
        query: String,
        #[arg(long, value_parser = parse_store)]
        store: Option<Store>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        /// relevance, price_low or price_high
        #[arg(long, default_value = "relevance", value_parser = parse_sort)]
        sort: PriceSort,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
    },
    /// Find the same product at the other stores
    Match { product_id: i64 },
    /// Compare a session's cart across stores
    Compare { session_id: String },
    /// Apply pending database migrations
    Migrate,
    /// Validate a tuning file and print the effective values
    CheckTuning {
        #[arg(env = "GROCER_TUNING_PATH", default_value = "./config/tuning.yaml")]
        path: PathBuf,
    },
}

fn parse_store(raw: &str) -> Result<Store, String> {
    raw.parse::<Store>().map_err(|e| e.to_string())
}

fn parse_sort(raw: &str) -> Result<PriceSort, String> {
    raw.parse::<PriceSort>()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // stdout carries JSON output only
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search {
            query,
            store,
            category,
            brand,
            sort,
            page,
            limit,
        } => {
            let request = grocer_matching::SearchRequest {
                query,
                store,
                category,
                brand,
                sort,
                page,
                limit,
            };
            commands::run_search(&request).await
        }
        Commands::Match { product_id } => commands::run_match(product_id).await,
        Commands::Compare { session_id } => commands::run_compare(&session_id).await,
        Commands::Migrate => commands::run_migrate().await,
        Commands::CheckTuning { path } => commands::run_check_tuning(&path),
    }
}
