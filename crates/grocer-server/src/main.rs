mod api;
mod middleware;

use std::sync::Arc;

use grocer_db::PgCatalog;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(grocer_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let tuning = grocer_core::load_tuning(&config.tuning_path)?;

    let pool_config = grocer_db::PoolConfig::from_app_config(&config);
    let pool = grocer_db::connect_pool(&config.database_url, pool_config).await?;
    grocer_db::run_migrations(&pool).await?;

    let engine = grocer_matching::hybrid_engine(&config, &tuning, PgCatalog::new(pool.clone()))?;
    let app = build_app(
        AppState {
            pool,
            engine: Arc::new(engine),
        },
        &config.cors_origins,
    );

    tracing::info!(addr = %config.bind_addr, env = %config.env, "grocer-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
