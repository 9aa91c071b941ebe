//! Shared domain types and configuration for the grocer workspace.

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod price;
pub mod products;
pub mod stores;
pub mod tuning;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::ProductCatalog;
pub use config::{load_app_config, load_app_config_from_env};
pub use price::parse_price;
pub use products::{normalize_attribute, Product};
pub use stores::Store;
pub use tuning::{load_tuning, MatchingTuning, RankingWeights, Tuning};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid store: {0}")]
    InvalidStore(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tuning file {path}: {source}")]
    TuningFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tuning file: {0}")]
    TuningFileParse(#[from] serde_yaml::Error),

    #[error("invalid tuning: {0}")]
    Validation(String),
}
