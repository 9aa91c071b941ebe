use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Base URL of the Text Embeddings Inference server.
    pub tei_url: String,
    /// Whether to request sparse (keyword) vectors from TEI as well.
    pub tei_sparse: bool,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub qdrant_api_key: Option<String>,
    /// Request timeout applied to every encoder and index call.
    pub collab_timeout_secs: u64,
    pub tuning_path: PathBuf,
    /// Allowed CORS origins; empty means any origin.
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("tei_url", &self.tei_url)
            .field("tei_sparse", &self.tei_sparse)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_collection", &self.qdrant_collection)
            .field(
                "qdrant_api_key",
                &self.qdrant_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("collab_timeout_secs", &self.collab_timeout_secs)
            .field("tuning_path", &self.tuning_path)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}
