use std::env::VarError;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Reads [`AppConfig`] from the process environment, after loading `.env`
/// if one is present.
///
/// # Errors
///
/// Returns [`ConfigError`] if `DATABASE_URL` is missing or any value fails
/// to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Like [`load_app_config`] but never touches `.env`.
///
/// # Errors
///
/// Returns [`ConfigError`] if `DATABASE_URL` is missing or any value fails
/// to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Typed access to an env-var lookup.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    fn required(&self, var: &str) -> Result<String, ConfigError> {
        (self.lookup)(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn string(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_string())
    }

    /// Set and non-blank.
    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).ok().filter(|v| !v.trim().is_empty())
    }

    fn parsed<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match (self.lookup)(var) {
            Err(_) => Ok(default),
            Ok(raw) => raw.trim().parse::<T>().map_err(|e| invalid(var, e.to_string())),
        }
    }

    fn flag(&self, var: &str, default: bool) -> Result<bool, ConfigError> {
        let Ok(raw) = (self.lookup)(var) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    }
}

fn invalid(var: &str, reason: String) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    }
}

/// Assembles [`AppConfig`] from `lookup`, so tests can supply a plain map
/// instead of the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let vars = Vars { lookup };

    let database_url = vars.required("DATABASE_URL")?;
    let env = parse_environment(&vars.string("GROCER_ENV", "development"))?;

    let default_bind = SocketAddr::from(([0, 0, 0, 0], 8000));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr: vars.parsed("GROCER_BIND_ADDR", default_bind)?,
        log_level: vars.string("GROCER_LOG_LEVEL", "info"),
        db_max_connections: vars.parsed("GROCER_DB_MAX_CONNECTIONS", 10)?,
        db_min_connections: vars.parsed("GROCER_DB_MIN_CONNECTIONS", 1)?,
        db_acquire_timeout_secs: vars.parsed("GROCER_DB_ACQUIRE_TIMEOUT_SECS", 10)?,
        tei_url: trim_base_url(&vars.string("GROCER_TEI_URL", "http://localhost:8080")),
        tei_sparse: vars.flag("GROCER_TEI_SPARSE", true)?,
        qdrant_url: trim_base_url(&vars.string("GROCER_QDRANT_URL", "http://localhost:6333")),
        qdrant_collection: vars.string("GROCER_QDRANT_COLLECTION", "grocery-hybrid"),
        qdrant_api_key: vars.optional("GROCER_QDRANT_API_KEY"),
        collab_timeout_secs: vars.parsed("GROCER_COLLAB_TIMEOUT_SECS", 10)?,
        tuning_path: PathBuf::from(vars.string("GROCER_TUNING_PATH", "./config/tuning.yaml")),
        cors_origins: vars
            .string("GROCER_CORS_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GROCER_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
