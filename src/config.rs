use crate::util::env::{db_url, env_flag, env_opt, env_parse};
use std::time::Duration;

pub const DEFAULT_SWAPI_BASE_URL: &str = "https://swapi.dev/api/";

/// Settings for the canonical data import.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub backoff: Duration,
    pub request_timeout: Duration,
    pub deadline: Duration,
    /// Official film count at which the import is considered done.
    pub expected_films: i64,
    /// Official planet count at which the import is considered done.
    pub expected_planets: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SWAPI_BASE_URL.to_string(),
            max_retries: 3,
            backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(20),
            deadline: Duration::from_secs(300),
            expected_films: 6,
            expected_planets: 60,
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_opt("SWAPI_BASE_URL").unwrap_or(d.base_url),
            max_retries: env_parse("SWAPI_MAX_RETRIES", d.max_retries),
            backoff: Duration::from_millis(env_parse("SWAPI_BACKOFF_MS", d.backoff.as_millis() as u64)),
            request_timeout: Duration::from_secs(env_parse("SWAPI_TIMEOUT_SECS", d.request_timeout.as_secs())),
            deadline: Duration::from_secs(env_parse("IMPORT_DEADLINE_SECS", d.deadline.as_secs())),
            expected_films: env_parse("IMPORT_EXPECTED_FILMS", d.expected_films),
            expected_planets: env_parse("IMPORT_EXPECTED_PLANETS", d.expected_planets),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub import_on_startup: bool,
    pub import: ImportConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: db_url(),
            max_connections: env_parse("DB_MAX_CONNS", 5u32),
            host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("API_PORT", 8000u16),
            allowed_origins: env_opt("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),
            import_on_startup: env_flag("IMPORT_ON_STARTUP", true),
            import: ImportConfig::from_env(),
        }
    }

    /// Keys logged by `preflight_check` at startup.
    pub const LOGGED_KEYS: &'static [&'static str] = &[
        "DATABASE_URL",
        "DB_MAX_CONNS",
        "API_HOST",
        "API_PORT",
        "ALLOWED_ORIGINS",
        "IMPORT_ON_STARTUP",
        "SWAPI_BASE_URL",
        "SWAPI_MAX_RETRIES",
        "IMPORT_DEADLINE_SECS",
    ];
}
