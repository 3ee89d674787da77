//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `ORDER_DESK_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDER_DESK_PORT` - Listen port (default: 3001)
//! - `ORDER_DESK_BASE_URL` - Public URL; `https://` enables secure cookies
//!   (default: <http://localhost:3001>)
//! - `ORDER_DESK_REGISTRY_PATH` - User registry file (default: employees.json)
//!
//! ## Record store
//! - `ORDER_DESK_STORE` - `sheets` or `memory` (default: sheets)
//! - `ORDER_DESK_READ_CACHE_SECS` - Read cache window in seconds (default: 600)
//! - `GOOGLE_SHEET_NAME` - Spreadsheet title (default: `MyTestSheet`)
//! - `GOOGLE_SHEET_ID` - Spreadsheet id; skips the lookup by title
//! - `GOOGLE_SERVICE_ACCOUNT_JSON` - Service-account key, inline
//! - `GOOGLE_SERVICE_ACCOUNT_FILE` - Service-account key, path to the file
//!
//! ## Observability
//! - `LOG_FORMAT` - `json` for structured logs (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::store::sheets::SheetLocator;

/// Default spreadsheet title.
pub const DEFAULT_SHEET_NAME: &str = "MyTestSheet";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Which record store backs the order book.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// In-process store; orders are lost on restart.
    Memory,
    /// Google Sheets.
    GoogleSheets(GoogleSheetsConfig),
}

/// Google Sheets connection settings.
///
/// Implements `Debug` manually to redact the service-account key.
#[derive(Clone)]
pub struct GoogleSheetsConfig {
    /// How to find the spreadsheet.
    pub locator: SheetLocator,
    /// Service-account key JSON (contains the private key).
    pub service_account_json: SecretString,
}

impl std::fmt::Debug for GoogleSheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsConfig")
            .field("locator", &self.locator)
            .field("service_account_json", &"[REDACTED]")
            .finish()
    }
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the dashboard
    pub base_url: String,
    /// User registry JSON file
    pub registry_path: PathBuf,
    /// How long record store reads are cached
    pub read_cache: Duration,
    /// Record store selection
    pub store: StoreConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is missing or cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is missing or cannot be parsed.
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&vars);

        let host = env
            .or_default("ORDER_DESK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDER_DESK_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("ORDER_DESK_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDER_DESK_PORT".to_string(), e.to_string()))?;
        let base_url = env.or_default("ORDER_DESK_BASE_URL", &format!("http://localhost:{port}"));
        let registry_path = PathBuf::from(env.or_default("ORDER_DESK_REGISTRY_PATH", "employees.json"));
        let read_cache = env
            .or_default("ORDER_DESK_READ_CACHE_SECS", "600")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ORDER_DESK_READ_CACHE_SECS".to_string(), e.to_string())
            })?;
        let store = StoreConfig::from_env(&env)?;
        let log_format = match env.or_default("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" | "" => LogFormat::Text,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected `text` or `json`, got `{other}`"),
                ));
            }
        };
        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        Ok(Self {
            host,
            port,
            base_url,
            registry_path,
            read_cache,
            store,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StoreConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        match env.or_default("ORDER_DESK_STORE", "sheets").to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sheets" => GoogleSheetsConfig::from_env(env).map(Self::GoogleSheets),
            other => Err(ConfigError::InvalidEnvVar(
                "ORDER_DESK_STORE".to_string(),
                format!("expected `sheets` or `memory`, got `{other}`"),
            )),
        }
    }
}

impl GoogleSheetsConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let locator = env.optional("GOOGLE_SHEET_ID").map_or_else(
            || SheetLocator::Name(env.or_default("GOOGLE_SHEET_NAME", DEFAULT_SHEET_NAME)),
            SheetLocator::Id,
        );

        let service_account_json = if let Some(json) = env.optional("GOOGLE_SERVICE_ACCOUNT_JSON") {
            json
        } else if let Some(path) = env.optional("GOOGLE_SERVICE_ACCOUNT_FILE") {
            std::fs::read_to_string(&path).map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "GOOGLE_SERVICE_ACCOUNT_FILE".to_string(),
                    format!("{path}: {e}"),
                )
            })?
        } else {
            return Err(ConfigError::MissingEnvVar(
                "GOOGLE_SERVICE_ACCOUNT_JSON or GOOGLE_SERVICE_ACCOUNT_FILE".to_string(),
            ));
        };

        Ok(Self {
            locator,
            service_account_json: SecretString::from(service_account_json),
        })
    }
}

/// Variable lookup; blank values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DashboardConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_memory_defaults() {
        let config = load(&[("ORDER_DESK_STORE", "memory")]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3001");
        assert_eq!(config.base_url, "http://localhost:3001");
        assert_eq!(config.registry_path, PathBuf::from("employees.json"));
        assert_eq!(config.read_cache, Duration::from_secs(600));
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(matches!(config.store, StoreConfig::Memory));
        assert!(!config.is_secure());
    }

    #[test]
    fn test_sheets_requires_credentials() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_sheets_by_name_and_id() {
        let config = load(&[("GOOGLE_SERVICE_ACCOUNT_JSON", "{}")]).unwrap();
        let StoreConfig::GoogleSheets(sheets) = config.store else {
            panic!("expected sheets store");
        };
        assert_eq!(sheets.locator, SheetLocator::Name(DEFAULT_SHEET_NAME.to_string()));
        assert_eq!(sheets.service_account_json.expose_secret(), "{}");

        let config = load(&[
            ("GOOGLE_SERVICE_ACCOUNT_JSON", "{}"),
            ("GOOGLE_SHEET_ID", "abc123"),
        ])
        .unwrap();
        let StoreConfig::GoogleSheets(sheets) = config.store else {
            panic!("expected sheets store");
        };
        assert_eq!(sheets.locator, SheetLocator::Id("abc123".to_string()));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("ORDER_DESK_STORE", "memory"), ("ORDER_DESK_PORT", "http")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "ORDER_DESK_PORT"
        ));
        assert!(matches!(
            load(&[("ORDER_DESK_STORE", "postgres")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "ORDER_DESK_STORE"
        ));
        assert!(matches!(
            load(&[("ORDER_DESK_STORE", "memory"), ("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "LOG_FORMAT"
        ));
    }

    #[test]
    fn test_https_base_url_is_secure() {
        let config = load(&[
            ("ORDER_DESK_STORE", "memory"),
            ("ORDER_DESK_BASE_URL", "https://orders.example.com"),
        ])
        .unwrap();
        assert!(config.is_secure());
    }

    #[test]
    fn test_debug_redacts_service_account() {
        let config = GoogleSheetsConfig {
            locator: SheetLocator::Name("x".to_string()),
            service_account_json: SecretString::from("PRIVATE KEY"),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("PRIVATE KEY"));
    }
}
