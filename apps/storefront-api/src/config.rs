//! Storefront configuration module.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`STOREFRONT_*`)
//! 2. Config file (path in `STOREFRONT_CONFIG`)
//! 3. Defaults (this file)

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_checkout::CheckoutOptions;
use storefront_db::DbConfig;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_VAR: &str = "STOREFRONT_CONFIG";

const DB_PATH_VAR: &str = "STOREFRONT_DB_PATH";
const DB_MAX_CONNECTIONS_VAR: &str = "STOREFRONT_DB_MAX_CONNECTIONS";
const STORAGE_TIMEOUT_VAR: &str = "STOREFRONT_STORAGE_TIMEOUT_MS";
const COMPENSATE_VAR: &str = "STOREFRONT_COMPENSATE_ON_ABORT";

/// Storefront configuration.
///
/// ## Example `storefront.toml`
/// ```toml
/// database_path = "data/storefront.db"
/// max_connections = 8
/// storage_timeout_ms = 2000
/// compensate_on_abort = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file path, or `:memory:`.
    /// Default: "storefront.db"
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Connection pool size.
    /// Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound for each storage call made during checkout, in ms.
    /// Default: 5000
    #[serde(default = "default_storage_timeout_ms")]
    pub storage_timeout_ms: u64,

    /// Restock applied decrements when a purchase aborts.
    /// Default: false
    #[serde(default)]
    pub compensate_on_abort: bool,
}

fn default_database_path() -> String {
    "storefront.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_storage_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            storage_timeout_ms: default_storage_timeout_ms(),
            compensate_on_abort: false,
        }
    }
}

impl StoreConfig {
    /// Load configuration from the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        let config = base.with_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file. Missing keys fall back to defaults.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Applies `STOREFRONT_*` overrides from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_VAR) {
            self.database_path = path;
        }

        if let Some(raw) = lookup(DB_MAX_CONNECTIONS_VAR) {
            self.max_connections = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(DB_MAX_CONNECTIONS_VAR.to_string()))?;
        }

        if let Some(raw) = lookup(STORAGE_TIMEOUT_VAR) {
            self.storage_timeout_ms = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(STORAGE_TIMEOUT_VAR.to_string()))?;
        }

        if let Some(raw) = lookup(COMPENSATE_VAR) {
            self.compensate_on_abort = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(COMPENSATE_VAR.to_string()))?;
        }

        Ok(self)
    }

    /// Checks the values that cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired(DB_PATH_VAR.to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(DB_MAX_CONNECTIONS_VAR.to_string()));
        }

        if self.storage_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(STORAGE_TIMEOUT_VAR.to_string()));
        }

        Ok(())
    }

    /// Database settings derived from this config.
    pub fn db_config(&self) -> DbConfig {
        let db = DbConfig::new(&self.database_path);
        if db.is_in_memory() {
            // A second in-memory connection would see an empty database
            DbConfig::in_memory()
        } else {
            db.max_connections(self.max_connections)
        }
    }

    /// Checkout engine settings derived from this config.
    pub fn checkout_options(&self) -> CheckoutOptions {
        CheckoutOptions {
            storage_timeout: Duration::from_millis(self.storage_timeout_ms),
            compensate_on_abort: self.compensate_on_abort,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.database_path, "storefront.db");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.storage_timeout_ms, 5000);
        assert!(!config.compensate_on_abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StoreConfig = toml::from_str("compensate_on_abort = true").unwrap();
        assert!(config.compensate_on_abort);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.database_path, "storefront.db");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = \"shop.db\"").unwrap();
        writeln!(file, "storage_timeout_ms = 250").unwrap();

        let config = StoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database_path, "shop.db");
        assert_eq!(config.storage_timeout_ms, 250);
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_connections = \"many\"").unwrap();

        let err = StoreConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = StoreConfig::from_file("/nonexistent/storefront.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides_win() {
        let config = StoreConfig::default()
            .with_overrides(lookup_from(&[
                ("STOREFRONT_DB_PATH", ":memory:"),
                ("STOREFRONT_DB_MAX_CONNECTIONS", "12"),
                ("STOREFRONT_STORAGE_TIMEOUT_MS", "750"),
                ("STOREFRONT_COMPENSATE_ON_ABORT", "true"),
            ]))
            .unwrap();

        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.storage_timeout_ms, 750);
        assert!(config.compensate_on_abort);
    }

    #[test]
    fn test_invalid_override_names_the_variable() {
        let err = StoreConfig::default()
            .with_overrides(lookup_from(&[("STOREFRONT_STORAGE_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for STOREFRONT_STORAGE_TIMEOUT_MS");
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let config = StoreConfig {
            database_path: "  ".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));

        let config = StoreConfig {
            storage_timeout_ms: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_derived_settings() {
        let config = StoreConfig {
            database_path: ":memory:".to_string(),
            max_connections: 9,
            storage_timeout_ms: 1500,
            compensate_on_abort: true,
        };

        let db = config.db_config();
        assert!(db.is_in_memory());
        assert_eq!(db.max_connections, 1);

        let options = config.checkout_options();
        assert_eq!(options.storage_timeout, Duration::from_millis(1500));
        assert!(options.compensate_on_abort);

        let file_backed = StoreConfig {
            database_path: "shop.db".to_string(),
            max_connections: 9,
            ..StoreConfig::default()
        };
        assert_eq!(file_backed.db_config().max_connections, 9);
    }
}
