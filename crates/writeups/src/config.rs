//! Configuration management for writeups.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{HttpStore, HttpStoreConfig, MemoryStore, RemoteStore, SqliteStore};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "writeups";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "writeups.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WRITEUPS_`, sections split by `__`)
/// 2. TOML config file at `~/.config/writeups/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backing store configuration.
    pub store: StoreConfig,
    /// Sync layer configuration.
    pub sync: SyncConfig,
    /// Derived view configuration.
    pub views: ViewsConfig,
}

/// Which backend holds the write-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Hosted PostgREST table.
    Http,
    /// Local `SQLite` file.
    #[default]
    Sqlite,
    /// Process memory (nothing persists).
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Store-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to use.
    pub backend: Backend,
    /// Project URL for the http backend.
    pub url: Option<String>,
    /// API key for the http backend. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Table name for the http backend.
    pub table: String,
    /// Request timeout for the http backend, in seconds.
    pub timeout_secs: u64,
    /// Path to the database file.
    /// Defaults to `~/.local/share/writeups/writeups.db`
    pub database_path: Option<PathBuf>,
    /// Reject writes to the sqlite backend.
    pub read_only: bool,
}

/// Sync-layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Serve the sample write-ups when loading fails for any reason.
    /// When false, only missing-table and access-denied failures do.
    pub fallback_on_load_error: bool,
    /// Never contact the store; start on the sample write-ups.
    pub start_in_fallback: bool,
}

/// Derived-view configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Number of write-ups shown as recent.
    pub recent_limit: usize,
    /// Number of related write-ups shown on a detail page.
    pub related_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: None,
            api_key: None,
            table: "writeups".to_string(),
            timeout_secs: 10,
            database_path: None, // Will be resolved to default at runtime
            read_only: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fallback_on_load_error: true,
            start_in_fallback: false,
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            recent_limit: 6,
            related_limit: 3,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(&config_file))
                .merge(Env::prefixed("WRITEUPS_").split("__")),
        )
    }

    /// Extract and validate configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::ConfigValidation {
                message: message.to_string(),
            })
        };

        if self.store.backend == Backend::Http {
            match self.store.url.as_deref().map(str::trim) {
                None | Some("") => return invalid("store.url is required for the http backend"),
                Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    return invalid("store.url must start with http:// or https://");
                }
                Some(_) => {}
            }
        }

        if self.store.table.trim().is_empty() {
            return invalid("store.table must not be empty");
        }

        if self.store.timeout_secs == 0 {
            return invalid("store.timeout_secs must be greater than 0");
        }

        if self.views.recent_limit == 0 || self.views.related_limit == 0 {
            return invalid("views limits must be greater than 0");
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Settings for the http backend.
    #[must_use]
    pub fn http_store_config(&self) -> HttpStoreConfig {
        HttpStoreConfig {
            base_url: self.store.url.clone().unwrap_or_default(),
            api_key: self.store.api_key.clone(),
            table: self.store.table.clone(),
            timeout: self.timeout(),
        }
    }

    /// Build the configured backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open_store(&self) -> Result<Arc<dyn RemoteStore>> {
        let store: Arc<dyn RemoteStore> = match self.store.backend {
            Backend::Http => Arc::new(HttpStore::new(&self.http_store_config())?),
            Backend::Sqlite => {
                let store = SqliteStore::open(self.database_path())?;
                store.set_read_only(self.store.read_only)?;
                Arc::new(store)
            }
            Backend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_toml(toml: &str) -> Result<Config> {
        Config::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.store.backend, Backend::Sqlite);
        assert_eq!(config.store.table, "writeups");
        assert_eq!(config.store.timeout_secs, 10);
        assert!(config.sync.fallback_on_load_error);
        assert!(!config.sync.start_in_fallback);
        assert_eq!(config.views.recent_limit, 6);
        assert_eq!(config.views.related_limit, 3);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_http_requires_url() {
        let mut config = Config::default();
        config.store.backend = Backend::Http;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("store.url"));

        config.store.url = Some("ftp://example.test".to_string());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http://"));

        config.store.url = Some("https://example.supabase.co".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.store.timeout_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_empty_table() {
        let mut config = Config::default();
        config.store.table = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_limits() {
        let mut config = Config::default();
        config.views.related_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("writeups.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.store.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("writeups"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.store.table, Config::default().store.table);
    }

    #[test]
    fn test_load_from_toml() {
        let config = load_toml(
            r#"
            [store]
            backend = "http"
            url = "https://abc.supabase.co"
            api_key = "anon"
            timeout_secs = 3

            [sync]
            fallback_on_load_error = false
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, Backend::Http);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(!config.sync.fallback_on_load_error);
        assert_eq!(config.views, ViewsConfig::default());

        let http = config.http_store_config();
        assert_eq!(http.base_url, "https://abc.supabase.co");
        assert_eq!(http.api_key.as_deref(), Some("anon"));
        assert_eq!(http.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_load_invalid_backend() {
        let err = load_toml("[store]\nbackend = \"postgres\"").unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WRITEUPS_STORE__BACKEND", "memory");
            jail.set_env("WRITEUPS_VIEWS__RECENT_LIMIT", "9");
            let config = Config::load_from(Some(PathBuf::from("missing.toml"))).unwrap();
            assert_eq!(config.store.backend, Backend::Memory);
            assert_eq!(config.views.recent_limit, 9);
            Ok(())
        });
    }

    #[test]
    fn test_open_memory_store() {
        let mut config = Config::default();
        config.store.backend = Backend::Memory;
        let store = config.open_store().unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_open_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.database_path = Some(dir.path().join("w.db"));
        let store = config.open_store().unwrap();
        assert_eq!(store.name(), "sqlite");
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Http.to_string(), "http");
        assert_eq!(Backend::Sqlite.to_string(), "sqlite");
        assert_eq!(Backend::Memory.to_string(), "memory");
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("fallback_on_load_error"));
        assert!(json.contains("\"sqlite\""));
    }

    #[test]
    fn test_config_serialize_hides_api_key() {
        let mut config = Config::default();
        config.store.backend = Backend::Http;
        config.store.url = Some("https://abc.supabase.co".to_string());
        config.store.api_key = Some("super-secret-key".to_string());

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(!json.contains("super-secret-key"));
        assert!(!json.contains("api_key"));
        assert!(json.contains("abc.supabase.co"));
    }

    #[test]
    fn test_api_key_still_loads() {
        let config = load_toml("[store]\napi_key = \"anon\"").unwrap();
        assert_eq!(config.store.api_key.as_deref(), Some("anon"));
    }
}
