//! Configuration loading

use anyhow::{Context, Result, bail};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Secret shipped in the defaults; never acceptable outside development
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Upper bound for either token lifetime
const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Path of the SQLite file behind `url`, if it names one
    pub fn file_path(&self) -> Option<PathBuf> {
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();

        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,
    #[serde(default = "default_refresh_token_expire_days")]
    pub refresh_token_expire_days: i64,
    /// Administrator created at startup when no active admin exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_expire_minutes: default_access_token_expire_minutes(),
            refresh_token_expire_days: default_refresh_token_expire_days(),
            bootstrap_admin: None,
        }
    }
}

impl AuthConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn access_ttl(&self) -> Result<Duration> {
        bounded_ttl(
            "auth.access_token_expire_minutes",
            Duration::try_minutes(self.access_token_expire_minutes),
        )
    }

    pub fn refresh_ttl(&self) -> Result<Duration> {
        bounded_ttl(
            "auth.refresh_token_expire_days",
            Duration::try_days(self.refresh_token_expire_days),
        )
    }
}

fn bounded_ttl(field: &str, ttl: Option<Duration>) -> Result<Duration> {
    match ttl {
        Some(ttl) if ttl > Duration::zero() && ttl <= Duration::days(MAX_TOKEN_TTL_DAYS) => Ok(ttl),
        _ => bail!(
            "{} must be positive and at most {} days",
            field,
            MAX_TOKEN_TTL_DAYS
        ),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
    #[serde(default = "default_admin_phone")]
    pub phone_number: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins allowed to call the API; empty allows any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// List endpoint paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
    #[serde(default = "default_page_size")]
    pub max_page_size: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_page_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_url() -> String {
    "sqlite://./data/userdesk.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_access_token_expire_minutes() -> i64 {
    30
}

fn default_refresh_token_expire_days() -> i64 {
    7
}

fn default_admin_first_name() -> String {
    "Admin".to_string()
}

fn default_admin_last_name() -> String {
    "User".to_string()
}

fn default_admin_phone() -> String {
    "00000000000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

fn default_page_size() -> i64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        self.auth.access_ttl()?;
        self.auth.refresh_ttl()?;
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        if self.pagination.max_page_size <= 0 {
            bail!("pagination.max_page_size must be positive");
        }
        if self.pagination.default_page_size <= 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            bail!("pagination.default_page_size must be between 1 and max_page_size");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            bail!("logging.format must be \"pretty\" or \"json\"");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/userdesk.toml").unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.access_token_expire_minutes, 30);
        assert_eq!(config.auth.refresh_token_expire_days, 7);
        assert_eq!(config.pagination.max_page_size, 100);
        assert!(config.auth.uses_default_secret());
        assert!(config.auth.bootstrap_admin.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            [server]
            port = 9000

            [auth]
            jwt_secret = "a-real-secret"

            [auth.bootstrap_admin]
            email = "admin@example.com"
            username = "admin"
            password = "admin-password"

            [logging]
            format = "json"
            "#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(!config.auth.uses_default_secret());
        assert_eq!(config.auth.access_token_expire_minutes, 30);
        assert_eq!(config.logging.format, "json");

        let admin = config.auth.bootstrap_admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.first_name, "Admin");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config(
            r#"
            [pagination]
            default_page_size = 500
            max_page_size = 100
            "#,
        );
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config(
            r#"
            [logging]
            format = "xml"
            "#,
        );
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config("[server\nport = 1");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_token_lifetimes_are_bounded() {
        let mut config = Config::default();
        assert_eq!(config.auth.access_ttl().unwrap(), Duration::minutes(30));
        assert_eq!(config.auth.refresh_ttl().unwrap(), Duration::days(7));

        config.auth.access_token_expire_minutes = 0;
        assert!(config.validate().is_err());

        config.auth.access_token_expire_minutes = i64::MAX;
        assert!(config.validate().is_err());

        config.auth.access_token_expire_minutes = 30;
        config.auth.refresh_token_expire_days = i64::MAX / 1000;
        assert!(config.validate().is_err());

        let file = write_config(
            r#"
            [auth]
            refresh_token_expire_days = 100000000000000
            "#,
        );
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_database_file_path() {
        let mut db = DatabaseConfig::default();
        assert_eq!(db.file_path(), Some(PathBuf::from("./data/userdesk.db")));

        db.url = "sqlite:/var/lib/userdesk.db?mode=rwc".to_string();
        assert_eq!(db.file_path(), Some(PathBuf::from("/var/lib/userdesk.db")));

        db.url = "sqlite::memory:".to_string();
        assert_eq!(db.file_path(), None);
    }
}
