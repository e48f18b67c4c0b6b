//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cloudflare: CloudflareConfig,
    pub auth: AuthConfig,
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub geo_block: GeoBlockConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "mutuals.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Full URL like "https://mutuals.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Maximum pooled connections
    pub max_connections: u32,
}

/// Storage configuration (Cloudflare R2)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub avatar: AvatarStorageConfig,
}

/// Avatar storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarStorageConfig {
    /// R2 bucket name for avatars
    pub bucket: String,
    /// Public URL for the bucket (Custom Domain)
    /// e.g., "https://media.example.com"
    pub public_url: String,
    /// Upload size cap in bytes
    pub max_bytes: usize,
}

/// Cloudflare credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// R2 access key ID
    pub r2_access_key_id: String,
    /// R2 secret access key
    pub r2_secret_access_key: String,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Timeline paging limits
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// Page size when the client does not ask for one
    pub default_limit: usize,
    /// Largest page a client may request
    pub max_limit: usize,
}

impl TimelineConfig {
    /// Resolve a requested page size against the configured bounds
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

/// Country-based access gate
#[derive(Debug, Clone, Deserialize)]
pub struct GeoBlockConfig {
    #[serde(default)]
    pub enabled: bool,
    /// ISO 3166-1 alpha-2 codes allowed through
    #[serde(default = "default_allowed_countries")]
    pub allowed_countries: Vec<String>,
}

impl Default for GeoBlockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_countries: default_allowed_countries(),
        }
    }
}

fn default_allowed_countries() -> Vec<String> {
    vec!["JP".to_string()]
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MUTUALS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/mutuals.db")?
            .set_default("database.max_connections", 8)?
            .set_default("storage.avatar.max_bytes", 5 * 1024 * 1024)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("timeline.default_limit", 30)?
            .set_default("timeline.max_limit", 100)?
            .set_default("geo_block.enabled", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("MUTUALS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("geo_block.allowed_countries"),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.timeline.max_limit == 0
            || self.timeline.default_limit == 0
            || self.timeline.default_limit > self.timeline.max_limit
        {
            return Err(crate::error::AppError::Config(
                "timeline.default_limit must be between 1 and timeline.max_limit".to_string(),
            ));
        }

        if self.geo_block.enabled && self.geo_block.allowed_countries.is_empty() {
            return Err(crate::error::AppError::Config(
                "geo_block.allowed_countries must not be empty when geo_block.enabled=true"
                    .to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
