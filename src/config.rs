//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub federation: FederationConfig,
    #[serde(default)]
    pub actors: ActorsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "blog.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the site
    ///
    /// # Returns
    /// Full URL like "https://blog.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Federation / delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Seconds between outbox drain passes
    pub dispatch_interval_seconds: u64,
    /// Maximum outbox items claimed per drain pass
    pub dispatch_batch_size: usize,
    /// Timeout for a single inbox POST, in seconds
    pub request_timeout_seconds: u64,
    /// Maximum concurrent inbox deliveries per item
    pub max_concurrent_deliveries: usize,
    /// Consecutive delivery errors before a follower is flagged for cleanup
    pub follower_error_threshold: usize,
    /// Days to retain completed outbox items before pruning
    pub outbox_retention_days: i64,
}

/// Local actors to provision at startup
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ActorsConfig {
    #[serde(default)]
    pub seed: Vec<SeedActorConfig>,
}

/// One locally-owned actor
#[derive(Debug, Clone, Deserialize)]
pub struct SeedActorConfig {
    pub username: String,
    #[serde(default = "default_actor_display_name")]
    pub display_name: String,
    /// Actor bio/summary
    pub summary: Option<String>,
    /// ActivityPub actor type (default: "Person")
    #[serde(default = "default_actor_type")]
    pub actor_type: String,
}

fn default_actor_display_name() -> String {
    "Author".to_string()
}

fn default_actor_type() -> String {
    "Person".to_string()
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
    /// 4. Environment variables (FEDIPRESS_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("federation.dispatch_interval_seconds", 30)?
            .set_default("federation.dispatch_batch_size", 25)?
            .set_default("federation.request_timeout_seconds", 30)?
            .set_default("federation.max_concurrent_deliveries", 10)?
            .set_default("federation.follower_error_threshold", 5)?
            .set_default("federation.outbox_retention_days", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (FEDIPRESS_*)
            .add_source(
                Environment::with_prefix("FEDIPRESS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.federation.dispatch_batch_size == 0 {
            return Err(crate::error::AppError::Config(
                "federation.dispatch_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.federation.max_concurrent_deliveries == 0 {
            return Err(crate::error::AppError::Config(
                "federation.max_concurrent_deliveries must be greater than 0".to_string(),
            ));
        }

        if self.server.protocol.eq_ignore_ascii_case("https") || is_local_server_domain(&self.server.domain) {
            return Ok(());
        }

        Err(crate::error::AppError::Config(
            "server.protocol must be https for non-local server domains".to_string(),
        ))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/fedipress-test.db"),
            },
            federation: FederationConfig {
                dispatch_interval_seconds: 30,
                dispatch_batch_size: 25,
                request_timeout_seconds: 30,
                max_concurrent_deliveries: 10,
                follower_error_threshold: 5,
                outbox_retention_days: 30,
            },
            actors: ActorsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "blog.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = valid_config();
        config.federation.dispatch_batch_size = 0;

        let error = config.validate().expect_err("zero batch size must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("dispatch_batch_size")
        ));
    }
}
