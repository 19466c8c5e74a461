//! Application configuration loading from config.toml
//!
//! Every key has a default so the service starts with no file at all. Values from the
//! file are then overridden by a handful of environment variables (`DATABASE_URL`,
//! `HTTP_ADDR`, `AUTH_MODE`, `JWT_SECRET`), which is how deployments usually inject
//! secrets.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{net::SocketAddr, path::Path};
use tracing::{debug, info, warn};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "DATTI_CONFIG";

/// Configuration file used when `DATTI_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Ledger database settings
    pub database: DatabaseConfig,
    /// How callers are identified
    pub auth: AuthConfig,
    /// Balance computation settings
    pub ledger: LedgerConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: super::database::DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Which identity provider resolves the calling user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Trust a header set by an authenticating gateway
    #[default]
    Header,
    /// Validate an HS256 bearer token
    Jwt,
}

impl std::str::FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "jwt" => Ok(Self::Jwt),
            other => Err(Error::Config {
                message: format!("Unknown auth mode '{other}', expected 'header' or 'jwt'"),
            }),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Provider selection
    pub mode: AuthMode,
    /// Header carrying the user id in `header` mode
    pub header: String,
    /// Shared HS256 secret in `jwt` mode
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim; not checked when absent
    pub jwt_audience: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Header,
            header: "x-user-id".to_string(),
            jwt_secret: None,
            jwt_audience: None,
        }
    }
}

/// `[ledger]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Keep computed group balances in memory until the next write
    pub cache_balances: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cache_balances: true,
        }
    }
}

/// Parses a configuration document.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file; a missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(?path, "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    debug!(?path, "Loading configuration");
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

impl AppConfig {
    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = lookup("HTTP_ADDR") {
            self.server.http_addr = addr.parse().map_err(|e| Error::Config {
                message: format!("Invalid HTTP_ADDR '{addr}': {e}"),
            })?;
        }
        if let Some(mode) = lookup("AUTH_MODE") {
            self.auth.mode = mode.parse()?;
        }
        if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        Ok(())
    }

    /// Checks cross-field requirements that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.auth.mode == AuthMode::Jwt && self.auth.jwt_secret.is_none() {
            return Err(Error::Config {
                message: "auth.mode = \"jwt\" requires auth.jwt_secret or JWT_SECRET".to_string(),
            });
        }
        if self.auth.mode == AuthMode::Header && self.auth.header.trim().is_empty() {
            return Err(Error::Config {
                message: "auth.header cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads the full application configuration: file, then environment, then validation.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    info!(
        http_addr = %config.server.http_addr,
        auth_mode = ?config.auth.mode,
        cache_balances = config.ledger.cache_balances,
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            http_addr = "127.0.0.1:3000"

            [database]
            url = "sqlite::memory:"

            [auth]
            mode = "jwt"
            jwt_secret = "s3cret"
            jwt_audience = "datti"

            [ledger]
            cache_balances = false
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.http_addr, ([127, 0, 0, 1], 3000).into());
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.mode, AuthMode::Jwt);
        assert_eq!(config.auth.jwt_audience.as_deref(), Some("datti"));
        assert!(!config.ledger.cache_balances);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.auth.mode, AuthMode::Header);
        assert_eq!(config.auth.header, "x-user-id");
        assert!(config.ledger.cache_balances);
        assert_eq!(config.server.http_addr, ([0, 0, 0, 0], 8080).into());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[server\nhttp_addr = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("HTTP_ADDR", "127.0.0.1:9999"),
            ("AUTH_MODE", "JWT"),
            ("JWT_SECRET", "from-env"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.http_addr, ([127, 0, 0, 1], 9999).into());
        assert_eq!(config.auth.mode, AuthMode::Jwt);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_invalid_http_addr_override() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| (key == "HTTP_ADDR").then(|| "nope".to_string()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_jwt_mode_requires_secret() {
        let mut config = AppConfig::default();
        config.auth.mode = AuthMode::Jwt;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.auth.mode, AuthMode::Header);
    }
}
