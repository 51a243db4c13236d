//! API Configuration Module
//!
//! Bind address, CORS and log output for the HTTP server, plus where the
//! literary catalog is loaded from. Values come from environment variables
//! with defaults suited to local development.

use colloquy_core::config::parse_env;
use colloquy_core::{ColloquyResult, ConfigError};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Log line format written by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{}'", other)),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    pub log_format: LogFormat,

    /// JSON file holding the literary catalog. No file means an empty catalog.
    pub catalog_path: Option<PathBuf>,

    /// Seed the demo inventory at startup.
    pub seed_inventory: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            log_format: LogFormat::Pretty,
            catalog_path: None,
            seed_inventory: false,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COLLOQUY_API_HOST`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `COLLOQUY_API_PORT`: Bind port (default: 5000)
    /// - `COLLOQUY_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `COLLOQUY_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `COLLOQUY_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `COLLOQUY_LOG_FORMAT`: "pretty" or "json" (default: pretty)
    /// - `COLLOQUY_CATALOG_PATH`: Catalog JSON file (default: none)
    /// - `COLLOQUY_SEED_INVENTORY`: "true" to load the demo inventory (default: false)
    pub fn from_env() -> ColloquyResult<Self> {
        let defaults = Self::default();

        let host = std::env::var("COLLOQUY_API_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match parse_env::<u16>("PORT")? {
            Some(port) => port,
            None => parse_env::<u16>("COLLOQUY_API_PORT")?.unwrap_or(defaults.port),
        };

        let cors_origins = std::env::var("COLLOQUY_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("COLLOQUY_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs =
            parse_env::<u64>("COLLOQUY_CORS_MAX_AGE_SECS")?.unwrap_or(defaults.cors_max_age_secs);

        let log_format = match std::env::var("COLLOQUY_LOG_FORMAT") {
            Ok(raw) if !raw.trim().is_empty() => {
                raw.parse::<LogFormat>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: "COLLOQUY_LOG_FORMAT".to_string(),
                        value: raw.clone(),
                        reason,
                    })?
            }
            _ => defaults.log_format,
        };

        let catalog_path = std::env::var("COLLOQUY_CATALOG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let seed_inventory = std::env::var("COLLOQUY_SEED_INVENTORY")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            log_format,
            catalog_path,
            seed_inventory,
        })
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> ColloquyResult<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue {
                field: "COLLOQUY_API_HOST".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Check if running with a strict CORS origin list.
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}
