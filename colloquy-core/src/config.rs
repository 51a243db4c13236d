//! Engine configuration
//!
//! Loaded from environment variables at startup with development defaults.

use crate::{ColloquyError, ColloquyResult, ConfigError};
use std::time::Duration;

// ============================================================================
// FEATURED PARTS
// ============================================================================

/// A catalog title fragment pinned to a specific part number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturedPart {
    /// Lowercased fragment matched against the requested title.
    pub title_fragment: String,
    pub part_number: u32,
}

/// Part numbers served by default for matching titles when the caller asks
/// for a work without naming a part.
///
/// Parsed from `title=part` pairs separated by commas, e.g. `gitanjali=35`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeaturedParts(Vec<FeaturedPart>);

impl FeaturedParts {
    pub fn new(parts: Vec<FeaturedPart>) -> Self {
        Self(parts)
    }

    /// Parse the `title=part,title=part` form.
    pub fn parse(raw: &str) -> ColloquyResult<Self> {
        let mut parts = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (title, number) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                field: "COLLOQUY_FEATURED_PARTS".to_string(),
                value: pair.to_string(),
                reason: "expected title=part".to_string(),
            })?;
            let title = title.trim().to_lowercase();
            if title.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "COLLOQUY_FEATURED_PARTS".to_string(),
                    value: pair.to_string(),
                    reason: "title fragment is empty".to_string(),
                }
                .into());
            }
            let part_number = number.trim().parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                field: "COLLOQUY_FEATURED_PARTS".to_string(),
                value: pair.to_string(),
                reason: e.to_string(),
            })?;
            parts.push(FeaturedPart {
                title_fragment: title,
                part_number,
            });
        }
        Ok(Self(parts))
    }

    /// Featured part for a requested title, first match wins.
    pub fn lookup(&self, title: &str) -> Option<u32> {
        let title = title.to_lowercase();
        self.0
            .iter()
            .find(|part| title.contains(&part.title_fragment))
            .map(|part| part.part_number)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Model and turn settings shared by every assistant profile.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Longest gap between two model stream events before the turn fails.
    pub stream_idle_timeout: Duration,
    pub featured_parts: FeaturedParts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1000,
            temperature: None,
            stream_idle_timeout: Duration::from_secs(60),
            featured_parts: FeaturedParts::default(),
        }
    }
}

impl EngineConfig {
    /// Create EngineConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COLLOQUY_MODEL`: Model identifier (default: claude-3-haiku-20240307)
    /// - `COLLOQUY_MAX_TOKENS`: Response token cap (default: 1000)
    /// - `COLLOQUY_TEMPERATURE`: Sampling temperature (default: provider default)
    /// - `COLLOQUY_STREAM_IDLE_TIMEOUT_SECS`: Stream idle timeout (default: 60)
    /// - `COLLOQUY_FEATURED_PARTS`: `title=part` pairs (default: none)
    pub fn from_env() -> ColloquyResult<Self> {
        let defaults = Self::default();

        let model = std::env::var("COLLOQUY_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.model);

        let max_tokens = parse_env("COLLOQUY_MAX_TOKENS")?.unwrap_or(defaults.max_tokens);

        let temperature = parse_env::<f32>("COLLOQUY_TEMPERATURE")?;

        let stream_idle_timeout = parse_env::<u64>("COLLOQUY_STREAM_IDLE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.stream_idle_timeout);

        let featured_parts = match std::env::var("COLLOQUY_FEATURED_PARTS") {
            Ok(raw) => FeaturedParts::parse(&raw)?,
            Err(_) => defaults.featured_parts,
        };

        let config = Self {
            model,
            max_tokens,
            temperature,
            stream_idle_timeout,
            featured_parts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every turn fail.
    pub fn validate(&self) -> ColloquyResult<()> {
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "COLLOQUY_MAX_TOKENS".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.stream_idle_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "COLLOQUY_STREAM_IDLE_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Parse an optional environment variable, rejecting unparseable values.
pub fn parse_env<T>(key: &str) -> ColloquyResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| {
                ColloquyError::from(ConfigError::InvalidValue {
                    field: key.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.stream_idle_timeout, Duration::from_secs(60));
        assert!(config.featured_parts.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_idle_timeout_is_rejected() {
        let config = EngineConfig {
            stream_idle_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        let err = config.validate().expect_err("zero timeout must be rejected");
        assert!(matches!(
            err,
            ColloquyError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "COLLOQUY_STREAM_IDLE_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn test_zero_max_tokens_is_rejected() {
        let config = EngineConfig {
            max_tokens: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_featured_parts_parse() {
        let parts = FeaturedParts::parse("Gitanjali=35, stray birds = 2").expect("should parse");
        assert_eq!(parts.lookup("gitanjali"), Some(35));
        assert_eq!(parts.lookup("Song Offerings (Gitanjali)"), Some(35));
        assert_eq!(parts.lookup("Stray Birds"), Some(2));
        assert_eq!(parts.lookup("The Gardener"), None);
    }

    #[test]
    fn test_featured_parts_empty_input() {
        let parts = FeaturedParts::parse("").expect("empty should parse");
        assert!(parts.is_empty());
    }

    #[test]
    fn test_featured_parts_rejects_garbage() {
        assert!(FeaturedParts::parse("gitanjali").is_err());
        assert!(FeaturedParts::parse("gitanjali=thirty").is_err());
        assert!(FeaturedParts::parse("=3").is_err());
    }
}
