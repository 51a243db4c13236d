//! Storage configuration

use colloquy_core::config::parse_env;
use colloquy_core::ColloquyResult;
use std::path::PathBuf;

/// Where and how large the LMDB transcript environment is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub map_size_mb: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/transcripts"),
            map_size_mb: 256,
        }
    }
}

impl StorageConfig {
    /// Create StorageConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COLLOQUY_DATA_DIR`: LMDB directory (default: ./data/transcripts)
    /// - `COLLOQUY_LMDB_MAP_SIZE_MB`: Map size in megabytes (default: 256)
    pub fn from_env() -> ColloquyResult<Self> {
        let defaults = Self::default();
        let path = std::env::var("COLLOQUY_DATA_DIR")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.path);
        let map_size_mb = parse_env("COLLOQUY_LMDB_MAP_SIZE_MB")?.unwrap_or(defaults.map_size_mb);
        Ok(Self { path, map_size_mb })
    }
}
