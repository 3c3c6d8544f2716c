//! Configuration for the time-series store.

use serde::{Deserialize, Serialize};

/// Chunking and compression settings for written series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Locations per inner chunk of a time series.
    pub series_chunk_locations: usize,

    /// Time steps per inner chunk of a time series.
    pub series_chunk_time: usize,

    /// Chunk edge for static (single time step) fields such as elevation.
    pub static_chunk_size: usize,

    /// Locations per shard. `0` disables sharding.
    pub shard_locations: usize,

    /// Compression codec.
    pub compression: StoreCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            series_chunk_locations: 6,
            series_chunk_time: 183,
            static_chunk_size: 20,
            shard_locations: 6000,
            compression: StoreCompression::BloscZstd,
            compression_level: 3,
            shuffle: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SERIES_CHUNK_LOCATIONS") {
            if let Ok(size) = val.parse() {
                config.series_chunk_locations = size;
            }
        }

        if let Ok(val) = std::env::var("SERIES_CHUNK_TIME") {
            if let Ok(size) = val.parse() {
                config.series_chunk_time = size;
            }
        }

        if let Ok(val) = std::env::var("SERIES_SHARD_LOCATIONS") {
            if let Ok(size) = val.parse() {
                config.shard_locations = size;
            }
        }

        if let Ok(val) = std::env::var("SERIES_COMPRESSION") {
            config.compression = StoreCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("SERIES_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("SERIES_SHUFFLE") {
            config.shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.series_chunk_locations == 0 || self.series_chunk_time == 0 {
            return Err("series chunk dimensions must be > 0".to_string());
        }

        if self.static_chunk_size == 0 {
            return Err("static_chunk_size must be > 0".to_string());
        }

        if self.compression_level == 0 || self.compression_level > 9 {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Compression codec for series arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl StoreCompression {
    /// Parse from string (case-insensitive). Unknown names fall back to Blosc/Zstd.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            _ => Self::BloscZstd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for StoreCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.series_chunk_locations, 6);
        assert_eq!(config.series_chunk_time, 183);
    }

    #[test]
    fn test_rejects_bad_level() {
        let config = StoreConfig {
            compression_level: 12,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!(StoreCompression::from_str("NONE"), StoreCompression::None);
        assert_eq!(StoreCompression::from_str("lz4"), StoreCompression::BloscLz4);
        assert_eq!(StoreCompression::from_str("whatever"), StoreCompression::BloscZstd);
    }
}
