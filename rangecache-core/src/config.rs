//! Configuration types

use crate::error::{CacheError, CacheResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SLOW_LOCK_THRESHOLD_MS: u64 = 500;
const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Whether per-list range locks actually serialize access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RangeLocking {
    /// Waiters queue per list until the holder releases.
    #[default]
    Serialized,
    /// Acquire returns immediately. Only sound for single-actor engines.
    Disabled,
}

impl RangeLocking {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeLocking::Serialized => "serialized",
            RangeLocking::Disabled => "disabled",
        }
    }
}

impl fmt::Display for RangeLocking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeLocking {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serialized" => Ok(RangeLocking::Serialized),
            "disabled" => Ok(RangeLocking::Disabled),
            _ => Err(ConfigError::InvalidValue {
                field: "range_locking".to_string(),
                value: s.to_string(),
                reason: "expected 'serialized' or 'disabled'".to_string(),
            }),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub range_locking: RangeLocking,
    /// Lock waits longer than this are logged as warnings.
    pub slow_lock_threshold: Duration,
    /// Upper clamp on the count of a single range read.
    pub max_page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            range_locking: RangeLocking::default(),
            slow_lock_threshold: Duration::from_millis(DEFAULT_SLOW_LOCK_THRESHOLD_MS),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `RANGECACHE_RANGE_LOCKING`: `serialized` or `disabled` (default: serialized)
    /// - `RANGECACHE_SLOW_LOCK_THRESHOLD_MS`: slow lock warning threshold (default: 500)
    /// - `RANGECACHE_MAX_PAGE_SIZE`: max entities per range read (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            range_locking: std::env::var("RANGECACHE_RANGE_LOCKING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.range_locking),
            slow_lock_threshold: std::env::var("RANGECACHE_SLOW_LOCK_THRESHOLD_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_lock_threshold),
            max_page_size: std::env::var("RANGECACHE_MAX_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_page_size),
        }
    }

    pub fn with_range_locking(mut self, range_locking: RangeLocking) -> Self {
        self.range_locking = range_locking;
        self
    }

    pub fn with_slow_lock_threshold(mut self, threshold: Duration) -> Self {
        self.slow_lock_threshold = threshold;
        self
    }

    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = max;
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.slow_lock_threshold.is_zero() {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "slow_lock_threshold".to_string(),
                value: format!("{:?}", self.slow_lock_threshold),
                reason: "slow_lock_threshold must be positive".to_string(),
            }));
        }

        if self.max_page_size == 0 {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "max_page_size".to_string(),
                value: self.max_page_size.to_string(),
                reason: "max_page_size must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.range_locking, RangeLocking::Serialized);
        assert_eq!(config.max_page_size, 1000);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = CacheConfig::new().with_max_page_size(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            CacheError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "max_page_size"
        ));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = CacheConfig::new().with_slow_lock_threshold(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_range_locking_parse() {
        assert_eq!("Serialized".parse::<RangeLocking>().unwrap(), RangeLocking::Serialized);
        assert_eq!("disabled".parse::<RangeLocking>().unwrap(), RangeLocking::Disabled);
        assert!("sometimes".parse::<RangeLocking>().is_err());
    }

    #[test]
    fn test_config_deserializes() {
        let json = r#"{
            "range_locking": "Disabled",
            "slow_lock_threshold": {"secs": 1, "nanos": 0},
            "max_page_size": 50
        }"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.range_locking, RangeLocking::Disabled);
        assert_eq!(config.slow_lock_threshold, Duration::from_secs(1));
        assert_eq!(config.max_page_size, 50);
    }
}
