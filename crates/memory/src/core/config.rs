//! Pool configuration
//!
//! [`PoolConfig`] follows the usual preset + fluent builder shape: start from
//! [`PoolConfig::default`], one of the presets, or [`PoolConfig::from_env`],
//! then adjust individual fields and [`validate`](PoolConfig::validate).

use std::env;
use std::str::FromStr;

#[cfg(feature = "logging")]
use tracing::debug;

use super::types::{bin, pattern};
use crate::error::{MemoryError, MemoryResult};

/// Environment variable overriding [`PoolConfig::min_bin_size`]
pub const ENV_MIN_BIN_SIZE: &str = "MEM_POOL_MIN_BIN_SIZE";
/// Environment variable overriding [`PoolConfig::zero_by_default`]
pub const ENV_ZERO_BY_DEFAULT: &str = "MEM_POOL_ZERO_BY_DEFAULT";
/// Environment variable overriding [`PoolConfig::release_pattern`]
///
/// Accepts a decimal or `0x`-prefixed hex byte, or `none` to disable.
pub const ENV_RELEASE_PATTERN: &str = "MEM_POOL_RELEASE_PATTERN";

/// Configuration for a [`Pool`](crate::pool::Pool)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Minimum capacity of newly created bins. A bin is created with
    /// `max(requested size, min_bin_size)` bytes.
    pub min_bin_size: usize,

    /// Whether [`Pool::allocate_default`](crate::pool::Pool::allocate_default)
    /// hands out zero-filled memory
    pub zero_by_default: bool,

    /// Fill pattern written over bytes released by a temporary-memory rollback
    /// (for debugging)
    pub release_pattern: Option<u8>,

    /// Human-readable label used in logs and diagnostics
    pub name: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_bin_size: bin::DEFAULT_MIN_BIN_SIZE,
            zero_by_default: false,
            release_pattern: if cfg!(debug_assertions) {
                Some(pattern::RELEASED)
            } else {
                None
            },
            name: None,
        }
    }
}

impl PoolConfig {
    /// Creates the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Production configuration - no debug fills
    #[must_use]
    pub fn production() -> Self {
        Self {
            min_bin_size: bin::DEFAULT_MIN_BIN_SIZE,
            zero_by_default: false,
            release_pattern: None,
            name: None,
        }
    }

    /// Debug configuration - zeroed allocations and poisoned rollbacks
    #[must_use]
    pub fn debug() -> Self {
        Self {
            min_bin_size: bin::DEFAULT_MIN_BIN_SIZE,
            zero_by_default: true,
            release_pattern: Some(pattern::RELEASED),
            name: None,
        }
    }

    /// Small bins for pools holding a handful of short-lived records
    #[must_use]
    pub fn small() -> Self {
        Self {
            min_bin_size: bin::SMALL_MIN_BIN_SIZE,
            ..Self::default()
        }
    }

    /// Large bins for bulk scratch memory
    #[must_use]
    pub fn large() -> Self {
        Self {
            min_bin_size: bin::LARGE_MIN_BIN_SIZE,
            ..Self::production()
        }
    }

    /// Sets the minimum bin capacity
    #[must_use = "builder methods must be chained or built"]
    pub fn with_min_bin_size(mut self, min_bin_size: usize) -> Self {
        self.min_bin_size = min_bin_size;
        self
    }

    /// Sets whether default allocations are zero-filled
    #[must_use = "builder methods must be chained or built"]
    pub fn with_zero_by_default(mut self, zero: bool) -> Self {
        self.zero_by_default = zero;
        self
    }

    /// Sets the rollback fill pattern
    #[must_use = "builder methods must be chained or built"]
    pub fn with_release_pattern(mut self, pattern: Option<u8>) -> Self {
        self.release_pattern = pattern;
        self
    }

    /// Sets the pool label
    #[must_use = "builder methods must be chained or built"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> MemoryResult<()> {
        if self.min_bin_size == 0 {
            return Err(MemoryError::invalid_config("min_bin_size must be non-zero"));
        }

        if self.min_bin_size > bin::MAX_MIN_BIN_SIZE {
            return Err(MemoryError::invalid_config(format!(
                "min_bin_size {} exceeds maximum {}",
                self.min_bin_size,
                bin::MAX_MIN_BIN_SIZE
            )));
        }

        Ok(())
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their default values. The result is validated.
    pub fn from_env() -> MemoryResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup
    ///
    /// This is what [`from_env`](Self::from_env) uses under the hood; it lets
    /// callers feed values from their own configuration layer.
    pub fn from_lookup<F>(lookup: F) -> MemoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MIN_BIN_SIZE) {
            config.min_bin_size = parse_var(ENV_MIN_BIN_SIZE, &value)?;
        }

        if let Some(value) = lookup(ENV_ZERO_BY_DEFAULT) {
            config.zero_by_default = parse_var(ENV_ZERO_BY_DEFAULT, &value)?;
        }

        if let Some(value) = lookup(ENV_RELEASE_PATTERN) {
            config.release_pattern = parse_pattern(&value)?;
        }

        #[cfg(feature = "logging")]
        debug!(?config, "loaded pool configuration");

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> MemoryResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MemoryError::invalid_config(format!("invalid {key}: {value:?}")))
}

fn parse_pattern(value: &str) -> MemoryResult<Option<u8>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map(Some).map_err(|_| {
        MemoryError::invalid_config(format!("invalid {ENV_RELEASE_PATTERN}: {value:?}"))
    })
}
