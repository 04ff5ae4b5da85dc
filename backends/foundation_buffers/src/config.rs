//! Workload configuration read from a TOML file.
//!
//! ```toml
//! capacity = 5
//! producers = 2
//! consumers = 2
//! strategy = "semaphore"   # monitor | condition | semaphore
//! values = 10              # values produced by each producer
//! mode = "timed"           # blocking | nonblocking | timed
//! timeout_ms = 100
//! backoff_ms = 1
//! ```
//!
//! Only `capacity`, `producers` and `consumers` are required.

use core::fmt;
use core::str::FromStr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffers::Strategy;
use crate::errors::{ConfigError, ConfigResult};

const DEFAULT_VALUES: usize = 10;
const DEFAULT_TIMEOUT_MS: u64 = 100;
const DEFAULT_BACKOFF_MS: u64 = 1;

/// Which pair of buffer operations the producers and consumers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// `put` / `get`
    #[default]
    Blocking,
    /// `add` / `remove`, retried after a back-off when full or empty
    NonBlocking,
    /// `offer` / `poll` with a per-attempt deadline, retried on timeout
    Timed,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Self::Blocking, Self::NonBlocking, Self::Timed];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::NonBlocking => "nonblocking",
            Self::Timed => "timed",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownMode(s.to_string()))
    }
}

fn default_values() -> usize {
    DEFAULT_VALUES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub mode: Mode,

    /// Values produced by each producer.
    #[serde(default = "default_values")]
    pub values: usize,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl BufferConfig {
    /// Builds a validated configuration with default mode, values and timings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the values are inconsistent, see
    /// [`BufferConfig::validate`].
    pub fn new(
        capacity: usize,
        producers: usize,
        consumers: usize,
        strategy: Strategy,
    ) -> ConfigResult<Self> {
        let config = Self {
            capacity,
            producers,
            consumers,
            strategy,
            mode: Mode::default(),
            values: DEFAULT_VALUES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid TOML for this schema,
    /// or does not pass [`BufferConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading buffer configuration");

        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Checks the invariants a workload relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the capacity is 0, or if exactly one
    /// of producers and consumers is 0 (values would never be consumed, or
    /// consumers would wait forever), or if `producers * values` does not
    /// fit in a `usize`.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be > 0"));
        }
        if self.producers == 0 && self.consumers > 0 {
            return Err(ConfigError::Invalid("consumers need at least one producer"));
        }
        if self.consumers == 0 && self.producers > 0 {
            return Err(ConfigError::Invalid("producers need at least one consumer"));
        }
        if self.producers.checked_mul(self.values).is_none() {
            return Err(ConfigError::Invalid("producers * values overflows"));
        }
        if self.mode == Mode::Timed && self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timed mode needs timeout_ms > 0"));
        }
        Ok(())
    }

    /// Total number of values the producers will insert.
    ///
    /// Only meaningful on a validated config.
    #[must_use]
    pub fn total_values(&self) -> usize {
        self.producers * self.values
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl FromStr for BufferConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
