//! Configuration Module - Stream Limits
//!
//! Limits protect readers from hostile input: nesting depth bounds the
//! recursion of the decoder, and `max_length` bounds any single definite
//! length before a buffer is sliced for it.

use crate::error::ConfigError;

/// Default nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Default largest definite length (64 MiB)
pub const DEFAULT_MAX_LENGTH: usize = 64 * 1024 * 1024;

/// Upper bound accepted for `max_depth`
pub const MAX_DEPTH_LIMIT: usize = 16 * 1024;

/// Stream settings
///
/// # Examples
///
/// ```rust
/// use rser_stream::StreamConfig;
///
/// let config = StreamConfig {
///     omit_defaults: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Deepest value nesting a stream will enter
    pub max_depth: usize,

    /// Largest definite length a reader will accept
    pub max_length: usize,

    /// Writers skip members equal to their declared default
    pub omit_defaults: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_length: DEFAULT_MAX_LENGTH,
            omit_defaults: false,
        }
    }
}

impl StreamConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(
                "max_depth must be > 0".to_string(),
            ));
        }

        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::InvalidMaxDepth(format!(
                "max_depth must be <= {}",
                MAX_DEPTH_LIMIT
            )));
        }

        if self.max_length == 0 {
            return Err(ConfigError::InvalidMaxLength(
                "max_length must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with:
    /// - RSER_MAX_DEPTH
    /// - RSER_MAX_LENGTH
    /// - RSER_OMIT_DEFAULTS
    ///
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply environment overrides on top of `self`
    pub fn with_env(mut self) -> Self {
        if let Ok(val) = std::env::var("RSER_MAX_DEPTH") {
            if let Ok(depth) = val.parse::<usize>() {
                self.max_depth = depth;
            }
        }

        if let Ok(val) = std::env::var("RSER_MAX_LENGTH") {
            if let Ok(length) = val.parse::<usize>() {
                self.max_length = length;
            }
        }

        if let Ok(val) = std::env::var("RSER_OMIT_DEFAULTS") {
            self.omit_defaults = val == "1" || val.eq_ignore_ascii_case("true");
        }

        self
    }
}
