//! `rsert.toml`
//!
//! Holds the stream limits every command runs with and the parallelism of
//! `rsert check`. Missing tables and keys fall back to their defaults, and
//! the `RSER_*` variables still win over whatever the file says.
//!
//! ```toml
//! [stream]
//! max_depth = 512
//! max_length = 67108864
//! omit_defaults = false
//!
//! [check]
//! jobs = 8
//! ```

use rser_stream::StreamConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RsertError, Result};

pub const CONFIG_FILE_NAME: &str = "rsert.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamSection,

    #[serde(default)]
    pub check: CheckSection,
}

/// `[stream]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamSection {
    /// Deepest nesting a stream will enter.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Largest definite length a reader will accept.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Leave members equal to their default out of encoded output.
    #[serde(default)]
    pub omit_defaults: bool,
}

/// `[check]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSection {
    /// Files checked at once; one per CPU unless set.
    #[serde(default = "num_cpus::get")]
    pub jobs: usize,
}

fn default_max_depth() -> usize {
    rser_stream::DEFAULT_MAX_DEPTH
}

fn default_max_length() -> usize {
    rser_stream::DEFAULT_MAX_LENGTH
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_length: default_max_length(),
            omit_defaults: false,
        }
    }
}

impl Default for CheckSection {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
        }
    }
}

/// Places `rsert.toml` is looked for, first match wins
fn search_path() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".config").join("rsert").join(CONFIG_FILE_NAME));
    }
    if let Some(system) = dirs::config_dir() {
        candidates.push(system.join("rsert").join(CONFIG_FILE_NAME));
    }
    candidates
}

impl Config {
    /// The first `rsert.toml` on the search path, or the defaults.
    ///
    /// Looked up in the working directory, then `~/.config/rsert/`, then
    /// the platform config directory.
    pub fn load() -> Result<Self> {
        match search_path().into_iter().find(|candidate| candidate.is_file()) {
            Some(found) => Self::load_from_path(&found),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RsertError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = toml::from_str(&text)
            .map_err(|e| RsertError::Config(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("using configuration {}", path.display());
        Ok(config)
    }

    /// Write as TOML, creating missing parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| RsertError::Config(format!("cannot serialize configuration: {}", e)))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    /// `[stream]` as a validated [`StreamConfig`], environment applied.
    pub fn stream_config(&self) -> Result<StreamConfig> {
        let config = StreamConfig {
            max_depth: self.stream.max_depth,
            max_length: self.stream.max_length,
            omit_defaults: self.stream.omit_defaults,
        }
        .with_env();

        config
            .validate()
            .map_err(|e| RsertError::Config(e.to_string()))?;
        Ok(config)
    }
}
