//! Settings: defaults, `~/.tidings/config.toml`, then command-line flags.

use crate::Cli;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tidings_core::Decision;

/// Returns the tidings home directory, or None if the user's home cannot be resolved.
pub fn tidings_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("TIDINGS_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".tidings"))
}

/// Default settings file: ~/.tidings/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    tidings_home().map(|h| h.join("config.toml"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ask on stdin when a problem needs a decision.
    pub interactive: bool,
    /// Answer used when nobody can be asked; `None` keeps each caller's default.
    pub unattended_decision: Option<Decision>,
    /// Colored terminal output.
    pub color: bool,
    /// Dispatch diagnostics on stderr.
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interactive: true,
            unattended_decision: None,
            color: true,
            verbose: false,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Resolve the settings for `cli`: explicit `--config` or the default
    /// location, then flag overrides.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match cli.config.clone().or_else(default_config_path) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        settings.apply_flags(cli);
        Ok(settings)
    }

    /// Command-line flags win over the file.
    pub fn apply_flags(&mut self, cli: &Cli) {
        if cli.non_interactive {
            self.interactive = false;
        }
        if let Some(decision) = cli.decision {
            self.unattended_decision = Some(decision);
        }
        if cli.no_color {
            self.color = false;
        }
        if cli.verbose {
            self.verbose = true;
        }
    }
}
