//! Manager configuration.
//!
//! Normally built in code with [`ManagerConfig::new`]; the CLI can also read
//! it from a TOML file:
//!
//! ```toml
//! extensions_dir = "plugins/extensions"
//! archive_extension = "jar"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where bundles live and how they are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Directory scanned for bundles; also the parent of every data directory.
    pub extensions_dir: PathBuf,
    /// Archive suffix without the dot.
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
}

fn default_archive_extension() -> String {
    crate::DEFAULT_ARCHIVE_EXTENSION.to_string()
}

impl ManagerConfig {
    /// Configuration for `extensions_dir` with the default archive suffix.
    pub fn new(extensions_dir: impl Into<PathBuf>) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
            archive_extension: default_archive_extension(),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.archive_extension = config.archive_extension.trim_start_matches('.').to_string();
        Ok(config)
    }

    /// Read and parse a TOML file. A relative `extensions_dir` is resolved
    /// against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if config.extensions_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.extensions_dir = parent.join(&config.extensions_dir);
            }
        }
        Ok(config)
    }

    /// Data directory for one extension.
    pub fn data_dir_for(&self, name: &str) -> PathBuf {
        self.extensions_dir.join(name)
    }
}
