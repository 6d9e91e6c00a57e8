//! Configuration for the famphoto CLI.
//!
//! Stored in ~/.famphoto/config.yaml:
//!
//! ```yaml
//! database: /home/me/.famphoto/catalog.redb
//! cluster:
//!   eps: 0.5
//!   min_samples: 5
//!   metric: euclidean
//!   strategy: density
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use famphoto_faceid::ClusterConfig;
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".famphoto";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Default catalog filename, next to the config file.
pub const DEFAULT_DATABASE_FILE: &str = "catalog.redb";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog database path (optional, defaults to ~/.famphoto/catalog.redb).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl AppConfig {
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Configured database path, or the default one.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.database {
            Some(p) => Ok(p.clone()),
            None => Self::default_dir()
                .map(|dir| dir.join(DEFAULT_DATABASE_FILE))
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory")),
        }
    }
}

/// Loads the configuration.
///
/// A missing default config file yields defaults. A custom path must exist.
pub fn load_config(custom_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = match custom_path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match AppConfig::default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(AppConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: AppConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    cfg.cluster
        .validate()
        .with_context(|| format!("invalid cluster section in {}", path.display()))?;
    Ok(cfg)
}
