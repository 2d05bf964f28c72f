use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_currencies_ttl")]
    pub currencies_ttl_secs: u64,
    #[serde(default = "default_amounts_ttl")]
    pub amounts_ttl_secs: u64,
}

fn default_currencies_ttl() -> u64 {
    300
}

fn default_amounts_ttl() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            currencies_ttl_secs: default_currencies_ttl(),
            amounts_ttl_secs: default_amounts_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn currencies_ttl(&self) -> Duration {
        Duration::from_secs(self.currencies_ttl_secs)
    }

    pub fn amounts_ttl(&self) -> Duration {
        Duration::from_secs(self.amounts_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "pricegate", "pricegate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
