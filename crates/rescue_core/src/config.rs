use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "petsos.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub media_root: PathBuf,
    pub bucket: String,
    pub public_base_url: String,
    pub fetch_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("petsos.db"),
            media_root: PathBuf::from("media"),
            bucket: "reports".to_string(),
            public_base_url: "file://media".to_string(),
            fetch_limit: 100,
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        if config.fetch_limit == 0 {
            anyhow::bail!("fetch_limit must be at least 1");
        }
        if config.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be at least 1");
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
