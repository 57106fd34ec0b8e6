use crate::crawl::FetchConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "quarry";
const CONFIG_FILE: &str = "config.json";

/// Defaults for a run, stored in the app config directory.
/// Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Worker threads when multithreading is requested without a count
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Pages crawled when `--limit` is not given
    #[serde(default = "default_crawl_limit")]
    pub crawl_limit: usize,

    #[serde(default = "default_fetch_redirects")]
    pub fetch_redirects: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_threads() -> usize {
    5
}

fn default_crawl_limit() -> usize {
    50
}

fn default_fetch_redirects() -> usize {
    3
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("quarry/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            crawl_limit: default_crawl_limit(),
            fetch_redirects: default_fetch_redirects(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Load config from the app config directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save config to the app config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Resolve a requested thread count; 0 means "use the configured default".
    pub fn effective_threads(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(threads) if threads > 0 => threads,
            _ => self.threads.max(1),
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            redirects: self.fetch_redirects,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_config_dir()?.join(CONFIG_FILE))
}

/// Per-user configuration directory for the application
pub fn get_app_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join(APP_NAME))
}
