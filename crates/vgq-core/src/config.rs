use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/vgq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VgqConfig {
    /// Maximum number of worker units running jobs concurrently.
    pub max_workers: usize,
    /// Host substrings a submitted page link must match. Empty = reject all
    /// submissions, so a fresh install never accepts arbitrary links.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// HTTP forward proxies (`host:port`), rotated per job execution.
    /// Empty = direct connection.
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Timeout for the page scrape request, in seconds.
    pub scrape_timeout_secs: u64,
    /// Overall deadline for one media download, in seconds.
    pub download_timeout_secs: u64,
}

impl Default for VgqConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            allowed_hosts: Vec::new(),
            proxies: Vec::new(),
            scrape_timeout_secs: 20,
            download_timeout_secs: 90,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vgq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VgqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VgqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VgqConfig = toml::from_str(&data)?;
    Ok(cfg)
}
