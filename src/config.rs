use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::history::DEFAULT_DAYS_BACK;

/// Base path for all revq data (state, logs, config).
pub fn revq_home() -> PathBuf {
    dirs_base().join(".revq")
}

fn dirs_base() -> PathBuf {
    std::env::var("USERPROFILE")
        .or_else(|_| std::env::var("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Expand a leading `~/` against the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_base().join(rest),
        None => PathBuf::from(path),
    }
}

/// How often the tick event fires (ms).
pub const TICK_RATE_MS: u64 = 250;

/// Review-request poll interval (ms).
pub const REFRESH_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Days shown in the activity heatmap (26 weeks).
pub const HEATMAP_DAYS: u32 = 182;

/// Upper bound for `heatmap_days` (about ten years).
pub const MAX_HEATMAP_DAYS: u32 = 3660;

pub const LOG_FILE: &str = "revq.log";

// ---------------------------------------------------------------------------
// Config file (~/.revq/config.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub refresh: Option<RefreshConfig>,
    pub sync: Option<SyncConfig>,
    pub tracking: Option<TrackingConfig>,
    pub display: Option<DisplayConfig>,
    pub storage: Option<StorageConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshConfig {
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    /// Lookback window for sync and resync. Default: 90.
    pub days_back: Option<u32>,
    /// Sync once per day when the dashboard starts. Default: true.
    pub auto_sync_on_startup: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TrackingConfig {
    /// Record a local "viewed" event when a PR is opened. Default: true.
    pub record_views: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    pub tick_rate: Option<u64>,
    pub heatmap_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// tracing filter directive, e.g. "info" or "revq=debug". Default: "info".
    pub level: Option<String>,
}

impl Config {
    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh
            .as_ref()
            .and_then(|r| r.interval_ms)
            .unwrap_or(REFRESH_INTERVAL_MS)
    }

    pub fn sync_days_back(&self) -> u32 {
        self.sync
            .as_ref()
            .and_then(|s| s.days_back)
            .unwrap_or(DEFAULT_DAYS_BACK)
    }

    pub fn auto_sync_on_startup(&self) -> bool {
        self.sync
            .as_ref()
            .and_then(|s| s.auto_sync_on_startup)
            .unwrap_or(true)
    }

    pub fn record_views(&self) -> bool {
        self.tracking
            .as_ref()
            .and_then(|t| t.record_views)
            .unwrap_or(true)
    }

    pub fn tick_rate(&self) -> u64 {
        self.display
            .as_ref()
            .and_then(|d| d.tick_rate)
            .unwrap_or(TICK_RATE_MS)
    }

    pub fn heatmap_days(&self) -> u32 {
        self.display
            .as_ref()
            .and_then(|d| d.heatmap_days)
            .unwrap_or(HEATMAP_DAYS)
            .clamp(1, MAX_HEATMAP_DAYS)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.as_deref())
            .map(expand_home)
            .unwrap_or_else(revq_home)
    }

    pub fn log_level(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }
}

pub fn default_config_path() -> PathBuf {
    revq_home().join("config.toml")
}

/// Load config from `path`. A missing file yields defaults; a malformed one is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
