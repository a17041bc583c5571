use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::ledger::RetentionPolicy;
use crate::parser::extract::Markers;

const DEFAULT_URL: &str = "https://myanimelist.net/topanime.php";
const DEFAULT_LEDGER_PATH: &str = "data/scores.json";
const CONFIG_FILE: &str = "rank_tracker";
const ENV_PREFIX: &str = "RANK_TRACKER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub ledger_path: PathBuf,
    pub policy: RetentionPolicy,
    /// Extra attempts after a transport failure; 0 disables retrying.
    pub fetch_retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
    pub markers: Markers,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            policy: RetentionPolicy::default(),
            fetch_retries: 3,
            backoff_ms: 2000,
            user_agent: concat!("rank_tracker/", env!("CARGO_PKG_VERSION")).into(),
            markers: Markers::default(),
        }
    }
}

impl Settings {
    /// Defaults, then `rank_tracker.toml` if present, then `RANK_TRACKER_*` env vars.
    pub fn load() -> Result<Self> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("_")
                        .separator("__"),
                ),
        )
    }

    fn from_config(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}
