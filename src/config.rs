//! Runtime settings
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `KC_`-prefixed environment variables. Command-line flags are applied on top
//! by the binary.

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collectors::CollectorOptions;
use crate::collectors::platform::linux::PROC_NET_DEV;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "kaipo-counters.toml";
/// Prefix for environment overrides, e.g. `KC_INTERVAL_SECS=5`
pub const ENV_PREFIX: &str = "KC";

const MAX_INTERVAL_SECS: u64 = 3600;

/// How samples are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned table with human-readable totals
    Text,
    /// One JSON document per collection
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between collections in watch mode
    pub interval_secs: u64,
    /// Upper bound on a single collection in watch mode
    pub collect_timeout_ms: u64,
    pub format: OutputFormat,
    /// `net/dev` table read on Linux
    pub proc_net_dev_path: PathBuf,
    /// env_logger filter used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            collect_timeout_ms: 2000,
            format: OutputFormat::Text,
            proc_net_dev_path: PathBuf::from(PROC_NET_DEV),
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (required when given) or the default file
    /// (optional), then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 || self.interval_secs > MAX_INTERVAL_SECS {
            bail!(
                "interval_secs must be between 1 and {} (got {})",
                MAX_INTERVAL_SECS,
                self.interval_secs
            );
        }
        if self.collect_timeout_ms == 0 {
            bail!("collect_timeout_ms must be greater than zero");
        }
        if self.proc_net_dev_path.as_os_str().is_empty() {
            bail!("proc_net_dev_path must not be empty");
        }
        if self.log_level.trim().is_empty() {
            bail!("log_level must not be empty");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }

    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            proc_net_dev_path: self.proc_net_dev_path.clone(),
        }
    }
}
