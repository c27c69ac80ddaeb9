//! Run configuration.
//!
//! Run inputs come from the environment, named the way GitHub Actions
//! exposes action inputs (`INPUT_<NAME>`). Settings that rarely change live
//! in an optional TOML file: `$REUPLOAD_CONFIG`, or `reupload.toml` in the
//! working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reupload_browser::LaunchOptions;
use reupload_pipeline::RunInputs;
use reupload_protocol::PortalEndpoints;
use reupload_protocol::constants::{DEFAULT_HOST, DEFAULT_NAVIGATION_TIMEOUT};
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "REUPLOAD_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "reupload.toml";

/// Settings file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base host; the portal, its API and the forum are subdomains of it.
    #[serde(default = "default_host")]
    pub host: String,

    /// Raise the default log filter to debug for this tool.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// `[browser]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chrome/Chromium binary. Searched on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Trust the environment to provide a browser (no lookup or checks).
    #[serde(default)]
    pub skip_setup: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_true() -> bool {
    true
}

fn default_args() -> Vec<String> {
    LaunchOptions::default().args
}

fn default_navigation_timeout() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT.as_secs()
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_true(),
            args: default_args(),
            navigation_timeout_secs: default_navigation_timeout(),
            skip_setup: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            debug: false,
            browser: BrowserConfig::default(),
        }
    }
}

impl Config {
    /// Loads the settings file, or defaults if there is none.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn endpoints(&self) -> PortalEndpoints {
        PortalEndpoints::for_host(&self.host)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            executable: self.browser.executable.clone(),
            headless: self.browser.headless,
            args: self.browser.args.clone(),
            navigation_timeout: Duration::from_secs(self.browser.navigation_timeout_secs),
            skip_setup: self.browser.skip_setup,
        }
    }
}

/// Settings file path.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Whether the runner asked for debug logging (`RUNNER_DEBUG=1`).
pub fn runner_debug() -> bool {
    std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1")
}

/// Reads the run inputs from the environment.
pub fn inputs_from_env() -> RunInputs {
    inputs_from(|name| std::env::var(name).ok())
}

/// Builds run inputs from `lookup`. Missing inputs are empty and
/// surrounding whitespace is dropped; the chunk size stays unparsed.
fn inputs_from(lookup: impl Fn(&str) -> Option<String>) -> RunInputs {
    let input = |name: &str| {
        lookup(&format!("INPUT_{}", name.to_uppercase()))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    RunInputs {
        asset_id: input("assetId"),
        zip_path: PathBuf::from(input("zipPath")),
        chunk_size: input("chunkSize"),
        cookie: input("cookie"),
    }
}
