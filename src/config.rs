//! Harness configuration
//!
//! One YAML document with a section per subsystem. Every field has a
//! default, so a partial file (or none at all) is a valid configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use trezor_emulator_controller::TrezorControllerConfig;
use window_manager::{WebDriverConfig, WindowManagerConfig};

pub const ENV_WEBDRIVER_URL: &str = "WALLET_E2E_WEBDRIVER_URL";
pub const ENV_BROWSER: &str = "WALLET_E2E_BROWSER";
pub const ENV_TREZOR_URL: &str = "WALLET_E2E_TREZOR_URL";
pub const ENV_HEADLESS: &str = "WALLET_E2E_HEADLESS";
pub const ENV_LOG: &str = "WALLET_E2E_LOG";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub webdriver: WebDriverConfig,
    pub windows: WindowManagerConfig,
    /// Emulator control server; `None` runs without a hardware wallet.
    pub trezor: Option<TrezorControllerConfig>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            ansi: true,
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse harness config")
    }

    /// Applies `WALLET_E2E_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_WEBDRIVER_URL) {
            self.webdriver.url = url;
        }
        if let Some(browser) = lookup(ENV_BROWSER) {
            self.webdriver.browser_name = browser;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            match parse_flag(&raw) {
                Some(headless) => self.webdriver.headless = headless,
                None => warn!(value = %raw, "ignoring unrecognised {ENV_HEADLESS}"),
            }
        }
        if let Some(url) = lookup(ENV_TREZOR_URL) {
            self.trezor.get_or_insert_with(TrezorControllerConfig::default).url = url;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Priority: explicit path > ./config/harness.yaml >
/// <config_dir>/wallet-e2e/harness.yaml. Without a config directory the
/// local path is kept, which then loads as defaults when absent.
fn resolve_config_path(explicit: Option<&Path>, config_dir: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local_config = PathBuf::from("config/harness.yaml");
    if local_config.exists() {
        return local_config;
    }
    match config_dir {
        Some(mut path) => {
            path.push("wallet-e2e");
            path.push("harness.yaml");
            path
        }
        None => {
            warn!("No user config directory; looking for {}", local_config.display());
            local_config
        }
    }
}

pub struct LoadedConfig {
    pub config: HarnessConfig,
    pub path: PathBuf,
}

/// Resolves and reads the harness config, then applies environment
/// overrides. A missing file yields the defaults.
pub async fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let config_path = resolve_config_path(config_path, dirs::config_dir());

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config = HarnessConfig::from_yaml(&content)?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        HarnessConfig::default()
    };
    config.apply_env_overrides();

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn overrides_replace_configured_values() {
        let mut config = HarnessConfig::default();
        config.apply_overrides(lookup(&[
            (ENV_WEBDRIVER_URL, "http://grid:4444"),
            (ENV_BROWSER, "firefox"),
            (ENV_HEADLESS, "Yes"),
            (ENV_LOG, "debug,window-manager=trace"),
        ]));

        assert_eq!(config.webdriver.url, "http://grid:4444");
        assert_eq!(config.webdriver.browser_name, "firefox");
        assert!(config.webdriver.headless);
        assert_eq!(config.logging.level, "debug,window-manager=trace");
        assert!(config.trezor.is_none());
    }

    #[test]
    fn trezor_url_enables_the_controller() {
        let mut config = HarnessConfig::default();
        config.apply_overrides(lookup(&[(ENV_TREZOR_URL, "ws://emulator:9001/")]));

        let trezor = config.trezor.expect("trezor section created");
        assert_eq!(trezor.url, "ws://emulator:9001/");
        assert_eq!(trezor.response_timeout_ms, 60_000);
    }

    #[test]
    fn config_path_resolution() {
        let explicit = Path::new("/tmp/custom.yaml");
        assert_eq!(
            resolve_config_path(Some(explicit), Some(PathBuf::from("/home/ci/.config"))),
            explicit
        );
        assert_eq!(
            resolve_config_path(None, Some(PathBuf::from("/home/ci/.config"))),
            Path::new("/home/ci/.config/wallet-e2e/harness.yaml")
        );
        assert_eq!(
            resolve_config_path(None, None),
            Path::new("config/harness.yaml")
        );
    }

    #[test]
    fn unrecognised_headless_value_is_ignored() {
        let mut config = HarnessConfig::default();
        config.webdriver.headless = true;
        config.apply_overrides(lookup(&[(ENV_HEADLESS, "maybe")]));
        assert!(config.webdriver.headless);
    }
}
