use crate::models::{OutputSize, Period};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable holding the Alpha Vantage key.
pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("ALPHA_VANTAGE_API_KEY is not set (add ALPHA_VANTAGE_API_KEY=your_key_here to .env)")]
    MissingApiKey,
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// HTTP / API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fallback when the environment variable is absent.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Where CSV files are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

/// What `fetch` requests when no CLI flags are given
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default = "default_periods")]
    pub periods: Vec<Period>,

    #[serde(default)]
    pub outputsize: OutputSize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("alpha-markets/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_symbols() -> Vec<String> {
    vec!["AAPL".to_string()]
}
fn default_periods() -> Vec<Period> {
    Period::ALL.to_vec()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            api_key: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            periods: default_periods(),
            outputsize: OutputSize::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("ALPHA_MARKETS").separator("__"))
            .build()?;

        cfg.try_deserialize().context("Invalid configuration")
    }

    /// The API key, from the environment first, then from the config files.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        resolve_api_key(std::env::var(API_KEY_VAR).ok(), self.api.api_key.as_deref())
    }
}

pub fn resolve_api_key(env: Option<String>, configured: Option<&str>) -> Result<String, ConfigError> {
    env.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| configured.map(str::trim).filter(|k| !k.is_empty()))
        .map(str::to_string)
        .ok_or(ConfigError::MissingApiKey)
}
