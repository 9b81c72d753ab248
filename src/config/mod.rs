//! Configuration management for contentfetch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use contentfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("WebDriver endpoint: {}", config.webdriver.effective_url());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `CONTENTFETCH__<section>__<key>`
//!
//! Examples:
//! - `CONTENTFETCH__FETCH__TIMEOUT_SECS=60`
//! - `CONTENTFETCH__WEBDRIVER__URL=http://selenium:4444/wd/hub`
//! - `CONTENTFETCH__PLAYWRIGHT__PROXY__SERVER=http://proxy:3128`
//!
//! The variable names existing browser deployments already export are
//! honoured on top of that: `WEBDRIVER_URL`, `WEBDRIVER_DELAY_BEFORE_CONTENT_READY`,
//! `webdriver_<proxyKey>`, `PLAYWRIGHT_DRIVER_URL`, `PLAYWRIGHT_BROWSER_TYPE`
//! and `playwright_proxy_<key>`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/contentfetch.toml`.
//! This can be overridden using the `CONTENTFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    BrowserType, Config, DEFAULT_PLAYWRIGHT_DRIVER_URL, DEFAULT_WEBDRIVER_URL, FetchConfig,
    PlaywrightConfig, PlaywrightProxyConfig, WebDriverConfig, WebDriverProxyConfig,
};
pub use sources::apply_deployment_env;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails (bad endpoint URLs, zero timeout, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// `.env` and the deployment environment names are applied as in [`Config::load`].
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut config = sources::load_from_sources(path)?;
        sources::apply_deployment_env(&mut config, |key| std::env::var(key).ok())?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
