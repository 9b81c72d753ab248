use super::models::{BrowserType, Config};
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "CONTENTFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/contentfetch.toml";
const ENV_PREFIX: &str = "CONTENTFETCH";
const ENV_SEPARATOR: &str = "__";

const WEBDRIVER_PROXY_PREFIX: &str = "webdriver_";
const PLAYWRIGHT_PROXY_PREFIX: &str = "playwright_proxy_";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. `CONTENTFETCH__*` environment variables
/// 5. Deployment environment names (`WEBDRIVER_URL`, `playwright_proxy_server`, ...)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    apply_deployment_env(&mut config, |key| env::var(key).ok())?;

    Ok(config)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // CONTENTFETCH__WEBDRIVER__URL -> webdriver.url
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

/// Overlay the variable names deployments of the fetch backends already use
///
/// `lookup` resolves a variable name to its value; values have wrapping
/// double quotes removed.
pub fn apply_deployment_env<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| strip_quotes(&v).to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(url) = get("WEBDRIVER_URL") {
        config.webdriver.url = Some(url);
    }
    if let Some(delay) = get("WEBDRIVER_DELAY_BEFORE_CONTENT_READY") {
        config.webdriver.delay_before_content_ready_secs = delay.parse().map_err(|_| {
            ConfigError::Message(format!(
                "WEBDRIVER_DELAY_BEFORE_CONTENT_READY must be a whole number of seconds, got '{delay}'"
            ))
        })?;
    }
    for key in super::models::WebDriverProxyConfig::KEYS {
        if let Some(value) = get(&format!("{WEBDRIVER_PROXY_PREFIX}{key}")) {
            if let Some(field) = config.webdriver.proxy.field_mut(key) {
                *field = Some(value);
            }
        }
    }

    if let Some(url) = get("PLAYWRIGHT_DRIVER_URL") {
        config.playwright.driver_url = Some(url);
    }
    if let Some(browser_type) = get("PLAYWRIGHT_BROWSER_TYPE") {
        config.playwright.browser_type = browser_type
            .parse::<BrowserType>()
            .map_err(ConfigError::Message)?;
    }
    for key in super::models::PlaywrightProxyConfig::KEYS {
        if let Some(value) = get(&format!("{PLAYWRIGHT_PROXY_PREFIX}{key}")) {
            if let Some(field) = config.playwright.proxy.field_mut(key) {
                *field = Some(value);
            }
        }
    }

    Ok(())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}
