use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::fetchers::FetcherKind;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://browser-chrome:4444/wd/hub";
pub const DEFAULT_PLAYWRIGHT_DRIVER_URL: &str = "ws://playwright-server:4444/playwright";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub playwright: PlaywrightConfig,
}

/// Defaults applied to fetches started from the CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub default_fetcher: FetcherKind,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            default_fetcher: FetcherKind::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Remote WebDriver backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebDriverConfig {
    /// Remote session endpoint; `None` means the built-in default
    pub url: Option<String>,
    #[serde(default = "default_delay_before_content_ready_secs")]
    pub delay_before_content_ready_secs: u64,
    #[serde(default)]
    pub proxy: WebDriverProxyConfig,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            delay_before_content_ready_secs: default_delay_before_content_ready_secs(),
            proxy: WebDriverProxyConfig::default(),
        }
    }
}

impl WebDriverConfig {
    pub fn effective_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_WEBDRIVER_URL)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.delay_before_content_ready_secs)
    }
}

fn default_delay_before_content_ready_secs() -> u64 {
    5
}

/// Selenium-style proxy keys; all optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebDriverProxyConfig {
    pub proxy_type: Option<String>,
    pub ftp_proxy: Option<String>,
    pub http_proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub proxy_autoconfig_url: Option<String>,
    pub ssl_proxy: Option<String>,
    pub autodetect: Option<String>,
    pub socks_proxy: Option<String>,
    pub socks_version: Option<String>,
    pub socks_username: Option<String>,
    pub socks_password: Option<String>,
}

impl WebDriverProxyConfig {
    /// Deployment environment key names, paired with the field they set
    pub const KEYS: [&'static str; 11] = [
        "proxyType",
        "ftpProxy",
        "httpProxy",
        "noProxy",
        "proxyAutoconfigUrl",
        "sslProxy",
        "autodetect",
        "socksProxy",
        "socksVersion",
        "socksUsername",
        "socksPassword",
    ];

    pub fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "proxyType" => Some(&mut self.proxy_type),
            "ftpProxy" => Some(&mut self.ftp_proxy),
            "httpProxy" => Some(&mut self.http_proxy),
            "noProxy" => Some(&mut self.no_proxy),
            "proxyAutoconfigUrl" => Some(&mut self.proxy_autoconfig_url),
            "sslProxy" => Some(&mut self.ssl_proxy),
            "autodetect" => Some(&mut self.autodetect),
            "socksProxy" => Some(&mut self.socks_proxy),
            "socksVersion" => Some(&mut self.socks_version),
            "socksUsername" => Some(&mut self.socks_username),
            "socksPassword" => Some(&mut self.socks_password),
            _ => None,
        }
    }

    /// Set keys as `(key, value)` pairs, skipping empty values
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let fields = [
            &self.proxy_type,
            &self.ftp_proxy,
            &self.http_proxy,
            &self.no_proxy,
            &self.proxy_autoconfig_url,
            &self.ssl_proxy,
            &self.autodetect,
            &self.socks_proxy,
            &self.socks_version,
            &self.socks_username,
            &self.socks_password,
        ];

        Self::KEYS
            .iter()
            .zip(fields)
            .filter_map(|(key, value)| match value.as_deref() {
                Some(v) if !v.is_empty() => Some((*key, v)),
                _ => None,
            })
            .collect()
    }
}

/// Remote browser engine family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }

    /// Capitalised name used in descriptions
    pub fn display_name(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "Chromium",
            BrowserType::Firefox => "Firefox",
            BrowserType::Webkit => "Webkit",
        }
    }
}

impl fmt::Display for BrowserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BrowserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" => Ok(BrowserType::Chromium),
            "firefox" => Ok(BrowserType::Firefox),
            "webkit" => Ok(BrowserType::Webkit),
            other => Err(format!("unknown browser type: {other}")),
        }
    }
}

/// Remote browser-automation backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaywrightConfig {
    #[serde(default)]
    pub browser_type: BrowserType,
    /// Remote browser endpoint; `None` means the built-in default
    pub driver_url: Option<String>,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub proxy: PlaywrightProxyConfig,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser_type: BrowserType::default(),
            driver_url: None,
            settle_delay_ms: default_settle_delay_ms(),
            user_agent: default_user_agent(),
            proxy: PlaywrightProxyConfig::default(),
        }
    }
}

impl PlaywrightConfig {
    pub fn effective_driver_url(&self) -> &str {
        self.driver_url
            .as_deref()
            .unwrap_or(DEFAULT_PLAYWRIGHT_DRIVER_URL)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_settle_delay_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

/// Browser-context proxy keys; all optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlaywrightProxyConfig {
    pub server: Option<String>,
    pub bypass: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PlaywrightProxyConfig {
    pub const KEYS: [&'static str; 4] = ["server", "bypass", "username", "password"];

    pub fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "server" => Some(&mut self.server),
            "bypass" => Some(&mut self.bypass),
            "username" => Some(&mut self.username),
            "password" => Some(&mut self.password),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        [&self.server, &self.bypass, &self.username, &self.password]
            .iter()
            .all(|v| v.as_deref().is_none_or(str::is_empty))
    }
}
