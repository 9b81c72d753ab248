//! Remote browser abstraction
//!
//! A connection to an already-running browser, the isolated contexts opened
//! on it, and what a navigation reports back. Both connections and contexts
//! must be closed explicitly.

use async_trait::async_trait;

use crate::config::{BrowserType, PlaywrightProxyConfig};
use crate::fetchers::traits::FetchError;
use crate::fetchers::types::ResponseHeaders;

/// Proxy settings for a browsing context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextProxy {
    pub server: Option<String>,
    pub bypass: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ContextProxy {
    /// `None` unless at least one key is set
    pub fn from_config(config: &PlaywrightProxyConfig) -> Option<Self> {
        if config.is_empty() {
            return None;
        }

        let keep = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        Some(Self {
            server: keep(&config.server),
            bypass: keep(&config.bypass),
            username: keep(&config.username),
            password: keep(&config.password),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

/// Options for a new browsing context
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub user_agent: String,
    pub proxy: Option<ContextProxy>,
}

/// What the main-frame navigation response reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    pub status: u16,
    pub headers: ResponseHeaders,
}

/// Connects to a remote browser process
#[async_trait]
pub trait BrowserConnector: Send + Sync {
    async fn connect(
        &self,
        engine: BrowserType,
        endpoint: &str,
        timeout_ms: u64,
    ) -> Result<Box<dyn RemoteBrowser>, FetchError>;
}

/// A live connection to a remote browser
#[async_trait]
pub trait RemoteBrowser: Send {
    async fn new_context(
        &mut self,
        options: &ContextOptions,
    ) -> Result<Box<dyn BrowsingContext>, FetchError>;

    /// Disconnect; the remote browser process keeps running
    async fn close(self: Box<Self>) -> Result<(), FetchError>;
}

/// An isolated browsing context with a single page
#[async_trait]
pub trait BrowsingContext: Send {
    /// Navigate the page; `None` when the navigation produced no response
    async fn goto(
        &mut self,
        url: &str,
        timeout_ms: u64,
    ) -> Result<Option<NavigationResponse>, FetchError>;

    /// Rendered DOM serialized as HTML
    async fn content(&mut self, timeout_ms: u64) -> Result<String, FetchError>;

    async fn close(self: Box<Self>) -> Result<(), FetchError>;
}
