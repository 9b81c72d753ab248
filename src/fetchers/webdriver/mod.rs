//! Remote WebDriver backend
//!
//! Opens a Chrome session on a remote WebDriver endpoint (a Selenium grid or
//! standalone node), navigates, waits for client-side rendering to settle
//! and captures the rendered page source.
//!
//! Known limitations of this backend:
//! - The protocol does not expose the transport status, so `status_code` is
//!   always 200 and an empty page is not reported as an empty reply.
//! - Response headers are not observable; `headers` is always empty.
//! - Navigation is always a plain GET. Request method, body and headers are
//!   accepted and ignored.

mod client;
mod proxy;

pub use client::{WebDriverClient, WebDriverSession};
pub use proxy::proxy_capability;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::registry::FetcherKind;
use super::traits::{FetchError, Fetcher};
use super::types::{FetchRequest, FetchResponse, FetchState, ResponseHeaders};
use crate::config::WebDriverConfig;

/// Reported for every successful fetch; see the module docs
pub const ASSUMED_STATUS_CODE: u16 = 200;

const BROWSER_NAME: &str = "chrome";
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Description for the registry, naming the endpoint only when configured
pub fn describe(config: &WebDriverConfig) -> String {
    match config.url.as_deref() {
        Some(url) => format!("WebDriver Chrome/Javascript via '{url}'"),
        None => "WebDriver Chrome/Javascript".to_string(),
    }
}

/// Remote WebDriver fetcher
#[derive(Debug)]
pub struct WebDriverFetcher {
    config: WebDriverConfig,
    proxy: Option<Value>,
    client: WebDriverClient,
    state: FetchState,
}

impl WebDriverFetcher {
    pub fn new(config: WebDriverConfig) -> Result<Self, FetchError> {
        let proxy = proxy_capability(&config.proxy);
        let client = WebDriverClient::new(config.effective_url())?;

        Ok(Self {
            config,
            proxy,
            client,
            state: FetchState::default(),
        })
    }

    /// The proxy capability sent with each session, if any key was configured
    pub fn proxy(&self) -> Option<&Value> {
        self.proxy.as_ref()
    }

    pub fn capabilities(&self, with_proxy: bool) -> Value {
        let mut capabilities = json!({ "browserName": BROWSER_NAME });
        if let (true, Some(proxy)) = (with_proxy, &self.proxy) {
            capabilities["proxy"] = proxy.clone();
        }
        capabilities
    }

    async fn load_page(
        &self,
        session: &WebDriverSession<'_>,
        request: &FetchRequest,
    ) -> Result<FetchResponse, FetchError> {
        session.set_page_load_timeout(request.timeout).await?;
        session.navigate(&request.url, request.timeout).await?;

        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            debug!(url = %request.url, ?delay, "Waiting for page to settle");
            tokio::time::sleep(delay).await;
        }

        let content = session.page_source(request.timeout).await?;

        Ok(FetchResponse {
            status_code: ASSUMED_STATUS_CODE,
            content,
            headers: ResponseHeaders::new(),
        })
    }
}

#[async_trait]
impl Fetcher for WebDriverFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::HtmlWebdriver
    }

    fn description(&self) -> String {
        describe(&self.config)
    }

    fn state(&self) -> &FetchState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FetchState {
        &mut self.state
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if request.method != reqwest::Method::GET || request.body.is_some() {
            debug!(
                url = %request.url,
                method = %request.method,
                "WebDriver navigation is always GET, method and body ignored"
            );
        }

        let session = self
            .client
            .new_session(self.capabilities(true), request.timeout)
            .await?;

        let outcome = self.load_page(&session, request).await;

        // The session is released on every path, the page outcome wins
        let session_id = session.id().to_string();
        if let Err(e) = session.quit().await {
            warn!(session = %session_id, error = %e, "Failed to close WebDriver session");
        }

        outcome
    }

    /// Open and immediately close a session, without proxy settings
    async fn is_ready(&self) -> Result<bool, FetchError> {
        let session = self
            .client
            .new_session(self.capabilities(false), READY_TIMEOUT)
            .await?;
        session.quit().await?;
        Ok(true)
    }
}
