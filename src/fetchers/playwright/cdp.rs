//! Chrome DevTools Protocol implementation of the remote browser traits

use async_trait::async_trait;
use chromiumoxide::auth::Credentials;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::remote::{
    BrowserConnector, BrowsingContext, ContextOptions, ContextProxy, NavigationResponse,
    RemoteBrowser,
};
use crate::config::BrowserType;
use crate::fetchers::traits::FetchError;
use crate::fetchers::types::ResponseHeaders;

fn browser_error(e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(e.to_string())
}

/// Like [`browser_error`], but a CDP request timeout stays a timeout
fn page_error(e: CdpError, url: &str, timeout: Duration) -> FetchError {
    match e {
        CdpError::Timeout => FetchError::Timeout {
            url: url.to_string(),
            after: timeout,
        },
        other => browser_error(other),
    }
}

/// Credentials answering proxy authentication challenges, if any are configured
pub fn proxy_credentials(proxy: &ContextProxy) -> Option<Credentials> {
    if !proxy.has_credentials() {
        return None;
    }
    Some(Credentials {
        username: proxy.username.clone().unwrap_or_default(),
        password: proxy.password.clone().unwrap_or_default(),
    })
}

/// Connects over CDP; only Chromium speaks it
#[derive(Debug, Clone, Copy, Default)]
pub struct CdpConnector;

#[async_trait]
impl BrowserConnector for CdpConnector {
    async fn connect(
        &self,
        engine: BrowserType,
        endpoint: &str,
        timeout_ms: u64,
    ) -> Result<Box<dyn RemoteBrowser>, FetchError> {
        if engine != BrowserType::Chromium {
            return Err(FetchError::UnsupportedEngine(engine.to_string()));
        }

        let timeout = Duration::from_millis(timeout_ms);
        let config = HandlerConfig {
            request_timeout: timeout,
            ..Default::default()
        };

        let (browser, mut handler) =
            tokio::time::timeout(timeout, Browser::connect_with_config(endpoint, config))
                .await
                .map_err(|_| FetchError::Timeout {
                    url: endpoint.to_string(),
                    after: timeout,
                })?
                .map_err(|e| FetchError::Unreachable {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "Devtools connection event failed");
                }
            }
        });

        debug!(endpoint, "Connected to remote browser");

        Ok(Box::new(CdpBrowser {
            browser,
            handler_task,
            contexts: Vec::new(),
        }))
    }
}

/// A CDP connection and the contexts opened through it
pub struct CdpBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
    contexts: Vec<BrowserContextId>,
}

#[async_trait]
impl RemoteBrowser for CdpBrowser {
    async fn new_context(
        &mut self,
        options: &ContextOptions,
    ) -> Result<Box<dyn BrowsingContext>, FetchError> {
        let mut params = CreateBrowserContextParams {
            dispose_on_detach: Some(true),
            ..Default::default()
        };
        if let Some(proxy) = &options.proxy {
            params.proxy_server = proxy.server.clone();
            params.proxy_bypass_list = proxy.bypass.clone();
        }

        let context_id = self
            .browser
            .execute(params)
            .await
            .map_err(browser_error)?
            .result
            .browser_context_id;
        self.contexts.push(context_id.clone());

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id);

        let page = self.browser.new_page(target).await.map_err(browser_error)?;

        // Answers the proxy's 407 challenges for every request of this page
        if let Some(credentials) = options.proxy.as_ref().and_then(proxy_credentials) {
            page.authenticate(credentials)
                .await
                .map_err(browser_error)?;
        }

        let context = CdpContext { page, url: None };

        // Override before the first request leaves the page
        context
            .page
            .set_user_agent(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(browser_error)?;

        Ok(Box::new(context))
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        let CdpBrowser {
            browser,
            handler_task,
            contexts,
        } = *self;

        let mut first_error = None;
        for context_id in contexts {
            if let Err(e) = browser
                .execute(DisposeBrowserContextParams::new(context_id))
                .await
            {
                warn!(error = %e, "Failed to dispose browser context");
                first_error.get_or_insert(browser_error(e));
            }
        }

        // Dropping a connected (not launched) browser only closes the socket
        drop(browser);
        handler_task.abort();

        first_error.map_or(Ok(()), Err)
    }
}

/// One page inside an isolated browser context
pub struct CdpContext {
    page: Page,
    url: Option<String>,
}

#[async_trait]
impl BrowsingContext for CdpContext {
    async fn goto(
        &mut self,
        url: &str,
        timeout_ms: u64,
    ) -> Result<Option<NavigationResponse>, FetchError> {
        let timeout = Duration::from_millis(timeout_ms);
        self.url = Some(url.to_string());

        let page = &self.page;
        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| page_error(e, url, timeout))?;
            page.wait_for_navigation_response()
                .await
                .map_err(|e| page_error(e, url, timeout))
        };

        let request = tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            })??;

        let Some(response) = request.as_ref().and_then(|request| request.response.as_ref())
        else {
            return Ok(None);
        };

        let status = u16::try_from(response.status).map_err(|_| {
            FetchError::Browser(format!(
                "navigation to {url} reported invalid status {}",
                response.status
            ))
        })?;

        Ok(Some(NavigationResponse {
            status,
            headers: ResponseHeaders::from_json(response.headers.inner()),
        }))
    }

    async fn content(&mut self, timeout_ms: u64) -> Result<String, FetchError> {
        let timeout = Duration::from_millis(timeout_ms);
        let url = self.url.as_deref().unwrap_or("about:blank");

        tokio::time::timeout(timeout, self.page.content())
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            })?
            .map_err(|e| page_error(e, url, timeout))
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        self.page.close().await.map_err(browser_error)
    }
}
