//! Remote browser-automation backend
//!
//! Connects to an already-running browser, opens an isolated context with a
//! fixed user agent (the engine default gets blocked by bot mitigation far
//! more often), navigates and captures the rendered DOM together with the
//! real response status and headers.
//!
//! The context and the connection are released on every exit path,
//! including failures while the content is being extracted.

mod cdp;
mod remote;

pub use cdp::{CdpBrowser, CdpConnector, CdpContext};
pub use remote::{
    BrowserConnector, BrowsingContext, ContextOptions, ContextProxy, NavigationResponse,
    RemoteBrowser,
};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::registry::FetcherKind;
use super::traits::{EmptyReply, FetchError, Fetcher};
use super::types::{FetchRequest, FetchResponse, FetchState};
use crate::config::PlaywrightConfig;

const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Description for the registry, naming the endpoint only when configured
pub fn describe(config: &PlaywrightConfig) -> String {
    let mut description = format!(
        "Playwright {}/Javascript",
        config.browser_type.display_name()
    );
    if let Some(url) = config.driver_url.as_deref() {
        description.push_str(&format!(" via '{url}'"));
    }
    description
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Remote browser fetcher
pub struct PlaywrightFetcher {
    config: PlaywrightConfig,
    proxy: Option<ContextProxy>,
    connector: Arc<dyn BrowserConnector>,
    state: FetchState,
}

impl PlaywrightFetcher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self::with_connector(config, Arc::new(CdpConnector))
    }

    pub fn with_connector(config: PlaywrightConfig, connector: Arc<dyn BrowserConnector>) -> Self {
        let proxy = ContextProxy::from_config(&config.proxy);
        Self {
            config,
            proxy,
            connector,
            state: FetchState::default(),
        }
    }

    pub fn proxy(&self) -> Option<&ContextProxy> {
        self.proxy.as_ref()
    }

    fn context_options(&self) -> ContextOptions {
        ContextOptions {
            user_agent: self.config.user_agent.clone(),
            proxy: self.proxy.clone(),
        }
    }

    async fn render(
        &self,
        browser: &mut dyn RemoteBrowser,
        request: &FetchRequest,
    ) -> Result<FetchResponse, FetchError> {
        let mut context = browser.new_context(&self.context_options()).await?;

        let outcome = self.capture(context.as_mut(), request).await;

        if let Err(e) = context.close().await {
            warn!(url = %request.url, error = %e, "Failed to close browsing context");
        }

        outcome
    }

    async fn capture(
        &self,
        context: &mut dyn BrowsingContext,
        request: &FetchRequest,
    ) -> Result<FetchResponse, FetchError> {
        let response = context
            .goto(&request.url, millis(request.timeout))
            .await?
            .ok_or_else(|| EmptyReply {
                status_code: None,
                url: request.url.clone(),
            })?;

        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            debug!(url = %request.url, ?delay, "Waiting for page scripts to settle");
            tokio::time::sleep(delay).await;
        }

        let content = context.content(millis(request.timeout)).await?;

        Ok(FetchResponse {
            status_code: response.status,
            content,
            headers: response.headers,
        })
    }
}

#[async_trait]
impl Fetcher for PlaywrightFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::HtmlPlaywright
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
        let mut browser = self
            .connector
            .connect(
                self.config.browser_type,
                self.config.effective_driver_url(),
                millis(request.timeout),
            )
            .await?;

        let outcome = self.render(browser.as_mut(), request).await;

        if let Err(e) = browser.close().await {
            warn!(url = %request.url, error = %e, "Failed to close remote browser connection");
        }

        outcome
    }

    /// Connect and disconnect without opening a context
    async fn is_ready(&self) -> Result<bool, FetchError> {
        let browser = self
            .connector
            .connect(
                self.config.browser_type,
                self.config.effective_driver_url(),
                millis(READY_TIMEOUT),
            )
            .await?;
        browser.close().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrowserType, PlaywrightProxyConfig};
    use crate::fetchers::types::ResponseHeaders;
    use std::sync::Mutex;

    /// Scripted remote browser that records what was opened and closed
    #[derive(Default)]
    struct Script {
        navigation: Option<NavigationResponse>,
        fail_goto: bool,
        fail_content: bool,
        events: Mutex<Vec<String>>,
    }

    impl Script {
        fn log(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct FakeConnector(Arc<Script>);
    struct FakeBrowser(Arc<Script>);
    struct FakeContext(Arc<Script>);

    #[async_trait]
    impl BrowserConnector for FakeConnector {
        async fn connect(
            &self,
            engine: BrowserType,
            endpoint: &str,
            timeout_ms: u64,
        ) -> Result<Box<dyn RemoteBrowser>, FetchError> {
            self.0.log(format!("connect {engine} {endpoint} {timeout_ms}"));
            Ok(Box::new(FakeBrowser(self.0.clone())))
        }
    }

    #[async_trait]
    impl RemoteBrowser for FakeBrowser {
        async fn new_context(
            &mut self,
            options: &ContextOptions,
        ) -> Result<Box<dyn BrowsingContext>, FetchError> {
            self.0.log(format!(
                "context ua={} proxy={}",
                options.user_agent,
                options.proxy.is_some()
            ));
            if let Some(proxy) = options.proxy.as_ref().filter(|p| p.has_credentials()) {
                self.0.log(format!(
                    "credentials {}:{}",
                    proxy.username.as_deref().unwrap_or_default(),
                    proxy.password.as_deref().unwrap_or_default()
                ));
            }
            Ok(Box::new(FakeContext(self.0.clone())))
        }

        async fn close(self: Box<Self>) -> Result<(), FetchError> {
            self.0.log("browser closed");
            Ok(())
        }
    }

    #[async_trait]
    impl BrowsingContext for FakeContext {
        async fn goto(
            &mut self,
            url: &str,
            _timeout_ms: u64,
        ) -> Result<Option<NavigationResponse>, FetchError> {
            self.0.log(format!("goto {url}"));
            if self.0.fail_goto {
                return Err(FetchError::Browser("net::ERR_CONNECTION_RESET".to_string()));
            }
            Ok(self.0.navigation.clone())
        }

        async fn content(&mut self, timeout_ms: u64) -> Result<String, FetchError> {
            self.0.log(format!("content {timeout_ms}"));
            if self.0.fail_content {
                return Err(FetchError::Browser("target crashed".to_string()));
            }
            Ok("<html><body>rendered</body></html>".to_string())
        }

        async fn close(self: Box<Self>) -> Result<(), FetchError> {
            self.0.log("context closed");
            Ok(())
        }
    }

    fn config() -> PlaywrightConfig {
        PlaywrightConfig {
            settle_delay_ms: 0,
            ..Default::default()
        }
    }

    fn ok_navigation() -> NavigationResponse {
        let mut headers = ResponseHeaders::new();
        headers.insert("Content-Type", "text/html");
        NavigationResponse {
            status: 201,
            headers,
        }
    }

    #[tokio::test]
    async fn test_successful_fetch_captures_response() {
        let script = Arc::new(Script {
            navigation: Some(ok_navigation()),
            ..Default::default()
        });
        let mut fetcher =
            PlaywrightFetcher::with_connector(config(), Arc::new(FakeConnector(script.clone())));
        let request = FetchRequest::builder()
            .url("https://example.com/")
            .timeout(Duration::from_secs(7))
            .build();

        let response = fetcher.run(&request).await.unwrap();
        assert_eq!(response.status_code, 201);
        assert_eq!(response.content, "<html><body>rendered</body></html>");
        assert_eq!(response.headers.get("content-type"), Some("text/html"));

        assert_eq!(
            script.events(),
            vec![
                "connect chromium ws://playwright-server:4444/playwright 7000",
                "context ua=Mozilla/5.0 proxy=false",
                "goto https://example.com/",
                "content 7000",
                "context closed",
                "browser closed",
            ]
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_still_releases_context() {
        let script = Arc::new(Script {
            fail_goto: true,
            ..Default::default()
        });
        let mut fetcher =
            PlaywrightFetcher::with_connector(config(), Arc::new(FakeConnector(script.clone())));
        let request = FetchRequest::builder().url("https://example.com/").build();

        let err = fetcher.run(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Browser(ref msg) if msg.contains("CONNECTION_RESET")));

        let events = script.events();
        assert!(events.contains(&"context closed".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("browser closed"));
        assert!(!events.iter().any(|e| e.starts_with("content")));
    }

    #[tokio::test]
    async fn test_proxy_credentials_reach_context() {
        let script = Arc::new(Script {
            navigation: Some(ok_navigation()),
            ..Default::default()
        });
        let config = PlaywrightConfig {
            proxy: PlaywrightProxyConfig {
                server: Some("http://proxy:3128".to_string()),
                username: Some("user".to_string()),
                password: Some("pass".to_string()),
                ..Default::default()
            },
            ..config()
        };
        let mut fetcher =
            PlaywrightFetcher::with_connector(config, Arc::new(FakeConnector(script.clone())));

        let request = FetchRequest::builder().url("https://example.com/").build();
        fetcher.run(&request).await.unwrap();
        assert!(script
            .events()
            .contains(&"credentials user:pass".to_string()));
    }

    #[tokio::test]
    async fn test_missing_response_is_empty_reply_and_cleans_up() {
        let script = Arc::new(Script::default());
        let mut fetcher =
            PlaywrightFetcher::with_connector(config(), Arc::new(FakeConnector(script.clone())));
        let request = FetchRequest::builder().url("https://example.com/").build();

        let err = fetcher.run(&request).await.unwrap_err();
        let reply = err.as_empty_reply().unwrap();
        assert_eq!(reply.status_code, None);
        assert_eq!(reply.url, "https://example.com/");

        assert!(fetcher.content().is_none());
        assert!(fetcher.last_status_code().is_none());

        let events = script.events();
        assert!(events.contains(&"context closed".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("browser closed"));
    }

    #[tokio::test]
    async fn test_extraction_failure_still_releases_context() {
        let script = Arc::new(Script {
            navigation: Some(ok_navigation()),
            fail_content: true,
            ..Default::default()
        });
        let mut fetcher =
            PlaywrightFetcher::with_connector(config(), Arc::new(FakeConnector(script.clone())));
        let request = FetchRequest::builder().url("https://example.com/").build();

        let err = fetcher.run(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Browser(_)));

        let events = script.events();
        assert!(events.contains(&"context closed".to_string()));
        assert!(events.contains(&"browser closed".to_string()));
    }

    #[tokio::test]
    async fn test_proxy_passed_to_context() {
        let script = Arc::new(Script {
            navigation: Some(ok_navigation()),
            ..Default::default()
        });
        let config = PlaywrightConfig {
            proxy: PlaywrightProxyConfig {
                server: Some("http://proxy:3128".to_string()),
                ..Default::default()
            },
            ..config()
        };
        let mut fetcher =
            PlaywrightFetcher::with_connector(config, Arc::new(FakeConnector(script.clone())));
        assert!(fetcher.proxy().is_some());

        let request = FetchRequest::builder().url("https://example.com/").build();
        fetcher.run(&request).await.unwrap();
        assert!(script
            .events()
            .contains(&"context ua=Mozilla/5.0 proxy=true".to_string()));
    }

    #[tokio::test]
    async fn test_is_ready_connects_and_disconnects() {
        let script = Arc::new(Script::default());
        let fetcher =
            PlaywrightFetcher::with_connector(config(), Arc::new(FakeConnector(script.clone())));

        assert!(fetcher.is_ready().await.unwrap());
        assert_eq!(
            script.events(),
            vec![
                "connect chromium ws://playwright-server:4444/playwright 30000",
                "browser closed",
            ]
        );
    }

    #[test]
    fn test_no_proxy_keys_means_no_proxy() {
        let fetcher = PlaywrightFetcher::new(PlaywrightConfig::default());
        assert!(fetcher.proxy().is_none());
    }

    #[test]
    fn test_description() {
        assert_eq!(
            describe(&PlaywrightConfig::default()),
            "Playwright Chromium/Javascript"
        );

        let config = PlaywrightConfig {
            browser_type: BrowserType::Webkit,
            driver_url: Some("ws://pw:3000".to_string()),
            ..Default::default()
        };
        assert_eq!(describe(&config), "Playwright Webkit/Javascript via 'ws://pw:3000'");
    }
}
