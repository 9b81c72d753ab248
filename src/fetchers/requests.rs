//! Plain HTTP backend
//!
//! One request, no browser. TLS certificates are not verified: the sites
//! being watched are frequently internal or self-signed, and refusing them
//! would make the default backend useless there. Treat fetched content as
//! untrusted accordingly.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::encoding::decode_body;
use super::registry::FetcherKind;
use super::traits::{EmptyReply, FetchError, Fetcher};
use super::types::{FetchRequest, FetchResponse, FetchState, ResponseHeaders};

const REDIRECT_LIMIT: usize = 10;

pub const DESCRIPTION: &str = "Basic fast Plaintext/HTTP Client";

/// Direct HTTP fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    state: FetchState,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
            .build()?;

        Ok(Self {
            client,
            state: FetchState::default(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::HtmlRequests
    }

    fn description(&self) -> String {
        DESCRIPTION.to_string()
    }

    fn state(&self) -> &FetchState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FetchState {
        &mut self.state
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| map_error(e, request))?;

        let status_code = response.status().as_u16();
        let headers = ResponseHeaders::from(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| map_error(e, request))?;

        // Status is not judged here: a 404 page with a body is still content
        if body.is_empty() {
            return Err(EmptyReply {
                status_code: Some(status_code),
                url: request.url.clone(),
            }
            .into());
        }

        debug!(url = %request.url, status = status_code, size = body.len(), "Response received");

        Ok(FetchResponse {
            status_code,
            content: decode_body(content_type.as_deref(), &body),
            headers,
        })
    }
}

fn map_error(e: reqwest::Error, request: &FetchRequest) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: request.url.clone(),
            after: request.timeout,
        }
    } else {
        FetchError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_identity() {
        let fetcher = HttpFetcher::new().unwrap();
        assert_eq!(fetcher.kind(), FetcherKind::HtmlRequests);
        assert_eq!(fetcher.description(), "Basic fast Plaintext/HTTP Client");
        assert!(fetcher.last_status_code().is_none());
    }

    #[tokio::test]
    async fn test_http_fetcher_always_ready() {
        let fetcher = HttpFetcher::new().unwrap();
        assert!(fetcher.is_ready().await.unwrap());
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut fetcher = HttpFetcher::new().unwrap();
        let request = FetchRequest::builder()
            .url(format!("http://127.0.0.1:{port}/"))
            .build();

        let err = fetcher.run(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
        assert!(fetcher.content().is_none());
    }
}
