use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::registry::FetcherKind;
use super::types::{FetchRequest, FetchResponse, FetchState, ResponseHeaders};

/// A fetch produced no usable content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("empty reply from {url} (status: {})", display_status(.status_code))]
pub struct EmptyReply {
    pub status_code: Option<u16>,
    pub url: String,
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

/// Fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    EmptyReply(#[from] EmptyReply),

    #[error("timed out fetching {url} after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("webdriver error {status} ({error}): {message}")]
    WebDriver {
        status: u16,
        error: String,
        message: String,
    },

    #[error("remote browser error: {0}")]
    Browser(String),

    #[error("browser engine not supported over the remote protocol: {0}")]
    UnsupportedEngine(String),

    #[error("unknown fetcher: {0}")]
    UnknownFetcher(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// The empty-reply signal, if this is one
    pub fn as_empty_reply(&self) -> Option<&EmptyReply> {
        match self {
            FetchError::EmptyReply(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Content retrieval backend
///
/// Implementors provide [`Fetcher::fetch`]; callers drive a fetch with
/// [`Fetcher::run`] and read the outcome back through the accessors.
/// An instance serves one fetch at a time and is not meant to be shared
/// between concurrent fetches.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn kind(&self) -> FetcherKind;

    /// Human readable label, may embed live configuration
    fn description(&self) -> String;

    fn state(&self) -> &FetchState;

    fn state_mut(&mut self) -> &mut FetchState;

    /// Backend-specific retrieval
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;

    /// Lightweight readiness check of the backend's remote dependency
    async fn is_ready(&self) -> Result<bool, FetchError> {
        Ok(true)
    }

    /// Run one fetch and record its outcome on this instance
    async fn run(&mut self, request: &FetchRequest) -> Result<&FetchResponse, FetchError> {
        let fetcher = self.kind();
        let outcome = match request.validate() {
            Ok(()) => {
                debug!(%fetcher, url = %request.url, method = %request.method, "Starting fetch");
                self.fetch(request).await
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(response) => info!(
                %fetcher,
                url = %request.url,
                status = response.status_code,
                size = response.content.len(),
                "Fetch completed"
            ),
            Err(FetchError::EmptyReply(reply)) => {
                warn!(%fetcher, url = %reply.url, status = ?reply.status_code, "Empty reply")
            }
            Err(e) => warn!(%fetcher, url = %request.url, error = %e, "Fetch failed"),
        }

        self.state_mut().record(outcome)
    }

    fn last_error(&self) -> Option<&str> {
        self.state().error.as_deref()
    }

    fn last_status_code(&self) -> Option<u16> {
        self.state().response.as_ref().map(|r| r.status_code)
    }

    fn content(&self) -> Option<&str> {
        self.state().response.as_ref().map(|r| r.content.as_str())
    }

    fn headers(&self) -> Option<&ResponseHeaders> {
        self.state().response.as_ref().map(|r| &r.headers)
    }
}
