//! Minimal W3C WebDriver wire client
//!
//! Speaks just enough of the protocol for page retrieval: create a session,
//! navigate, read the page source, delete the session. Responses in the
//! older JSON-wire shape (`sessionId` at the top level, numeric `status`)
//! are accepted too, since Selenium grids of both generations are common.

use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::fetchers::traits::FetchError;

/// Extra time granted to the HTTP exchange over the remote page-load timeout,
/// so the remote side reports its own timeout first.
const COMMAND_GRACE: Duration = Duration::from_secs(10);

/// HTTP client bound to one remote WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: Client,
    endpoint: String,
}

impl WebDriverClient {
    pub fn new(endpoint: &str) -> Result<Self, FetchError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Open a remote browser session for the given capabilities
    pub async fn new_session(
        &self,
        capabilities: Value,
        timeout: Duration,
    ) -> Result<WebDriverSession<'_>, FetchError> {
        let body = json!({
            "capabilities": { "alwaysMatch": capabilities.clone() },
            "desiredCapabilities": capabilities,
        });

        let payload = self
            .command(Method::POST, "session", Some(body), timeout)
            .await?;

        let id = payload["value"]["sessionId"]
            .as_str()
            .or_else(|| payload["sessionId"].as_str())
            .ok_or_else(|| FetchError::WebDriver {
                status: 200,
                error: "session not created".to_string(),
                message: "response carried no sessionId".to_string(),
            })?
            .to_string();

        debug!(endpoint = %self.endpoint, session = %id, "WebDriver session opened");

        Ok(WebDriverSession { client: self, id })
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        let url = format!("{}/{}", self.endpoint, path);
        let mut request = self.http.request(method, &url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e, &url, timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, &url, timeout))?;
        let payload = match serde_json::from_str::<Value>(&text) {
            Ok(payload) => payload,
            Err(_) if text.trim().is_empty() => Value::Null,
            Err(e) if status.is_success() => {
                return Err(invalid_response(status.as_u16(), &url, e));
            }
            Err(_) => Value::Null,
        };

        if let Some(err) = protocol_error(status.as_u16(), &payload, &url, timeout) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(FetchError::WebDriver {
                status: status.as_u16(),
                error: "unknown error".to_string(),
                message: text,
            });
        }

        Ok(payload)
    }

    fn transport_error(&self, e: reqwest::Error, url: &str, timeout: Duration) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            }
        } else if e.is_connect() {
            FetchError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }
        } else {
            FetchError::Http(e)
        }
    }
}

/// A reply that is not a WebDriver payload at all
fn invalid_response(status: u16, url: &str, reason: impl std::fmt::Display) -> FetchError {
    FetchError::WebDriver {
        status,
        error: "invalid response".to_string(),
        message: format!("{url}: {reason}"),
    }
}

/// Error object from either protocol generation, if the payload carries one
fn protocol_error(
    status: u16,
    payload: &Value,
    url: &str,
    timeout: Duration,
) -> Option<FetchError> {
    let value = &payload["value"];

    if let Some(error) = value["error"].as_str() {
        let message = value["message"].as_str().unwrap_or_default().to_string();
        if error == "timeout" {
            return Some(FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            });
        }
        return Some(FetchError::WebDriver {
            status,
            error: error.to_string(),
            message,
        });
    }

    match payload["status"].as_i64() {
        Some(code) if code != 0 => Some(FetchError::WebDriver {
            status,
            error: format!("legacy status {code}"),
            message: value["message"].as_str().unwrap_or_default().to_string(),
        }),
        _ => None,
    }
}

/// An open remote session; release it with [`WebDriverSession::quit`]
#[derive(Debug)]
pub struct WebDriverSession<'a> {
    client: &'a WebDriverClient,
    id: String,
}

impl WebDriverSession<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn set_page_load_timeout(&self, timeout: Duration) -> Result<(), FetchError> {
        let body = json!({ "pageLoad": u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) });
        self.client
            .command(
                Method::POST,
                &format!("session/{}/timeouts", self.id),
                Some(body),
                timeout + COMMAND_GRACE,
            )
            .await
            .map(drop)
    }

    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        self.client
            .command(
                Method::POST,
                &format!("session/{}/url", self.id),
                Some(json!({ "url": url })),
                timeout + COMMAND_GRACE,
            )
            .await
            .map_err(|e| match e {
                FetchError::Timeout { .. } => FetchError::Timeout {
                    url: url.to_string(),
                    after: timeout,
                },
                other => other,
            })
            .map(drop)
    }

    pub async fn page_source(&self, timeout: Duration) -> Result<String, FetchError> {
        let path = format!("session/{}/source", self.id);
        let payload = self
            .client
            .command(Method::GET, &path, None, timeout + COMMAND_GRACE)
            .await?;

        match &payload["value"] {
            Value::String(source) => Ok(source.clone()),
            other => Err(invalid_response(
                200,
                &format!("{}/{}", self.client.endpoint, path),
                format_args!("page source is not a string: {other}"),
            )),
        }
    }

    /// Delete the remote session
    pub async fn quit(self) -> Result<(), FetchError> {
        self.client
            .command(
                Method::DELETE,
                &format!("session/{}", self.id),
                None,
                COMMAND_GRACE,
            )
            .await?;
        debug!(session = %self.id, "WebDriver session closed");
        Ok(())
    }
}
