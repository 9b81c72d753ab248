use bon::Builder;
use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::traits::FetchError;

pub type HeadersMap = BTreeMap<String, String>;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One fetch invocation: what to retrieve and how
#[derive(Debug, Clone, Builder)]
pub struct FetchRequest {
    #[builder(into)]
    pub url: String,
    #[builder(default = Duration::from_secs(DEFAULT_TIMEOUT_SECS))]
    pub timeout: Duration,
    #[builder(default)]
    pub headers: HeadersMap,
    #[builder(into)]
    pub body: Option<Bytes>,
    #[builder(default = Method::GET)]
    pub method: Method,
}

impl FetchRequest {
    /// Reject requests no backend can act on
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout.is_zero() {
            return Err(FetchError::InvalidRequest(
                "timeout must be positive".to_string(),
            ));
        }

        let parsed = reqwest::Url::parse(&self.url).map_err(|e| {
            FetchError::InvalidRequest(format!("invalid url '{}': {}", self.url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(FetchError::InvalidRequest(format!(
                "url is not absolute: {}",
                self.url
            )));
        }

        Ok(())
    }
}

/// Response headers keyed by lower-cased name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeaders(BTreeMap<String, String>);

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header; repeated names are joined with ", "
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.0
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build from a JSON object of header name -> value, as remote browsers report them
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut headers = Self::new();
        if let Some(object) = value.as_object() {
            for (name, value) in object {
                match value {
                    serde_json::Value::String(s) => headers.insert(name, s.as_str()),
                    other => headers.insert(name, other.to_string()),
                }
            }
        }
        headers
    }
}

impl From<&reqwest::header::HeaderMap> for ResponseHeaders {
    fn from(map: &reqwest::header::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            headers.insert(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        headers
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Normalized result of a successful fetch
///
/// Status and content travel together, so one can never be set without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status_code: u16,
    pub content: String,
    pub headers: ResponseHeaders,
}

/// Per-instance record of the last fetch
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    pub error: Option<String>,
    pub response: Option<FetchResponse>,
}

impl FetchState {
    /// Store the outcome of a fetch, replacing whatever the previous one left
    pub fn record(
        &mut self,
        outcome: Result<FetchResponse, FetchError>,
    ) -> Result<&FetchResponse, FetchError> {
        match outcome {
            Ok(response) => {
                self.error = None;
                Ok(self.response.insert(response))
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.response = None;
                Err(e)
            }
        }
    }
}
