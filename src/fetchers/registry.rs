use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::playwright::PlaywrightFetcher;
use super::requests::{self, HttpFetcher};
use super::traits::{FetchError, Fetcher};
use super::webdriver::WebDriverFetcher;
use crate::config::Config;

/// Registered fetch backends
///
/// The serialized names are the identifiers persisted by callers, so they
/// must not change. `HtmlRequests` is the default and keeps the lowest
/// list order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    #[default]
    HtmlRequests,
    HtmlWebdriver,
    HtmlPlaywright,
}

impl FetcherKind {
    pub const ALL: [FetcherKind; 3] = [
        FetcherKind::HtmlRequests,
        FetcherKind::HtmlWebdriver,
        FetcherKind::HtmlPlaywright,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FetcherKind::HtmlRequests => "html_requests",
            FetcherKind::HtmlWebdriver => "html_webdriver",
            FetcherKind::HtmlPlaywright => "html_playwright",
        }
    }

    /// Presentation order; lower sorts first
    pub fn list_order(&self) -> u32 {
        match self {
            FetcherKind::HtmlRequests => 1,
            FetcherKind::HtmlWebdriver => 2,
            FetcherKind::HtmlPlaywright => 3,
        }
    }

    /// Whether `status_code` reflects the real transport status.
    /// The WebDriver protocol does not expose it; that backend reports 200.
    pub fn observes_status(&self) -> bool {
        !matches!(self, FetcherKind::HtmlWebdriver)
    }

    /// Description with the live configuration folded in
    pub fn description(&self, config: &Config) -> String {
        match self {
            FetcherKind::HtmlRequests => requests::DESCRIPTION.to_string(),
            FetcherKind::HtmlWebdriver => super::webdriver::describe(&config.webdriver),
            FetcherKind::HtmlPlaywright => super::playwright::describe(&config.playwright),
        }
    }
}

impl fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FetcherKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FetcherKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| FetchError::UnknownFetcher(s.to_string()))
    }
}

/// Sort `(name, description, order)` entries by order and drop the order key
///
/// The sort is stable, so entries sharing an order keep their input order.
pub fn sort_by_list_order(mut entries: Vec<(String, String, u32)>) -> Vec<(String, String)> {
    entries.sort_by_key(|(_, _, order)| *order);
    entries
        .into_iter()
        .map(|(name, description, _)| (name, description))
        .collect()
}

/// Every backend as `(name, description)`, in presentation order
pub fn available_fetchers(config: &Config) -> Vec<(String, String)> {
    sort_by_list_order(
        FetcherKind::ALL
            .iter()
            .map(|kind| {
                (
                    kind.name().to_string(),
                    kind.description(config),
                    kind.list_order(),
                )
            })
            .collect(),
    )
}

/// Builds a fresh backend instance per fetch from one configuration
#[derive(Debug, Clone, Default)]
pub struct FetcherRegistry {
    config: Config,
}

impl FetcherRegistry {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn available(&self) -> Vec<(String, String)> {
        available_fetchers(&self.config)
    }

    pub fn default_kind(&self) -> FetcherKind {
        self.config.fetch.default_fetcher
    }

    pub fn create(&self, kind: FetcherKind) -> Result<Box<dyn Fetcher>, FetchError> {
        let fetcher: Box<dyn Fetcher> = match kind {
            FetcherKind::HtmlRequests => Box::new(HttpFetcher::new()?),
            FetcherKind::HtmlWebdriver => {
                Box::new(WebDriverFetcher::new(self.config.webdriver.clone())?)
            }
            FetcherKind::HtmlPlaywright => {
                Box::new(PlaywrightFetcher::new(self.config.playwright.clone()))
            }
        };
        Ok(fetcher)
    }

    pub fn create_by_name(&self, name: &str) -> Result<Box<dyn Fetcher>, FetchError> {
        self.create(name.parse()?)
    }
}
