//! Content retrieval backends for contentfetch
//!
//! One contract, three interchangeable backends:
//!
//! - [`HttpFetcher`] (`html_requests`) - direct HTTP client, the default
//! - [`WebDriverFetcher`] (`html_webdriver`) - remote WebDriver browser
//! - [`PlaywrightFetcher`] (`html_playwright`) - remote browser over a
//!   devtools connection
//!
//! ## Example
//!
//! ```rust,no_run
//! use contentfetch::config::Config;
//! use contentfetch::fetchers::{FetchRequest, FetcherKind, FetcherRegistry};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = FetcherRegistry::new(Config::default());
//! let mut fetcher = registry.create(FetcherKind::HtmlRequests)?;
//!
//! let request = FetchRequest::builder().url("https://example.com").build();
//! match fetcher.run(&request).await {
//!     Ok(response) => println!("{} bytes", response.content.len()),
//!     Err(e) if e.as_empty_reply().is_some() => println!("nothing there"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod encoding;
pub mod playwright;
mod registry;
pub mod requests;
mod traits;
mod types;
pub mod webdriver;

pub use playwright::PlaywrightFetcher;
pub use registry::{FetcherKind, FetcherRegistry, available_fetchers, sort_by_list_order};
pub use requests::HttpFetcher;
pub use traits::{EmptyReply, FetchError, Fetcher};
pub use types::{
    DEFAULT_TIMEOUT_SECS, FetchRequest, FetchResponse, FetchState, HeadersMap, ResponseHeaders,
};
pub use webdriver::WebDriverFetcher;
