pub mod config;
pub mod fetchers;
pub mod observability;

pub use config::Config;
pub use fetchers::{
    EmptyReply, FetchError, FetchRequest, FetchResponse, Fetcher, FetcherKind, FetcherRegistry,
};
