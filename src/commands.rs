use bytes::Bytes;
use std::time::Duration;
use tracing::info;

use crate::cli::{CheckArgs, FetchArgs};
use contentfetch::config::Config;
use contentfetch::fetchers::{FetchRequest, FetcherKind, FetcherRegistry, HeadersMap};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn resolve_kind(registry: &FetcherRegistry, name: Option<&str>) -> Result<FetcherKind, AnyError> {
    match name {
        Some(name) => Ok(name.parse()?),
        None => Ok(registry.default_kind()),
    }
}

pub fn list(config: Config) {
    let registry = FetcherRegistry::new(config);
    for (name, description) in registry.available() {
        println!("{name}\t{description}");
    }
}

pub async fn check(config: Config, args: CheckArgs) -> Result<(), AnyError> {
    let registry = FetcherRegistry::new(config);
    let kind = resolve_kind(&registry, args.fetcher.as_deref())?;
    let fetcher = registry.create(kind)?;

    if !fetcher.is_ready().await? {
        return Err(format!("{kind} is not ready").into());
    }

    info!(fetcher = %kind, "Fetcher ready");
    println!("{kind}\tready");
    Ok(())
}

pub async fn fetch(config: Config, args: FetchArgs) -> Result<(), AnyError> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.fetch.timeout());
    let registry = FetcherRegistry::new(config);
    let kind = resolve_kind(&registry, args.fetcher.as_deref())?;
    let mut fetcher = registry.create(kind)?;

    let headers: HeadersMap = args.headers.into_iter().collect();
    let request = FetchRequest::builder()
        .url(args.url)
        .timeout(timeout)
        .headers(headers)
        .maybe_body(args.body.map(Bytes::from))
        .method(args.method)
        .build();

    let response = fetcher.run(&request).await?;

    if !kind.observes_status() {
        eprintln!("status: {} (assumed)", response.status_code);
    } else {
        eprintln!("status: {}", response.status_code);
    }

    if args.show_headers {
        for (name, value) in response.headers.iter() {
            println!("{name}: {value}");
        }
        println!();
    }
    println!("{}", response.content);

    Ok(())
}
