use clap::{Parser, Subcommand};
use reqwest::Method;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "contentfetch")]
#[command(about = "Fetch page content through interchangeable backends", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $CONTENTFETCH_CONFIG or config/contentfetch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered fetchers in presentation order
    List,
    /// Check a fetcher's remote dependency
    Check(CheckArgs),
    /// Fetch one URL
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Fetcher name (defaults to the configured default)
    #[arg(long)]
    pub fetcher: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Absolute URL to retrieve
    pub url: String,

    /// Fetcher name (defaults to the configured default)
    #[arg(long)]
    pub fetcher: Option<String>,

    /// Timeout in seconds (defaults to fetch.timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, default_value = "GET", value_parser = parse_method)]
    pub method: Method,

    /// Request header as NAME:VALUE, repeatable
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    #[arg(long)]
    pub body: Option<String>,

    /// Print response headers before the content
    #[arg(long)]
    pub show_headers: bool,
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid method '{s}': {e}"))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
