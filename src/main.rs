mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use contentfetch::config::Config;
use contentfetch::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::List => commands::list(config),
        Commands::Check(args) => commands::check(config, args).await?,
        Commands::Fetch(args) => commands::fetch(config, args).await?,
    }

    Ok(())
}
