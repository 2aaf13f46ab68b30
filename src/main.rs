mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use wayback::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Login(args) => commands::login(&config, args).await?,
        Commands::Check(args) => commands::check(&config, args).await?,
        Commands::Search(args) => commands::search(&config, args).await?,
        Commands::Save(args) => commands::save(&config, args).await?,
        Commands::Status(args) => commands::status(&config, args).await?,
        Commands::Config => commands::show_config(&config)?,
    }

    Ok(())
}
