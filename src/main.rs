use anyhow::Result;
use clap::Parser;
use schoolcomm::cli::{self, Cli, Commands};
use schoolcomm::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schoolcomm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;

    // Execute command
    match cli.command {
        Commands::Mail(cmd) => cli::mail::execute(cmd, &config, cli.format).await,
        Commands::Calendar(cmd) => cli::calendar::execute(cmd, &config, cli.format).await,
        Commands::Relay(cmd) => cli::relay::execute(cmd, &config, cli.format).await,
    }
}
