use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::Commands;

#[derive(Parser)]
#[command(name = "sluice", version, about = "Land reviewed changes onto branches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    cli.command.run().await
}
