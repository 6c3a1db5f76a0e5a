use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod bus;
mod commands;

#[derive(Parser)]
#[command(name = "pactbus", about = "Event bus with listener-group fan-out")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "PACTBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the user search projection up to date
    Project(commands::project::ProjectArgs),
    /// Register a user and publish the resulting event
    Publish(commands::publish::PublishArgs),
    /// Print events of one type as JSON lines
    Sniff(commands::sniff::SniffArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = bus::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Project(args) => commands::project::run(args, &config).await,
        Commands::Publish(args) => commands::publish::run(args, &config).await,
        Commands::Sniff(args) => commands::sniff::run(args, &config).await,
    }
}
