mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use evsync_core::config::{Profile, SyncConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "evsync")]
#[command(about = "Forward newly created Action Network events to a Google calendar")]
struct Cli {
    /// Use the test profile instead of production
    #[arg(long, global = true)]
    test: bool,

    /// Config file to use instead of the profile's
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging and full upstream errors
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Confirm each event before it is sent
    Manual,
    /// Send every new event without asking
    Auto,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty record store for the profile
    Init,
    /// Fetch new events and forward them to the calendar
    Sync {
        /// Source filter, e.g. "created_date gt '2025-01-01'"
        #[arg(short, long)]
        filter: Option<String>,

        /// Forwarding mode; `-m` alone means manual
        #[arg(short, long, value_enum, num_args = 0..=1, default_missing_value = "manual", default_value = "auto")]
        mode: Mode,

        /// Record new events in the store without sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show a random event that has not been forwarded yet
    Recall {
        /// Offer to forward the recalled event
        #[arg(long)]
        submit: bool,
    },
    /// Mark an event as forwarded without sending it
    Resolve { key: String },
    /// Print the record store
    Dump {
        /// Only show events that have not been forwarded
        #[arg(long)]
        pending: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let profile = if cli.test { Profile::Test } else { Profile::Production };
    let config = SyncConfig::load(profile, cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::init::run(&config),
        Commands::Sync {
            filter,
            mode,
            dry_run,
        } => commands::sync::run(&config, filter.as_deref(), mode, dry_run, cli.verbose).await,
        Commands::Recall { submit } => commands::recall::run(&config, submit, cli.verbose).await,
        Commands::Resolve { key } => commands::resolve::run(&config, &key),
        Commands::Dump { pending } => commands::dump::run(&config, pending),
    }
}
