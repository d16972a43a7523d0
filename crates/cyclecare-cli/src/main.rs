use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cyclecare-cli", version, about = "CycleCare CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cycle profile management
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Show the cycle day and phase for a date
    Phase(commands::phase::PhaseArgs),
    /// Predict upcoming periods, ovulation and fertile windows
    Forecast(commands::forecast::ForecastArgs),
    /// Reminder notifications
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Subscription tier and feature access
    Subscription {
        #[command(subcommand)]
        action: commands::subscription::SubscriptionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so `--json` output stays parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CYCLECARE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Profile { action } => commands::profile::run(action).await,
        Commands::Phase(args) => commands::phase::run(args).await,
        Commands::Forecast(args) => commands::forecast::run(args).await,
        Commands::Notify { action } => commands::notify::run(action).await,
        Commands::Subscription { action } => commands::subscription::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
