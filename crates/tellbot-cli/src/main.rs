//! Tellbot CLI — entry point.
//!
//! # Commands
//!
//! - `tellbot run` — connect to the configured networks and serve
//! - `tellbot status` — show configuration and state at a glance
//! - `tellbot reminders` — list the pending reminders on disk

mod reminders_cmd;
mod run;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Tellbot — a multi-network message-relay bot
#[derive(Parser)]
#[command(name = "tellbot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the configured networks and run until stopped
    Run {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and state status
    Status,

    /// List the reminders waiting for delivery
    Reminders,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { logs } => {
            init_logging(logs);
            run::run().await
        }
        Commands::Status => status::run(),
        Commands::Reminders => reminders_cmd::run(),
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("tellbot=debug,info")
    } else {
        EnvFilter::new("tellbot=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
