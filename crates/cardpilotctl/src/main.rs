//! CardPilot Control - CLI for the card replacement agent
//!
//! Wraps the turn pipeline in an interactive chat session and exposes a
//! profile view. The session state lives here; the pipeline only sees one
//! turn at a time.

mod chat;
mod profile_cmd;

use anyhow::Result;
use cardpilot_common::DEFAULT_PROFILE_PATH;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cardpilotctl")]
#[command(about = "CardPilot - card replacement support agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the user profile JSON (or set CARDPILOT_PROFILE)
    #[arg(long, global = true, env = "CARDPILOT_PROFILE", default_value = DEFAULT_PROFILE_PATH)]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive replacement/cancellation session
    Chat {
        /// Show agent internals (plan, thoughts, events) after each turn
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the user profile: cards on file and default address
    Profile,
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { verbose } => chat::run(&cli.profile, verbose),
        Commands::Profile => profile_cmd::run(&cli.profile),
    }
}
