//! Hinge CLI - drive campaigns of the hinge turn engine from a terminal.
//!
//! Campaign state lives under the data directory; every command opens it,
//! does one thing and exits. `hinge serve` exposes the same store over HTTP.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod config;

use commands::{campaign, config as config_cmd, serve, turn};
use config::Config;

/// Hinge CLI - deterministic turns for a narrative campaign.
#[derive(Parser, Debug)]
#[command(
    name = "hinge",
    author,
    version,
    about = "Hinge: deterministic turn resolution for narrative campaigns",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Campaign data directory (overrides HINGE_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a campaign from a seed file (the bundled sample by default).
    New {
        /// Campaign id.
        id: String,

        /// Seed file (JSON) with the authored starting state.
        #[arg(long)]
        seed_file: Option<PathBuf>,

        /// Root rng seed, overriding the seed file's.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List campaigns.
    List,

    /// Show a campaign's current state.
    Status {
        id: String,

        /// Print the full view as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Preview an action without changing anything.
    Propose {
        id: String,

        /// Action payload as JSON, or @path to a JSON file.
        #[arg(short, long)]
        payload: String,
    },

    /// Resolve and commit an action.
    Act {
        id: String,

        /// Action payload as JSON, or @path to a JSON file.
        #[arg(short, long)]
        payload: String,

        /// Idempotency key; a fresh one is generated when absent.
        #[arg(long)]
        action_id: Option<String>,

        /// Version the action was built against; defaults to the current one.
        #[arg(long)]
        state_version: Option<u64>,

        /// Wait for and print the narration.
        #[arg(long)]
        narrate: bool,

        /// Print the turn result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show recorded hinge moments.
    Hinges { id: String },

    /// Show the audit log.
    Log {
        id: String,

        /// Only the last N events.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete a campaign and its receipts.
    Delete { id: String },

    /// Serve the REST + WebSocket API.
    Serve {
        /// Port to listen on (overrides HINGE_PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::New { id, seed_file, seed } => {
            campaign::create(&config, &id, seed_file.as_deref(), seed)?;
        }
        Commands::List => campaign::list(&config)?,
        Commands::Status { id, json } => campaign::status(&config, &id, json)?,
        Commands::Propose { id, payload } => turn::propose(&config, &id, &payload)?,
        Commands::Act {
            id,
            payload,
            action_id,
            state_version,
            narrate,
            json,
        } => {
            let options = turn::ActOptions {
                action_id,
                state_version,
                narrate,
                json,
            };
            turn::act(&config, &id, &payload, options).await?;
        }
        Commands::Hinges { id } => campaign::hinges(&config, &id)?,
        Commands::Log { id, limit } => campaign::log(&config, &id, limit)?,
        Commands::Delete { id } => campaign::delete(&config, &id)?,
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            serve::execute(&config, port).await?;
        }
        Commands::Config(ConfigCommands::Show) => config_cmd::show(&config)?,
        Commands::Config(ConfigCommands::Path) => {
            if let Some(path) = Config::config_file_path() {
                println!("{}", path.display());
            } else {
                println!("(no config file path available)");
            }
        }
    }
    Ok(())
}
