//! CLI parser.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mbot")]
#[command(about = "Matrix bot CLI: run, status", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot loop until it exits or Ctrl-C (config from env; token can override MATRIX_ACCESS_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
        /// Move to DELETED and exit once the bot is in no room (overrides EXIT_ON_EMPTY_ROOMS).
        #[arg(long)]
        exit_on_empty_rooms: bool,
    },
    /// Print the persisted configuration row of BOT_ID.
    Status,
}
