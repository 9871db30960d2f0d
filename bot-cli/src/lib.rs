//! # bot-cli
//!
//! `mbot` wiring: argument parsing, env config loading, and the run / status entry points.

pub mod cli;
pub mod config;
pub mod runner;

pub use cli::{Cli, Commands};
pub use config::{AppConfig, StoreSettings};
pub use runner::{load_status, run_bot};
