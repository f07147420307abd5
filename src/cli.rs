//! CLI argument parsing with subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Telegram group bot with admin-gated moderation and a Gemini relay.
#[derive(Parser)]
#[command(name = "groupkeeper")]
#[command(about = "Telegram group bot: admin-gated moderation commands and a web-grounded Gemini relay")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot
    Run,

    /// Show current configuration and usage totals
    Status,
}
