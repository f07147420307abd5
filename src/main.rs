//! groupkeeper - CLI entry point.
//!
//! Provides subcommands to run the bot and to inspect its configuration.

use anyhow::{Context, Result};
use clap::Parser;
use groupkeeper::cli::{Cli, Commands};
use groupkeeper::config::Config;
use groupkeeper::usage::JsonlUsageLog;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            groupkeeper::bot::run(cli.config)
                .await
                .context("Failed to run Telegram bot")?;
        }
        Commands::Status => {
            print_status(cli.config).await?;
        }
    }

    Ok(())
}

/// Print configuration status.
async fn print_status(config_path: Option<PathBuf>) -> Result<()> {
    println!("📊 groupkeeper status\n");

    match Config::load(config_path) {
        Ok(config) => {
            println!("✅ Configuration: Found");
            println!();
            println!("📱 Telegram:");
            println!("   Token: {}", mask(&config.telegram.bot_token));
            println!(
                "   Username: {}",
                config
                    .telegram
                    .bot_username
                    .as_deref()
                    .unwrap_or("(resolved at startup)")
            );
            println!();
            println!("✨ Gemini:");
            println!("   Model: {}", config.gemini.model);
            println!("   Timeout: {}s", config.gemini.timeout_seconds);
            println!();

            let usage = JsonlUsageLog::new(Some(config.usage_log_path.clone()));
            println!("📈 Usage log: {}", usage.path().display());
            let totals = usage
                .summarize()
                .await
                .context("Failed to read usage log")?;
            if totals.is_empty() {
                println!("   No usage recorded yet");
            }
            for (feature, count) in totals {
                println!("   {}: {}", feature, count);
            }
        }
        Err(e) => {
            println!("❌ Configuration: Not found or invalid");
            println!("   Error: {}", e);
            println!();
            println!("Create config at ~/.groupkeeper/config.json:");
            println!(
                r#"  {{"telegram": {{"bot_token": "..."}}, "gemini": {{"api_key": "..."}}}}"#
            );
        }
    }

    Ok(())
}

/// Show only the last four characters of a secret.
fn mask(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", visible)
}
