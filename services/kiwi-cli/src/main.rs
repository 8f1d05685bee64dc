//! projectkiwi command line client.
//!
//! Lists projects and annotations, assembles super-tiles and extracts
//! task images to PNG files.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use commands::Command;
use kiwi_client::{ClientConfig, KiwiClient};

#[derive(Parser, Debug)]
#[command(name = "kiwi")]
#[command(about = "Client for the projectkiwi annotation service")]
struct Args {
    /// API key (read from PROJECTKIWI_API_KEY when omitted)
    #[arg(long, env = "PROJECTKIWI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Backend URL
    #[arg(long, env = "PROJECTKIWI_URL")]
    url: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries command output, logs go to stderr
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let mut config = ClientConfig::from_env();
    if let Some(key) = args.api_key {
        config.api_key = key;
    }
    if let Some(url) = args.url {
        config.base_url = url;
    }

    let client = KiwiClient::new(config).context("Invalid client configuration")?;
    info!(url = %client.config().api_root(), "Connected client");

    commands::run(&client, args.command).await
}
