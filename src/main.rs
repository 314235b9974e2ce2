//! CLI entry point for the deep research chat client.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenvy::dotenv;

use deepresearch_cli::chat::ChatLoop;
use deepresearch_cli::client::BackendClient;
use deepresearch_cli::config::Config;
use deepresearch_cli::logging;
use deepresearch_cli::stream::SessionOutcome;

#[derive(Parser, Debug)]
#[command(
    name = "deepresearch",
    version,
    about = "Chat with the deep research agent",
    long_about = "Command-line chat client for the deep research agent backend.\n\n\
                  Just run 'deepresearch' to start chatting."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Send a one-shot prompt (non-interactive)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Backend base URL (overrides config file and environment)
    #[arg(long)]
    backend_url: Option<String>,

    /// Comma-separated tools to offer the backend for this run
    #[arg(long)]
    tools: Option<String>,

    /// Answer directly with at most one tool call instead of deep research
    #[arg(long)]
    regular: bool,

    /// Path to an alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log to stderr at debug level instead of the log file
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tools the backend offers
    Tools,
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.backend_url_override = cli.backend_url.clone();
    if cli.regular {
        config.deep_research = Some(false);
    }
    if let Some(tools) = &cli.tools {
        config.tools = Some(
            tools
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        );
    }
    config.validate()?;

    logging::init(config.log_file().as_deref(), cli.verbose)?;
    let client = BackendClient::new(&config)?;

    match cli.command {
        Some(Commands::Tools) => {
            let info = client.list_tools().await?;
            println!("{}", "Available tools:".bold());
            for tool in &info.available_tools {
                let marker = if info.configured_tools.contains(tool) {
                    "enabled".green()
                } else {
                    "disabled".dimmed()
                };
                println!("  {tool} ({marker})");
            }
        }
        Some(Commands::Health) => {
            let health = client.health().await?;
            let version = health.version.unwrap_or_else(|| "unknown".to_string());
            println!("backend is {} (version {version})", health.status.green());
        }
        None => {
            let mut chat = ChatLoop::new(client, config.tools(), config.deep_research());
            match &cli.prompt {
                Some(prompt) => match chat.run_turn(prompt).await? {
                    SessionOutcome::Completed => {}
                    SessionOutcome::Failed => std::process::exit(1),
                    SessionOutcome::Cancelled => std::process::exit(130),
                },
                None => chat.run_repl().await?,
            }
        }
    }

    Ok(())
}
