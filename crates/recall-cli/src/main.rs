//! Recall CLI entry point.
//!
//! Binary name: `recall`
//!
//! Parses CLI arguments, resolves configuration, opens the memory store,
//! then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;

use recall_infra::config::{apply_overrides, resolve_config};
use recall_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet, cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref()).await?;
    let config = apply_overrides(config, None, cli.user.clone());
    config.validate()?;

    match cli.command {
        // Printing the config must work even when the store cannot be opened.
        Commands::Config => cli::config::show_config(&config, cli.json),
        command => {
            let state = AppState::init(config).await?;
            dispatch(&state, command, cli.json).await
        }
    }
}

async fn dispatch(state: &AppState, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Chat => cli::chat::loop_runner::run_chat_loop(state).await,
        Commands::Remember {
            user_text,
            assistant_text,
        } => cli::memory::remember(state, &user_text, &assistant_text, json).await,
        Commands::Search {
            query,
            limit,
            threshold,
            all,
        } => cli::memory::search(state, &query, limit, threshold, all, json).await,
        Commands::Stats => cli::memory::stats(state, json).await,
        Commands::Config => cli::config::show_config(&state.config, json),
    }
}
