//! CLI command definitions for the `recall` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod config;
pub mod memory;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chat with long-term memory, and inspect what is remembered.
#[derive(Parser)]
#[command(name = "recall", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read configuration from this file instead of `{data_dir}/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Whose memories to use (overrides config and RECALL_USER_ID).
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Export tracing spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat that remembers past conversations.
    Chat,

    /// Store a user/assistant exchange directly.
    Remember {
        /// What the user said.
        #[arg(value_name = "USER_TEXT")]
        user_text: String,
        /// What the assistant answered.
        #[arg(value_name = "ASSISTANT_TEXT")]
        assistant_text: String,
    },

    /// Show memories similar to a query, with their scores.
    Search {
        /// Text to search for.
        query: String,

        /// Maximum number of candidates (defaults to memory_top_k).
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Only show memories scoring above this (defaults to memory_threshold).
        #[arg(long, short = 't')]
        threshold: Option<f32>,

        /// Show every candidate, ignoring the threshold.
        #[arg(long, conflicts_with = "threshold")]
        all: bool,
    },

    /// Show how many memories are stored.
    Stats,

    /// Print the effective configuration.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_flags() {
        let cli = Cli::try_parse_from([
            "recall", "search", "我的名字", "-n", "5", "--threshold", "0.8", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Search {
                query,
                limit,
                threshold,
                all,
            } => {
                assert_eq!(query, "我的名字");
                assert_eq!(limit, Some(5));
                assert_eq!(threshold, Some(0.8));
                assert!(!all);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_remember_and_globals() {
        let cli = Cli::try_parse_from([
            "recall", "-vv", "--user", "xiaoming", "remember", "我叫小明", "你好小明！",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.user.as_deref(), Some("xiaoming"));
        match cli.command {
            Commands::Remember {
                user_text,
                assistant_text,
            } => {
                assert_eq!(user_text, "我叫小明");
                assert_eq!(assistant_text, "你好小明！");
            }
            _ => panic!("expected remember"),
        }
    }

    #[test]
    fn test_remember_text_does_not_set_user() {
        let cli = Cli::try_parse_from(["recall", "remember", "我叫小明", "你好小明！"]).unwrap();
        assert_eq!(cli.user, None);
        assert!(matches!(
            cli.command,
            Commands::Remember { ref user_text, .. } if user_text == "我叫小明"
        ));
    }

    #[test]
    fn test_all_conflicts_with_threshold() {
        assert!(
            Cli::try_parse_from(["recall", "search", "q", "--all", "-t", "0.5"]).is_err()
        );
    }
}
