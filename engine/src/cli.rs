//! CLI interface for RepoJudge
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RepoJudge evaluation engine
///
/// Scores a repository's files against a task, batches them to fit the
/// model's context and asks an LLM backend to grade the implementation.
#[derive(Parser, Debug)]
#[command(name = "repojudge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the files of a request come from
#[derive(clap::Args, Debug, Clone)]
pub struct RequestArgs {
    /// Evaluation request JSON file
    pub request: PathBuf,

    /// Load files from a local checkout instead of the request's `files`
    #[arg(long, value_name = "DIR")]
    pub repo: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full evaluation pipeline
    Evaluate {
        #[command(flatten)]
        input: RequestArgs,
    },

    /// Show how files would be batched, without calling the model
    Plan {
        #[command(flatten)]
        input: RequestArgs,
    },

    /// Rank files by relevance
    Score {
        #[command(flatten)]
        input: RequestArgs,

        /// Number of files to show
        #[arg(short, long, default_value = "20")]
        top: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["repojudge", "evaluate", "request.json"]);
        assert!(!cli.json);
        if let Command::Evaluate { input } = cli.command {
            assert_eq!(input.request, PathBuf::from("request.json"));
            assert!(input.repo.is_none());
        } else {
            panic!("Expected Evaluate command");
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "repojudge",
            "plan",
            "request.json",
            "--repo",
            "./shop",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/config.toml",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
        if let Command::Plan { input } = cli.command {
            assert_eq!(input.repo, Some(PathBuf::from("./shop")));
        } else {
            panic!("Expected Plan command");
        }
    }

    #[test]
    fn test_score_top() {
        let cli = Cli::parse_from(["repojudge", "score", "request.json", "--top", "5"]);
        if let Command::Score { top, .. } = cli.command {
            assert_eq!(top, 5);
        } else {
            panic!("Expected Score command");
        }

        let cli = Cli::parse_from(["repojudge", "score", "request.json"]);
        assert!(matches!(cli.command, Command::Score { top: 20, .. }));
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["repojudge", "config", "path"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
