//! Command-line interface for safewalk.
//!
//! This module provides the CLI structure for the `safewalk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    ClassificationArg, ConfigCommand, FeedbackCommand, ListCommand, RouteCommand, StatusCommand,
    VoteCommand,
};

/// safewalk - Community safety votes for walking routes
///
/// Record whether a spot felt safe or unsafe, read the community's counts
/// for any location, and plan walking routes between two points.
#[derive(Debug, Parser)]
#[command(name = "safewalk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Vote on a coordinate and show its counts
    Vote(VoteCommand),

    /// Read or vote on an existing location key
    Feedback(FeedbackCommand),

    /// List every stored vote
    List(ListCommand),

    /// Plan a walking route between two points
    Route(RouteCommand),

    /// Show vote store statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "safewalk");
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["safewalk", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["safewalk", "-q", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["safewalk", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["safewalk", "list", "-vv"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(
            parse(&["safewalk", "-q", "-vv", "status"]).verbosity(),
            Verbosity::Quiet
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = parse(&["safewalk", "status", "--config", "/tmp/sw.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sw.toml")));
    }

    #[test]
    fn test_parse_vote() {
        let cli = parse(&["safewalk", "vote", "28.6139", "77.209", "unsafe", "--json"]);
        let Command::Vote(cmd) = cli.command else {
            panic!("expected vote command");
        };
        assert!((cmd.lat - 28.6139).abs() < f64::EPSILON);
        assert!((cmd.lng - 77.209).abs() < f64::EPSILON);
        assert_eq!(cmd.classification, ClassificationArg::Unsafe);
        assert!(cmd.json);
    }

    #[test]
    fn test_parse_vote_negative_coordinates() {
        let cli = parse(&["safewalk", "vote", "-33.8688", "-151.2093", "safe"]);
        let Command::Vote(cmd) = cli.command else {
            panic!("expected vote command");
        };
        assert!(cmd.lat < 0.0);
        assert!(cmd.lng < 0.0);
    }

    #[test]
    fn test_parse_vote_rejects_unknown_classification() {
        assert!(Cli::try_parse_from(["safewalk", "vote", "1", "2", "sketchy"]).is_err());
    }

    #[test]
    fn test_parse_feedback_read_and_write() {
        let cli = parse(&["safewalk", "feedback", "28.61390,77.20900"]);
        let Command::Feedback(cmd) = cli.command else {
            panic!("expected feedback command");
        };
        assert_eq!(cmd.key, "28.61390,77.20900");
        assert!(cmd.classification.is_none());

        let cli = parse(&["safewalk", "feedback", "28.61390,77.20900", "safe"]);
        let Command::Feedback(cmd) = cli.command else {
            panic!("expected feedback command");
        };
        assert_eq!(cmd.classification, Some(ClassificationArg::Safe));
    }

    #[test]
    fn test_parse_route() {
        let cli = parse(&["safewalk", "route", "1.0", "2.0", "3.0", "4.0"]);
        let Command::Route(cmd) = cli.command else {
            panic!("expected route command");
        };
        assert_eq!(cmd.from(), (1.0, 2.0));
        assert_eq!(cmd.to(), (3.0, 4.0));
        assert!(!cmd.json);
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["safewalk", "config", "validate", "--file", "alt.toml"]);
        let Command::Config(ConfigCommand::Validate { file }) = cli.command else {
            panic!("expected config validate");
        };
        assert_eq!(file, Some(PathBuf::from("alt.toml")));
    }
}
