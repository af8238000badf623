//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::vote::Classification;

/// Vote command arguments.
#[derive(Debug, Args)]
pub struct VoteCommand {
    /// Latitude in degrees
    #[arg(allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(allow_negative_numbers = true)]
    pub lng: f64,

    /// How the spot felt
    #[arg(value_enum)]
    pub classification: ClassificationArg,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Feedback command arguments.
#[derive(Debug, Args)]
pub struct FeedbackCommand {
    /// Location key, e.g. "28.61390,77.20900"
    #[arg(allow_hyphen_values = true)]
    pub key: String,

    /// Record a vote for the key before reading it back
    #[arg(value_enum)]
    pub classification: Option<ClassificationArg>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Route command arguments.
#[derive(Debug, Args)]
pub struct RouteCommand {
    /// Start latitude
    #[arg(allow_negative_numbers = true)]
    pub from_lat: f64,

    /// Start longitude
    #[arg(allow_negative_numbers = true)]
    pub from_lng: f64,

    /// Destination latitude
    #[arg(allow_negative_numbers = true)]
    pub to_lat: f64,

    /// Destination longitude
    #[arg(allow_negative_numbers = true)]
    pub to_lng: f64,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl RouteCommand {
    /// Start point as (latitude, longitude).
    #[must_use]
    pub fn from(&self) -> (f64, f64) {
        (self.from_lat, self.from_lng)
    }

    /// Destination as (latitude, longitude).
    #[must_use]
    pub fn to(&self) -> (f64, f64) {
        (self.to_lat, self.to_lng)
    }
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Classification argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassificationArg {
    /// The spot felt safe
    Safe,
    /// The spot felt unsafe
    Unsafe,
}

impl From<ClassificationArg> for Classification {
    fn from(arg: ClassificationArg) -> Self {
        match arg {
            ClassificationArg::Safe => Self::Safe,
            ClassificationArg::Unsafe => Self::Unsafe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_arg_conversion() {
        assert_eq!(
            Classification::from(ClassificationArg::Safe),
            Classification::Safe
        );
        assert_eq!(
            Classification::from(ClassificationArg::Unsafe),
            Classification::Unsafe
        );
    }

    #[test]
    fn test_route_command_points() {
        let cmd = RouteCommand {
            from_lat: -1.0,
            from_lng: 2.0,
            to_lat: 3.0,
            to_lng: -4.0,
            json: false,
        };
        assert_eq!(cmd.from(), (-1.0, 2.0));
        assert_eq!(cmd.to(), (3.0, -4.0));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
