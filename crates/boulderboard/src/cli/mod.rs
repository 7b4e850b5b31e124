//! Command-line interface for boulderboard.
//!
//! Runs the web server and gives staff a terminal view of the competition.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CategoryArg, CompetitorCommand, ConfigCommand, LeaderboardCommand, ResetCommand,
    ServeCommand, StatusCommand,
};

/// boulderboard - Run a bouldering competition
///
/// Registers competitors, records attempts and tops per climb, and serves a
/// live leaderboard.
#[derive(Debug, Parser)]
#[command(name = "boulderboard")]
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
    /// Run the web server
    Serve(ServeCommand),

    /// Manage competitors
    #[command(subcommand)]
    Competitor(CompetitorCommand),

    /// Print the leaderboard
    Leaderboard(LeaderboardCommand),

    /// Delete all competitors, results and sections
    Reset(ResetCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
