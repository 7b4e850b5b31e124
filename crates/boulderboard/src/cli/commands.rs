//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::competitor::Category;

/// Server command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides configuration)
    #[arg(long)]
    pub host: Option<String>,
}

/// Competitor management commands.
#[derive(Debug, Subcommand)]
pub enum CompetitorCommand {
    /// Register a competitor
    Add {
        /// Competitor name
        name: String,

        /// Competitor number (next free number if omitted)
        #[arg(short, long)]
        number: Option<u32>,

        /// Competition category
        #[arg(short = 'g', long, value_enum, default_value = "inclusive")]
        category: CategoryArg,
    },

    /// List registered competitors
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show a competitor's results
    Show {
        /// Competitor number
        number: u32,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a competitor's name or category
    Edit {
        /// Competitor number
        number: u32,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New category
        #[arg(short = 'g', long, value_enum)]
        category: Option<CategoryArg>,
    },

    /// Remove a competitor and their results
    Remove {
        /// Competitor number
        number: u32,
    },
}

/// Leaderboard command arguments.
#[derive(Debug, Args)]
pub struct LeaderboardCommand {
    /// Only rank this category
    #[arg(short = 'g', long, value_enum)]
    pub category: Option<CategoryArg>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Confirm deleting all competition data
    #[arg(short, long)]
    pub yes: bool,
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
        file: Option<PathBuf>,
    },
}

/// Category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Male category
    Male,
    /// Female category
    Female,
    /// Gender inclusive category
    Inclusive,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Male => Self::Male,
            CategoryArg::Female => Self::Female,
            CategoryArg::Inclusive => Self::Inclusive,
        }
    }
}
