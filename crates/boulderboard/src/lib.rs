//! `boulderboard` - scoring and leaderboards for bouldering competitions
//!
//! Competitors are registered with a number and a category, log attempts and
//! tops per climb, and are ranked on a live leaderboard. Staff manage the
//! competition through password-gated admin pages.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod admin;
pub mod cli;
pub mod competitor;
pub mod config;
pub mod error;
pub mod logging;
pub mod scoring;
pub mod section;
pub mod storage;
pub mod web;

pub use competitor::{Category, Competitor, NewCompetitor, Score, ScoreInput};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use scoring::{build_leaderboard, Leaderboard, ScoringRules};
pub use storage::{Storage, StorageStats};
