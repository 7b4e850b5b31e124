//! Error types for boulderboard.
//!
//! This module defines all error types used throughout the boulderboard crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for boulderboard operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Competition Errors ===
    /// User input was rejected.
    #[error("{message}")]
    InvalidInput {
        /// Message suitable for showing to the user.
        message: String,
    },

    /// No competitor exists with the given number.
    #[error("competitor {0} not found")]
    CompetitorNotFound(u32),

    /// A competitor with the given number already exists.
    #[error("competitor {0} already exists")]
    DuplicateCompetitor(u32),

    /// The climb is not part of the configured climb table.
    #[error("unknown climb number {0}")]
    UnknownClimb(u32),

    /// No section matched the lookup.
    #[error("section {0} not found")]
    SectionNotFound(String),

    /// The climb is already assigned to the section.
    #[error("climb {climb_number} is already in section {section}")]
    DuplicateSectionClimb {
        /// Section name.
        section: String,
        /// The climb number.
        climb_number: u32,
    },

    /// Admin credentials were missing or wrong.
    #[error("incorrect admin password")]
    Unauthorized,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for boulderboard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is caused by something the user submitted.
    ///
    /// These are recoverable by correcting the input and trying again.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::CompetitorNotFound(_)
                | Self::DuplicateCompetitor(_)
                | Self::UnknownClimb(_)
                | Self::SectionNotFound(_)
                | Self::DuplicateSectionClimb { .. }
                | Self::Unauthorized
        )
    }

    /// Check if this error means a lookup found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CompetitorNotFound(_) | Self::SectionNotFound(_))
    }
}
