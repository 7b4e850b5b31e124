//! Shared application state for the web handlers.
//!
//! Holds the store behind an async mutex, the scoring rules and the admin
//! gate. Score submission is validated here so the form and JSON routes
//! behave the same.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::admin::AdminGate;
use crate::competitor::{Score, ScoreInput};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scoring::ScoringRules;
use crate::storage::Storage;

/// Shared state handed to every request handler.
#[derive(Debug)]
pub struct AppState {
    /// The competition database. One connection, one writer at a time.
    pub storage: Mutex<Storage>,
    /// Scoring rules built from configuration.
    pub rules: ScoringRules,
    /// Admin password check.
    pub admin: AdminGate,
}

impl AppState {
    /// Build the state from an opened store and the loaded configuration.
    #[must_use]
    pub fn new(storage: Storage, config: &Config) -> Arc<Self> {
        let rules = ScoringRules::from(&config.scoring);
        let admin = AdminGate::new(config.admin.password.as_deref());

        if rules.climb_numbers().next().is_none() {
            warn!("No climbs configured; every score submission will be rejected");
        }
        if !admin.is_enabled() {
            warn!("No admin password configured; admin actions are disabled");
        }
        info!(
            "Scoring {} climbs, counting best {}",
            rules.climb_numbers().count(),
            rules.count_best()
        );

        Arc::new(Self {
            storage: Mutex::new(storage),
            rules,
            admin,
        })
    }

    /// Validate and store a result, returning it with its points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a zero climb number,
    /// [`Error::UnknownClimb`] for climbs outside the table and
    /// [`Error::CompetitorNotFound`] for unregistered competitors.
    pub async fn submit_score(&self, number: u32, input: ScoreInput) -> Result<(Score, u32)> {
        if number == 0 || input.climb_number == 0 {
            return Err(Error::invalid_input("Invalid competitor or climb number"));
        }
        if !self.rules.is_known_climb(input.climb_number) {
            return Err(Error::UnknownClimb(input.climb_number));
        }

        let input = input.clamped(self.rules.max_attempts());
        let score = self.storage.lock().await.record_score(number, input)?;
        let points = self
            .rules
            .points_for(score.climb_number, score.attempts, score.topped);
        Ok((score, points))
    }
}
