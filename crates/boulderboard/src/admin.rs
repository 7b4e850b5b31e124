//! Password-gated administration.
//!
//! Admin actions are plain values applied to a [`Storage`]; the web panel
//! builds them from form posts after checking the password with [`AdminGate`].

use tracing::{info, warn};

use crate::competitor::{Category, NewCompetitor};
use crate::error::{Error, Result};
use crate::scoring::ScoringRules;
use crate::storage::Storage;

/// Checks submitted admin passwords.
///
/// Only a blake3 digest of the configured password is kept. Comparing digests
/// makes the check constant time.
#[derive(Clone)]
pub struct AdminGate {
    digest: Option<blake3::Hash>,
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl AdminGate {
    /// Create a gate for the configured password.
    ///
    /// A missing or empty password disables admin access entirely.
    #[must_use]
    pub fn new(password: Option<&str>) -> Self {
        let digest = password
            .filter(|p| !p.is_empty())
            .map(|p| blake3::hash(p.as_bytes()));
        Self { digest }
    }

    /// Whether any password is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    /// Check a submitted password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the password is wrong or admin
    /// access is disabled.
    pub fn check(&self, candidate: &str) -> Result<()> {
        match &self.digest {
            Some(expected) if *expected == blake3::hash(candidate.as_bytes()) => Ok(()),
            Some(_) => {
                warn!("Rejected admin action: incorrect password");
                Err(Error::Unauthorized)
            }
            None => {
                warn!("Rejected admin action: no admin password configured");
                Err(Error::Unauthorized)
            }
        }
    }
}

/// Actions on the main admin panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    /// Remove all competitors, scores and sections.
    ResetAll,
    /// Remove one competitor and their scores.
    DeleteCompetitor(u32),
    /// Register a competitor.
    CreateCompetitor(NewCompetitor),
    /// Correct a competitor's name and category.
    UpdateCompetitor {
        /// Competitor number.
        number: u32,
        /// New display name.
        name: String,
        /// New category.
        category: Category,
    },
    /// Create a wall section.
    CreateSection(String),
}

/// Actions on the section editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionAction {
    /// Rename the section.
    Rename(String),
    /// Place a climb in the section.
    AddClimb {
        /// Climb number from the climb table.
        climb_number: u32,
        /// Optional colour label.
        colour: Option<String>,
    },
    /// Remove a climb from the section by its row id.
    DeleteClimb(i64),
    /// Delete the section and its climbs.
    Delete,
}

/// Apply an admin action, returning a message for the admin.
///
/// # Errors
///
/// Returns [`Error::CompetitorNotFound`] when deleting a competitor that does
/// not exist (nothing is changed), or any storage error.
pub fn apply(storage: &Storage, action: &AdminAction) -> Result<String> {
    match action {
        AdminAction::ResetAll => {
            storage.delete_all()?;
            Ok("All competitors, scores, sections, and section climbs have been deleted."
                .to_string())
        }
        AdminAction::DeleteCompetitor(number) => {
            if storage.delete_competitor(*number)? {
                Ok(format!(
                    "Competitor {number} and their scores have been deleted."
                ))
            } else {
                Err(Error::CompetitorNotFound(*number))
            }
        }
        AdminAction::CreateCompetitor(new) => {
            let competitor = storage.create_competitor(new)?;
            info!("Admin registered competitor {}", competitor.number);
            Ok(format!(
                "Competitor created: {} (#{}, {})",
                competitor.name, competitor.number, competitor.category
            ))
        }
        AdminAction::UpdateCompetitor {
            number,
            name,
            category,
        } => {
            storage.update_competitor(*number, name, *category)?;
            Ok(format!("Competitor {number} updated: {name} ({category})"))
        }
        AdminAction::CreateSection(name) => {
            let section = storage.create_section(name)?;
            Ok(format!(
                "Section created: {}. You can now add climbs via Edit.",
                section.name
            ))
        }
    }
}

/// Apply a section editor action, returning a message for the admin.
///
/// # Errors
///
/// Returns [`Error::UnknownClimb`] when adding a climb outside the climb
/// table, [`Error::SectionNotFound`] for missing sections or climbs, or any
/// storage error.
pub fn apply_to_section(
    storage: &Storage,
    rules: &ScoringRules,
    section_id: i64,
    action: &SectionAction,
) -> Result<String> {
    let section = storage
        .get_section(section_id)?
        .ok_or_else(|| Error::SectionNotFound(section_id.to_string()))?;

    match action {
        SectionAction::Rename(name) => {
            storage.rename_section(section.id, name)?;
            Ok("Section name updated.".to_string())
        }
        SectionAction::AddClimb {
            climb_number,
            colour,
        } => {
            if !rules.is_known_climb(*climb_number) {
                return Err(Error::UnknownClimb(*climb_number));
            }
            storage.add_section_climb(section.id, *climb_number, colour.as_deref())?;
            Ok(format!("Climb {climb_number} added to {}.", section.name))
        }
        SectionAction::DeleteClimb(climb_id) => {
            match storage.delete_section_climb(section.id, *climb_id)? {
                Some(climb) => Ok(format!(
                    "Climb {} removed from {}.",
                    climb.climb_number, section.name
                )),
                None => Err(Error::invalid_input("Climb not found in this section.")),
            }
        }
        SectionAction::Delete => {
            storage.delete_section(section.id)?;
            Ok(format!("Section {} deleted.", section.name))
        }
    }
}
