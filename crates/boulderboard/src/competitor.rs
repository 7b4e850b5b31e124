//! Competitor records and their route results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Leaderboard category a competitor is entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    /// Men's category.
    Male,
    /// Women's category.
    Female,
    /// Gender inclusive category.
    #[default]
    Inclusive,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Self::Male, Self::Female, Self::Inclusive];

    /// Parse a stored or submitted category name.
    ///
    /// Anything that is not exactly `Male` or `Female` is entered as `Inclusive`.
    #[must_use]
    pub fn from_registration(raw: &str) -> Self {
        match raw.trim() {
            "Male" => Self::Male,
            "Female" => Self::Female,
            _ => Self::Inclusive,
        }
    }

    /// Interpret a leaderboard filter such as `m`, `women` or `all`.
    ///
    /// Returns `None` when the leaderboard should include everyone.
    #[must_use]
    pub fn from_filter(raw: Option<&str>) -> Option<Self> {
        let norm = raw?.trim().to_lowercase();
        if norm.is_empty() || norm == "all" {
            None
        } else if norm.starts_with('m') {
            Some(Self::Male)
        } else if norm.starts_with('f') {
            Some(Self::Female)
        } else {
            Some(Self::Inclusive)
        }
    }

    /// Heading used on leaderboards.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Inclusive => "Gender Inclusive",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Inclusive => write!(f, "Inclusive"),
        }
    }
}

/// A registered competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Competitor number, unique within the competition.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Leaderboard category.
    pub category: Category,
    /// When the competitor was registered.
    pub created_at: DateTime<Utc>,
}

/// Registration details for a new competitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompetitor {
    /// Requested number, or `None` to take the next free one.
    pub number: Option<u32>,
    /// Display name.
    pub name: String,
    /// Leaderboard category.
    pub category: Category,
}

impl NewCompetitor {
    /// Build a registration, trimming the name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is blank or the number is zero.
    pub fn new(number: Option<u32>, name: &str, category: Category) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_input("Competitor name is required."));
        }
        if number == Some(0) {
            return Err(Error::invalid_input("Please enter a valid competitor number."));
        }
        Ok(Self {
            number,
            name: name.to_string(),
            category,
        })
    }
}

/// Parse a competitor number typed into a form.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] unless the input is a positive integer.
pub fn parse_competitor_number(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_input("Please enter a valid competitor number."));
    }
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::invalid_input("Please enter a valid competitor number.")),
    }
}

/// A competitor's recorded result on one climb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Climb number.
    pub climb_number: u32,
    /// Attempts taken, at least 1.
    pub attempts: u32,
    /// Whether the climb was topped.
    pub topped: bool,
    /// When the result was last written.
    pub updated_at: DateTime<Utc>,
}

/// A result as submitted, before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreInput {
    /// Climb number.
    pub climb_number: u32,
    /// Attempts taken.
    pub attempts: u32,
    /// Whether the climb was topped.
    pub topped: bool,
}

impl ScoreInput {
    /// Clamp attempts into `1..=max_attempts`.
    #[must_use]
    pub fn clamped(self, max_attempts: u32) -> Self {
        Self {
            attempts: self.attempts.clamp(1, max_attempts.max(1)),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_registration() {
        assert_eq!(Category::from_registration("Male"), Category::Male);
        assert_eq!(Category::from_registration(" Female "), Category::Female);
        assert_eq!(Category::from_registration("Inclusive"), Category::Inclusive);
        assert_eq!(Category::from_registration("male"), Category::Inclusive);
        assert_eq!(Category::from_registration(""), Category::Inclusive);
    }

    #[test]
    fn test_category_from_filter() {
        assert_eq!(Category::from_filter(None), None);
        assert_eq!(Category::from_filter(Some("all")), None);
        assert_eq!(Category::from_filter(Some("")), None);
        assert_eq!(Category::from_filter(Some("M")), Some(Category::Male));
        assert_eq!(Category::from_filter(Some("men")), Some(Category::Male));
        assert_eq!(Category::from_filter(Some("female")), Some(Category::Female));
        assert_eq!(Category::from_filter(Some("inclusive")), Some(Category::Inclusive));
        assert_eq!(Category::from_filter(Some("other")), Some(Category::Inclusive));
    }

    #[test]
    fn test_category_display_round_trips_registration() {
        for category in Category::ALL {
            assert_eq!(Category::from_registration(&category.to_string()), category);
        }
    }

    #[test]
    fn test_category_label() {
        assert_eq!(Category::Inclusive.label(), "Gender Inclusive");
        assert_eq!(Category::Male.label(), "Male");
    }

    #[test]
    fn test_parse_competitor_number() {
        assert_eq!(parse_competitor_number("42").unwrap(), 42);
        assert_eq!(parse_competitor_number(" 7 ").unwrap(), 7);
        assert!(parse_competitor_number("").is_err());
        assert!(parse_competitor_number("0").is_err());
        assert!(parse_competitor_number("-3").is_err());
        assert!(parse_competitor_number("+3").is_err());
        assert!(parse_competitor_number("12a").is_err());
        assert!(parse_competitor_number("99999999999").is_err());
    }

    #[test]
    fn test_new_competitor_trims_name() {
        let c = NewCompetitor::new(None, "  Alex Honnold ", Category::Male).unwrap();
        assert_eq!(c.name, "Alex Honnold");
        assert_eq!(c.number, None);
    }

    #[test]
    fn test_new_competitor_rejects_blank_name() {
        let err = NewCompetitor::new(Some(1), "   ", Category::Inclusive).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_new_competitor_rejects_zero_number() {
        assert!(NewCompetitor::new(Some(0), "Sam", Category::Inclusive).is_err());
    }

    #[test]
    fn test_score_input_clamped() {
        let input = ScoreInput {
            climb_number: 1,
            attempts: 0,
            topped: true,
        };
        assert_eq!(input.clamped(50).attempts, 1);

        let input = ScoreInput {
            attempts: 80,
            ..input
        };
        assert_eq!(input.clamped(50).attempts, 50);
        assert_eq!(input.clamped(50).climb_number, 1);
    }
}
