//! Wall sections used to group climbs on the competitor pages.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// A named area of the wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Database identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// URL-safe identifier, unique across sections.
    pub slug: String,
}

/// A climb placed in a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionClimb {
    /// Database identifier.
    pub id: i64,
    /// Owning section.
    pub section_id: i64,
    /// Climb number from the climb table.
    pub climb_number: u32,
    /// Hold colour or grade label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

impl SectionClimb {
    /// Label such as `Yellow #12`, or `Climb #12` without a colour.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.colour {
            Some(colour) => format!("{colour} #{}", self.climb_number),
            None => format!("Climb #{}", self.climb_number),
        }
    }
}

/// Turn a section name into a slug.
///
/// ```
/// use boulderboard::section::slugify;
///
/// assert_eq!(slugify("The Cave (Left)"), "the-cave-left");
/// assert_eq!(slugify("!!!"), "section");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let slug = NON_ALPHANUMERIC.replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}
