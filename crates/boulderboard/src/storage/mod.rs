//! Storage layer for boulderboard.
//!
//! This module provides `SQLite`-based persistent storage for competitors,
//! their route results and the wall sections shown to competitors.

pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::competitor::{Category, Competitor, NewCompetitor, Score, ScoreInput};
use crate::error::{Error, Result};
use crate::section::{slugify, Section, SectionClimb};

/// Storage engine for competition data.
///
/// Wraps a single `SQLite` connection. It is meant for one writer at a time;
/// the web layer serialises access through a mutex.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// Row counts removed by [`Storage::delete_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    /// Competitors removed.
    pub competitors: usize,
    /// Scores removed.
    pub scores: usize,
    /// Sections removed.
    pub sections: usize,
    /// Section climbs removed.
    pub section_climbs: usize,
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Registered competitors.
    pub competitors: i64,
    /// Recorded results.
    pub scores: i64,
    /// Wall sections.
    pub sections: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Competitors ===

    /// Register a competitor.
    ///
    /// Without a requested number the competitor gets one past the highest
    /// registered number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCompetitor`] if the requested number is taken,
    /// or [`Error::InvalidInput`] when no higher number is left to assign.
    pub fn create_competitor(&self, new: &NewCompetitor) -> Result<Competitor> {
        let number = match new.number {
            Some(number) => {
                if self.competitor_exists(number)? {
                    return Err(Error::DuplicateCompetitor(number));
                }
                number
            }
            None => self.next_competitor_number()?,
        };

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO competitors (number, name, category, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                number,
                new.name,
                new.category.to_string(),
                created_at.to_rfc3339()
            ],
        )?;

        debug!("Registered competitor {number}");

        Ok(Competitor {
            number,
            name: new.name.clone(),
            category: new.category,
            created_at,
        })
    }

    fn next_competitor_number(&self) -> Result<u32> {
        let highest: i64 =
            self.conn
                .query_row("SELECT COALESCE(MAX(number), 0) FROM competitors", [], |row| {
                    row.get(0)
                })?;

        u32::try_from(highest)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| {
                Error::invalid_input("No competitor numbers left. Please choose a number.")
            })
    }

    /// Check whether a competitor number is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn competitor_exists(&self, number: u32) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM competitors WHERE number = ?1",
            [number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a competitor by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_competitor(&self, number: u32) -> Result<Option<Competitor>> {
        let competitor = self
            .conn
            .query_row(
                "SELECT number, name, category, created_at FROM competitors WHERE number = ?1",
                [number],
                Self::row_to_competitor,
            )
            .optional()?;
        Ok(competitor)
    }

    /// Get a competitor by number, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompetitorNotFound`] if no such competitor exists.
    pub fn require_competitor(&self, number: u32) -> Result<Competitor> {
        self.get_competitor(number)?
            .ok_or(Error::CompetitorNotFound(number))
    }

    /// List all competitors ordered by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_competitors(&self) -> Result<Vec<Competitor>> {
        let mut stmt = self.conn.prepare(
            "SELECT number, name, category, created_at FROM competitors ORDER BY number",
        )?;
        let competitors = stmt
            .query_map([], Self::row_to_competitor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(competitors)
    }

    /// Change a competitor's name and category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompetitorNotFound`] if no such competitor exists.
    pub fn update_competitor(&self, number: u32, name: &str, category: Category) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE competitors SET name = ?1, category = ?2 WHERE number = ?3",
            params![name, category.to_string(), number],
        )?;
        if affected == 0 {
            return Err(Error::CompetitorNotFound(number));
        }
        Ok(())
    }

    /// Delete a competitor and their scores.
    ///
    /// Returns `true` if a competitor was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_competitor(&self, number: u32) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM competitors WHERE number = ?1", [number])?;
        if affected > 0 {
            info!("Deleted competitor {number}");
        }
        Ok(affected > 0)
    }

    /// Remove every competitor, score, section and section climb.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is removed in
    /// that case.
    pub fn delete_all(&self) -> Result<ResetSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let summary = ResetSummary {
            scores: tx.execute("DELETE FROM scores", [])?,
            section_climbs: tx.execute("DELETE FROM section_climbs", [])?,
            competitors: tx.execute("DELETE FROM competitors", [])?,
            sections: tx.execute("DELETE FROM sections", [])?,
        };
        tx.commit()?;

        warn!(
            "Reset store: removed {} competitors, {} scores, {} sections",
            summary.competitors, summary.scores, summary.sections
        );
        Ok(summary)
    }

    // === Scores ===

    /// Record or replace a competitor's result on a climb.
    ///
    /// The caller is responsible for checking the climb against the climb
    /// table and for clamping attempts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompetitorNotFound`] if the competitor is not registered.
    pub fn record_score(&self, number: u32, input: ScoreInput) -> Result<Score> {
        if !self.competitor_exists(number)? {
            return Err(Error::CompetitorNotFound(number));
        }

        let updated_at = Utc::now();
        self.conn.execute(
            r"
            INSERT INTO scores (competitor_number, climb_number, attempts, topped, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (competitor_number, climb_number) DO UPDATE SET
                attempts = excluded.attempts,
                topped = excluded.topped,
                updated_at = excluded.updated_at
            ",
            params![
                number,
                input.climb_number,
                input.attempts,
                input.topped,
                updated_at.to_rfc3339()
            ],
        )?;
        debug!(
            "Recorded climb {} for competitor {number}: attempts={} topped={}",
            input.climb_number, input.attempts, input.topped
        );

        Ok(Score {
            climb_number: input.climb_number,
            attempts: input.attempts,
            topped: input.topped,
            updated_at,
        })
    }

    /// Get a competitor's results ordered by climb number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn scores_for(&self, number: u32) -> Result<Vec<Score>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT climb_number, attempts, topped, updated_at
            FROM scores WHERE competitor_number = ?1
            ORDER BY climb_number
            ",
        )?;
        let scores = stmt
            .query_map([number], Self::row_to_score)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scores)
    }

    /// Get every result, grouped by competitor number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_scores(&self) -> Result<HashMap<u32, Vec<Score>>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT competitor_number, climb_number, attempts, topped, updated_at
            FROM scores ORDER BY competitor_number, climb_number
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let number: u32 = row.get(0)?;
            let score = Score {
                climb_number: row.get(1)?,
                attempts: row.get(2)?,
                topped: row.get(3)?,
                updated_at: parse_timestamp(&row.get::<_, String>(4)?),
            };
            Ok((number, score))
        })?;

        let mut grouped: HashMap<u32, Vec<Score>> = HashMap::new();
        for row in rows {
            let (number, score) = row?;
            grouped.entry(number).or_default().push(score);
        }
        Ok(grouped)
    }

    // === Sections ===

    /// Create a section, deriving a unique slug from its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name.
    pub fn create_section(&self, name: &str) -> Result<Section> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_input("Please provide a section name."));
        }

        let base = slugify(name);
        let mut slug = base.clone();
        let mut suffix = 2;
        while self.get_section_by_slug(&slug)?.is_some() {
            slug = format!("{base}-{suffix}");
            suffix += 1;
        }

        self.conn.execute(
            "INSERT INTO sections (name, slug) VALUES (?1, ?2)",
            params![name, slug],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Created section {name} ({slug})");

        Ok(Section {
            id,
            name: name.to_string(),
            slug,
        })
    }

    /// List sections ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_sections(&self) -> Result<Vec<Section>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, slug FROM sections ORDER BY name, id")?;
        let sections = stmt
            .query_map([], Self::row_to_section)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sections)
    }

    /// Get a section by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_section(&self, id: i64) -> Result<Option<Section>> {
        let section = self
            .conn
            .query_row(
                "SELECT id, name, slug FROM sections WHERE id = ?1",
                [id],
                Self::row_to_section,
            )
            .optional()?;
        Ok(section)
    }

    /// Get a section by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_section_by_slug(&self, slug: &str) -> Result<Option<Section>> {
        let section = self
            .conn
            .query_row(
                "SELECT id, name, slug FROM sections WHERE slug = ?1",
                [slug],
                Self::row_to_section,
            )
            .optional()?;
        Ok(section)
    }

    /// Rename a section. The slug is kept so existing links stay valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name or
    /// [`Error::SectionNotFound`] if the section does not exist.
    pub fn rename_section(&self, id: i64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_input("Section name is required."));
        }
        let affected = self
            .conn
            .execute("UPDATE sections SET name = ?1 WHERE id = ?2", params![name, id])?;
        if affected == 0 {
            return Err(Error::SectionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Delete a section and its climbs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_section(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM sections WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Place a climb in a section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SectionNotFound`] or [`Error::DuplicateSectionClimb`].
    pub fn add_section_climb(
        &self,
        section_id: i64,
        climb_number: u32,
        colour: Option<&str>,
    ) -> Result<SectionClimb> {
        let section = self
            .get_section(section_id)?
            .ok_or_else(|| Error::SectionNotFound(section_id.to_string()))?;

        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM section_climbs WHERE section_id = ?1 AND climb_number = ?2",
            params![section_id, climb_number],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(Error::DuplicateSectionClimb {
                section: section.name,
                climb_number,
            });
        }

        let colour = colour.map(str::trim).filter(|c| !c.is_empty());
        self.conn.execute(
            "INSERT INTO section_climbs (section_id, climb_number, colour) VALUES (?1, ?2, ?3)",
            params![section_id, climb_number, colour],
        )?;

        Ok(SectionClimb {
            id: self.conn.last_insert_rowid(),
            section_id,
            climb_number,
            colour: colour.map(str::to_string),
        })
    }

    /// List a section's climbs ordered by climb number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_section_climbs(&self, section_id: i64) -> Result<Vec<SectionClimb>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, section_id, climb_number, colour
            FROM section_climbs WHERE section_id = ?1
            ORDER BY climb_number
            ",
        )?;
        let climbs = stmt
            .query_map([section_id], |row| {
                Ok(SectionClimb {
                    id: row.get(0)?,
                    section_id: row.get(1)?,
                    climb_number: row.get(2)?,
                    colour: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(climbs)
    }

    /// Remove a climb from a section.
    ///
    /// Returns the removed climb, or `None` if it is not in that section.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_section_climb(
        &self,
        section_id: i64,
        climb_id: i64,
    ) -> Result<Option<SectionClimb>> {
        let climb = self
            .list_section_climbs(section_id)?
            .into_iter()
            .find(|c| c.id == climb_id);
        if climb.is_some() {
            self.conn
                .execute("DELETE FROM section_climbs WHERE id = ?1", [climb_id])?;
        }
        Ok(climb)
    }

    // === Stats ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            let n = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            competitors: count("competitors")?,
            scores: count("scores")?,
            sections: count("sections")?,
            db_size_bytes,
        })
    }

    fn row_to_competitor(row: &rusqlite::Row) -> rusqlite::Result<Competitor> {
        let category: String = row.get(2)?;
        let created_at: String = row.get(3)?;
        Ok(Competitor {
            number: row.get(0)?,
            name: row.get(1)?,
            category: Category::from_registration(&category),
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_score(row: &rusqlite::Row) -> rusqlite::Result<Score> {
        let updated_at: String = row.get(3)?;
        Ok(Score {
            climb_number: row.get(0)?,
            attempts: row.get(1)?,
            topped: row.get(2)?,
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn row_to_section(row: &rusqlite::Row) -> rusqlite::Result<Section> {
        Ok(Section {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| {
            warn!("Unparseable timestamp {raw:?} in database, using now");
            Utc::now()
        },
        |dt| dt.with_timezone(&Utc),
    )
}
