//! `SQLite` schema definitions for boulderboard.

/// SQL statement to create the competitors table.
///
/// `number` is the rowid, so inserting `NULL` assigns the next free number.
pub const CREATE_COMPETITORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS competitors (
    number INTEGER PRIMARY KEY CHECK (number BETWEEN 1 AND 4294967295),
    name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'Inclusive',
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the scores table.
pub const CREATE_SCORES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    competitor_number INTEGER NOT NULL
        REFERENCES competitors(number) ON DELETE CASCADE,
    climb_number INTEGER NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 1,
    topped INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    UNIQUE (competitor_number, climb_number)
)
";

/// SQL statement to create an index for per-competitor score lookups.
pub const CREATE_SCORES_COMPETITOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_scores_competitor ON scores(competitor_number)
";

/// SQL statement to create the sections table.
pub const CREATE_SECTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE
)
";

/// SQL statement to create the section climbs table.
pub const CREATE_SECTION_CLIMBS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS section_climbs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    section_id INTEGER NOT NULL
        REFERENCES sections(id) ON DELETE CASCADE,
    climb_number INTEGER NOT NULL,
    colour TEXT,
    UNIQUE (section_id, climb_number)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_COMPETITORS_TABLE,
    CREATE_SCORES_TABLE,
    CREATE_SCORES_COMPETITOR_INDEX,
    CREATE_SECTIONS_TABLE,
    CREATE_SECTION_CLIMBS_TABLE,
    CREATE_METADATA_TABLE,
];
