//! `SQLite` schema definitions for the vote store.

/// SQL statement to create the votes table.
///
/// Rows are only ever inserted. `lat`/`lng` are NULL for votes submitted
/// by location key.
pub const CREATE_VOTES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS votes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_key TEXT NOT NULL,
    lat REAL,
    lng REAL,
    classification TEXT NOT NULL CHECK (classification IN ('safe', 'unsafe')),
    recorded_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `location_key` for aggregation.
pub const CREATE_KEY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_votes_location_key ON votes(location_key)
";

/// SQL statement to create an index on `recorded_at` for stats queries.
pub const CREATE_RECORDED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_votes_recorded_at ON votes(recorded_at)
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
    CREATE_VOTES_TABLE,
    CREATE_KEY_INDEX,
    CREATE_RECORDED_AT_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_votes_table_columns() {
        assert!(CREATE_VOTES_TABLE.contains("location_key TEXT NOT NULL"));
        assert!(CREATE_VOTES_TABLE.contains("classification TEXT NOT NULL"));
        assert!(CREATE_VOTES_TABLE.contains("recorded_at TEXT NOT NULL"));
        assert!(CREATE_VOTES_TABLE.contains("lat REAL"));
    }

    #[test]
    fn test_votes_table_restricts_classification() {
        assert!(CREATE_VOTES_TABLE.contains("CHECK (classification IN ('safe', 'unsafe'))"));
    }
}
