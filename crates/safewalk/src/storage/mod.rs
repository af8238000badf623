//! Vote storage for safewalk.
//!
//! The [`VoteStore`] trait is the append-only contract the aggregation
//! service reads through. [`SqliteVoteStore`] is the durable
//! implementation: one `SQLite` connection behind a mutex, so concurrent
//! appends are serialized by the store and each insert is atomic.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::vote::{Classification, LocationKey, Vote, VoteId};

/// Append-only storage of votes, queryable by location key.
///
/// There is no update or delete.
pub trait VoteStore: Send + Sync + std::fmt::Debug {
    /// Store a vote and return its assigned id.
    ///
    /// Every call inserts a new row; repeated votes are all kept.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn append(&self, vote: &Vote) -> Result<VoteId>;

    /// All votes in the given bucket, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    fn find_by_key(&self, key: &LocationKey) -> Result<Vec<Vote>>;

    /// Every vote ever recorded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    fn find_all(&self) -> Result<Vec<Vote>>;
}

const SELECT_VOTE_COLUMNS: &str =
    "SELECT id, location_key, lat, lng, classification, recorded_at FROM votes";

/// `SQLite`-backed vote store.
#[derive(Debug)]
pub struct SqliteVoteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, serialized across threads.
    conn: Mutex<Connection>,
}

impl SqliteVoteStore {
    /// Open or create a vote database at the given path.
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

        debug!("Opening vote database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Vote database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("vote database lock poisoned"))
    }

    /// Count all stored votes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM votes", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<VoteStats> {
        let conn = self.conn()?;

        let (safe, unsafe_, distinct): (i64, i64, i64) = conn.query_row(
            r"
            SELECT
                COALESCE(SUM(classification = 'safe'), 0),
                COALESCE(SUM(classification = 'unsafe'), 0),
                COUNT(DISTINCT location_key)
            FROM votes
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let oldest: Option<String> = conn
            .query_row(
                "SELECT recorded_at FROM votes ORDER BY recorded_at ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest: Option<String> = conn
            .query_row(
                "SELECT recorded_at FROM votes ORDER BY recorded_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        let safe_votes = u64::try_from(safe).unwrap_or(0);
        let unsafe_votes = u64::try_from(unsafe_).unwrap_or(0);

        Ok(VoteStats {
            total_votes: safe_votes + unsafe_votes,
            safe_votes,
            unsafe_votes,
            distinct_keys: u64::try_from(distinct).unwrap_or(0),
            oldest_vote: oldest.as_deref().and_then(parse_timestamp),
            newest_vote: newest.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    /// Convert a database row to a Vote.
    fn row_to_vote(row: &rusqlite::Row) -> rusqlite::Result<Vote> {
        let id: i64 = row.get(0)?;
        let key_str: String = row.get(1)?;
        let lat: Option<f64> = row.get(2)?;
        let lng: Option<f64> = row.get(3)?;
        let classification_str: String = row.get(4)?;
        let recorded_at_str: String = row.get(5)?;

        let location_key = LocationKey::parse(&key_str).map_err(|e| conversion_error(1, &e))?;
        let classification: Classification = classification_str
            .parse()
            .map_err(|e| conversion_error(4, &e))?;
        let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
            .map_err(|e| conversion_error(5, &e))?
            .with_timezone(&Utc);

        Ok(Vote {
            id: Some(id),
            location_key,
            lat,
            lng,
            classification,
            recorded_at,
        })
    }

    fn query_votes(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Vote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let votes = stmt
            .query_map(params, Self::row_to_vote)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(votes)
    }
}

impl VoteStore for SqliteVoteStore {
    fn append(&self, vote: &Vote) -> Result<VoteId> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT INTO votes (location_key, lat, lng, classification, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                vote.location_key.as_str(),
                vote.lat,
                vote.lng,
                vote.classification.as_str(),
                vote.recorded_at.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(
            "Stored {} vote {} for {}",
            vote.classification, id, vote.location_key
        );
        Ok(id)
    }

    fn find_by_key(&self, key: &LocationKey) -> Result<Vec<Vote>> {
        self.query_votes(
            &format!("{SELECT_VOTE_COLUMNS} WHERE location_key = ?1"),
            [key.as_str()],
        )
    }

    fn find_all(&self) -> Result<Vec<Vote>> {
        self.query_votes(&format!("{SELECT_VOTE_COLUMNS} ORDER BY id"), [])
    }
}

fn conversion_error(column: usize, err: &dyn std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, err.to_string().into())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Statistics about the vote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteStats {
    /// Total number of votes stored.
    pub total_votes: u64,
    /// Number of safe votes.
    pub safe_votes: u64,
    /// Number of unsafe votes.
    pub unsafe_votes: u64,
    /// Number of distinct location keys with at least one vote.
    pub distinct_keys: u64,
    /// Timestamp of the oldest vote.
    pub oldest_vote: Option<DateTime<Utc>>,
    /// Timestamp of the newest vote.
    pub newest_vote: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::vote::LatLng;

    fn create_test_store() -> SqliteVoteStore {
        SqliteVoteStore::open_in_memory().expect("failed to create test store")
    }

    fn vote_at(lat: f64, lng: f64, classification: Classification) -> Vote {
        Vote::at(LatLng::new(lat, lng).unwrap(), classification)
    }

    #[test]
    fn test_open_in_memory() {
        let store = SqliteVoteStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_append_and_find_by_key() {
        let store = create_test_store();
        let vote = vote_at(28.613_94, 77.209_02, Classification::Safe);

        let id = store.append(&vote).unwrap();
        assert!(id > 0);

        let found = store.find_by_key(&vote.location_key).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Some(id));
        assert_eq!(found[0].classification, Classification::Safe);
        assert_eq!(found[0].lat, Some(28.613_94));
        assert_eq!(found[0].lng, Some(77.209_02));
        assert_eq!(found[0].recorded_at, vote.recorded_at);
    }

    #[test]
    fn test_append_keeps_repeat_votes() {
        let store = create_test_store();
        let vote = vote_at(1.0, 2.0, Classification::Unsafe);

        let first = store.append(&vote).unwrap();
        let second = store.append(&vote).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.find_by_key(&vote.location_key).unwrap().len(), 2);
    }

    #[test]
    fn test_append_key_only_vote() {
        let store = create_test_store();
        let key = LocationKey::parse("10.5,20.25").unwrap();
        store
            .append(&Vote::for_key(key.clone(), Classification::Safe))
            .unwrap();

        let found = store.find_by_key(&key).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].lat.is_none());
        assert!(found[0].lng.is_none());
    }

    #[test]
    fn test_find_by_key_filters() {
        let store = create_test_store();
        store
            .append(&vote_at(1.0, 1.0, Classification::Safe))
            .unwrap();
        store
            .append(&vote_at(2.0, 2.0, Classification::Safe))
            .unwrap();

        let key = LatLng::new(1.0, 1.0).unwrap().key();
        let found = store.find_by_key(&key).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location_key, key);
    }

    #[test]
    fn test_find_by_unknown_key_is_empty() {
        let store = create_test_store();
        let key = LocationKey::parse("0.00000,0.00000").unwrap();
        assert!(store.find_by_key(&key).unwrap().is_empty());
    }

    #[test]
    fn test_find_all() {
        let store = create_test_store();
        assert!(store.find_all().unwrap().is_empty());

        for i in 0..5 {
            let classification = if i % 2 == 0 {
                Classification::Safe
            } else {
                Classification::Unsafe
            };
            store
                .append(&vote_at(f64::from(i), 0.0, classification))
                .unwrap();
        }

        let all = store.find_all().unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_check_constraint_rejects_bad_classification() {
        let store = create_test_store();
        let result = store.conn().unwrap().execute(
            "INSERT INTO votes (location_key, classification, recorded_at) VALUES ('0.00000,0.00000', 'maybe', '2024-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_votes_table_has_only_vote_columns() {
        let store = create_test_store();
        let conn = store.conn().unwrap();
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('votes')").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert_eq!(
            columns,
            ["id", "location_key", "lat", "lng", "classification", "recorded_at"]
        );
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);

        store
            .append(&vote_at(1.0, 1.0, Classification::Safe))
            .unwrap();
        store
            .append(&vote_at(1.0, 1.0, Classification::Unsafe))
            .unwrap();

        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_stats_empty() {
        let store = create_test_store();
        let stats = store.stats().unwrap();

        assert_eq!(stats.total_votes, 0);
        assert_eq!(stats.distinct_keys, 0);
        assert!(stats.oldest_vote.is_none());
        assert!(stats.newest_vote.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let store = create_test_store();
        store
            .append(&vote_at(1.0, 1.0, Classification::Safe))
            .unwrap();
        store
            .append(&vote_at(1.0, 1.0, Classification::Safe))
            .unwrap();
        store
            .append(&vote_at(2.0, 2.0, Classification::Unsafe))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_votes, 3);
        assert_eq!(stats.safe_votes, 2);
        assert_eq!(stats.unsafe_votes, 1);
        assert_eq!(stats.distinct_keys, 2);
        assert!(stats.oldest_vote.is_some());
        assert!(stats.oldest_vote <= stats.newest_vote);
    }

    #[test]
    fn test_concurrent_appends_are_all_counted() {
        let store = Arc::new(create_test_store());
        let key = LatLng::new(5.0, 5.0).unwrap().key();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store
                            .append(&vote_at(5.0, 5.0, Classification::Unsafe))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.find_by_key(&key).unwrap().len(), 80);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("votes.db");

        let store = SqliteVoteStore::open(&path).unwrap();
        store
            .append(&vote_at(1.0, 1.0, Classification::Safe))
            .unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
        assert!(store.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_reopen_keeps_votes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes.db");

        {
            let store = SqliteVoteStore::open(&path).unwrap();
            store
                .append(&vote_at(3.0, 4.0, Classification::Unsafe))
                .unwrap();
        }

        let store = SqliteVoteStore::open(&path).unwrap();
        let all = store.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].classification, Classification::Unsafe);
    }
}
