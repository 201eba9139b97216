//! Storage traits and error types
//!
//! This module defines the record store contract used by the crawler and
//! its error type.

use crate::model::{Competition, MatchDetails, Play, Player, StatGroup};
use crate::storage::{RoundHandle, RunRecord, RunStatus, StoreCounts};
use async_trait::async_trait;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Connection pool closed")]
    PoolClosed,

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True for the busy/locked class, which clears once other
    /// connections finish
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Record store contract
///
/// `ensure_*` operations create a record if its natural key is absent and
/// return its identity. `set_*`, `update_*` and `upsert_*` operations write
/// onto an existing identity and fail with `StorageError::NotFound` if there
/// is none. Every operation must be safe under concurrent calls for the
/// same key.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ===== Hierarchy =====

    /// Creates the competition if absent; an existing name is kept
    async fn ensure_competition(&self, id: i64, name: &str) -> StorageResult<()>;

    async fn ensure_season(&self, competition_id: i64, year: &str) -> StorageResult<i64>;

    /// Creates the round if absent, otherwise replaces its name
    ///
    /// The returned handle reports whether both dates are already stored.
    async fn ensure_round(&self, season_id: i64, index: u32, name: &str)
        -> StorageResult<RoundHandle>;

    /// Writes round dates that are not yet set; stored dates are never
    /// overwritten
    async fn set_round_dates(&self, round_id: i64, start: &str, end: &str) -> StorageResult<()>;

    async fn ensure_match(&self, round_id: i64, home_team: &str, away_team: &str)
        -> StorageResult<i64>;

    // ===== Match details =====

    /// Overwrites every detail field that is `Some`
    async fn update_match_details(&self, match_id: i64, details: &MatchDetails)
        -> StorageResult<()>;

    /// Upserts both team lists, keyed by (match, first name, last name)
    async fn upsert_team_lists(
        &self,
        match_id: i64,
        home: &[Player],
        away: &[Player],
    ) -> StorageResult<()>;

    /// Upserts plays, keyed by (match, index)
    async fn upsert_plays(&self, match_id: i64, plays: &[Play]) -> StorageResult<()>;

    /// Upserts one statistic group, keyed by match
    async fn upsert_stat_group(&self, match_id: i64, group: &StatGroup) -> StorageResult<()>;

    // ===== Run Management =====

    async fn begin_run(&self, config_hash: &str) -> StorageResult<i64>;

    async fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    async fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Read side =====

    /// Rebuilds the result tree of a competition from stored rows
    async fn load_competition(&self, id: i64) -> StorageResult<Option<Competition>>;

    async fn counts(&self) -> StorageResult<StoreCounts>;
}
