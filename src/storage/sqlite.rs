//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore
//! trait. Every operation takes a slot from a bounded connection pool, opens
//! its own connection (retrying on busy/locked), and runs on the blocking
//! thread pool.

use crate::config::DatabaseConfig;
use crate::crawler::ConnectRetry;
use crate::model::{
    Attack, Competition, Defence, Kicking, Match, MatchDetails, MatchStats, NegativePlays, Pair,
    Passing, Play, Player, PossessionCompletion, Round, Season, Side, StatGroup,
};
use crate::storage::schema::{initialize_schema, STAT_TABLES};
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::{RoundHandle, RunRecord, RunStatus, StoreCounts};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{FromSql, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite record store
pub struct SqliteStore {
    path: PathBuf,
    pool: Arc<Semaphore>,
    retry: ConnectRetry,
}

impl SqliteStore {
    /// Opens the database described by the configuration
    pub fn open(config: &DatabaseConfig) -> StorageResult<Self> {
        Self::with_options(
            Path::new(&config.path),
            config.max_connections as usize,
            ConnectRetry::new(Duration::from_secs(config.connect_deadline_secs)),
        )
    }

    /// Opens or creates the database at `path` and initializes the schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `max_connections` - Upper bound on simultaneously open connections
    /// * `retry` - Policy for establishing each connection
    pub fn with_options(
        path: &Path,
        max_connections: usize,
        retry: ConnectRetry,
    ) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL persists in the file, so it is only set here
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            path: path.to_path_buf(),
            pool: Arc::new(Semaphore::new(max_connections.max(1))),
            retry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` on a fresh pooled connection
    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let _slot = self
            .pool
            .acquire()
            .await
            .map_err(|_| StorageError::PoolClosed)?;

        let conn = self
            .retry
            .run(|| connect(self.path.clone()), StorageError::is_transient)
            .await?;

        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            op(&mut conn)
        })
        .await?
    }
}

async fn connect(path: PathBuf) -> StorageResult<Connection> {
    tokio::task::spawn_blocking(move || open_connection(&path)).await?
}

fn open_connection(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;
    Ok(conn)
}

#[async_trait]
impl RecordStore for SqliteStore {
    // ===== Hierarchy =====

    async fn ensure_competition(&self, id: i64, name: &str) -> StorageResult<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO competitions (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
                params![id, name],
            )?;
            Ok(())
        })
        .await
    }

    async fn ensure_season(&self, competition_id: i64, year: &str) -> StorageResult<i64> {
        let year = year.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO seasons (competition_id, year) VALUES (?1, ?2)
                 ON CONFLICT(competition_id, year) DO NOTHING",
                params![competition_id, year],
            )?;
            let id = conn.query_row(
                "SELECT id FROM seasons WHERE competition_id = ?1 AND year = ?2",
                params![competition_id, year],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
    }

    async fn ensure_round(
        &self,
        season_id: i64,
        index: u32,
        name: &str,
    ) -> StorageResult<RoundHandle> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO rounds (season_id, round_index, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(season_id, round_index) DO UPDATE SET name = excluded.name",
                params![season_id, index, name],
            )?;
            let handle = conn.query_row(
                "SELECT id, start_day IS NOT NULL AND end_day IS NOT NULL
                 FROM rounds WHERE season_id = ?1 AND round_index = ?2",
                params![season_id, index],
                |row| {
                    Ok(RoundHandle {
                        id: row.get(0)?,
                        dates_set: row.get(1)?,
                    })
                },
            )?;
            Ok(handle)
        })
        .await
    }

    async fn set_round_dates(&self, round_id: i64, start: &str, end: &str) -> StorageResult<()> {
        let start = start.to_string();
        let end = end.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE rounds SET start_day = COALESCE(start_day, ?1), end_day = COALESCE(end_day, ?2)
                 WHERE id = ?3",
                params![start, end, round_id],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound {
                    entity: "round",
                    id: round_id,
                });
            }
            Ok(())
        })
        .await
    }

    async fn ensure_match(
        &self,
        round_id: i64,
        home_team: &str,
        away_team: &str,
    ) -> StorageResult<i64> {
        let home_team = home_team.to_string();
        let away_team = away_team.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO matches (round_id, home_team, away_team) VALUES (?1, ?2, ?3)
                 ON CONFLICT(round_id, home_team, away_team) DO NOTHING",
                params![round_id, home_team, away_team],
            )?;
            let id = conn.query_row(
                "SELECT id FROM matches WHERE round_id = ?1 AND home_team = ?2 AND away_team = ?3",
                params![round_id, home_team, away_team],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
    }

    // ===== Match details =====

    async fn update_match_details(
        &self,
        match_id: i64,
        details: &MatchDetails,
    ) -> StorageResult<()> {
        let details = details.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE matches SET
                    home_score = COALESCE(?1, home_score),
                    away_score = COALESCE(?2, away_score),
                    location = COALESCE(?3, location),
                    date_played = COALESCE(?4, date_played),
                    weather = COALESCE(?5, weather)
                 WHERE id = ?6",
                params![
                    details.home_score,
                    details.away_score,
                    details.location,
                    details.date_played,
                    details.weather,
                    match_id
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound {
                    entity: "match",
                    id: match_id,
                });
            }
            Ok(())
        })
        .await
    }

    async fn upsert_team_lists(
        &self,
        match_id: i64,
        home: &[Player],
        away: &[Player],
    ) -> StorageResult<()> {
        let home = home.to_vec();
        let away = away.to_vec();
        self.with_conn(move |conn| {
            require_match(conn, match_id)?;

            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO players (match_id, first_name, last_name, position, number, side)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(match_id, first_name, last_name) DO UPDATE SET
                        position = excluded.position,
                        number = excluded.number,
                        side = excluded.side",
                )?;

                for (side, players) in [(Side::Home, &home), (Side::Away, &away)] {
                    for player in players
                        .iter()
                        .filter(|p| !p.first_name.is_empty() || !p.last_name.is_empty())
                    {
                        stmt.execute(params![
                            match_id,
                            player.first_name,
                            player.last_name,
                            player.position,
                            player.number,
                            side.to_db_string()
                        ])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn upsert_plays(&self, match_id: i64, plays: &[Play]) -> StorageResult<()> {
        let plays = plays.to_vec();
        self.with_conn(move |conn| {
            require_match(conn, match_id)?;

            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO plays (match_id, play_index, time, text, team, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(match_id, play_index) DO UPDATE SET
                        time = excluded.time,
                        text = excluded.text,
                        team = excluded.team,
                        notes = excluded.notes",
                )?;

                for play in &plays {
                    stmt.execute(params![
                        match_id, play.index, play.time, play.text, play.team, play.notes
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn upsert_stat_group(&self, match_id: i64, group: &StatGroup) -> StorageResult<()> {
        let table = group.table();
        let columns = stat_columns(group);
        self.with_conn(move |conn| {
            require_match(conn, match_id)?;

            let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
            let placeholders: Vec<String> =
                (2..=names.len() + 1).map(|i| format!("?{}", i)).collect();
            let updates: Vec<String> = names
                .iter()
                .map(|name| format!("{0} = excluded.{0}", name))
                .collect();

            let sql = format!(
                "INSERT INTO {} (match_id, {}) VALUES (?1, {})
                 ON CONFLICT(match_id) DO UPDATE SET {}",
                table,
                names.join(", "),
                placeholders.join(", "),
                updates.join(", ")
            );

            let values = std::iter::once(Value::Integer(match_id))
                .chain(columns.iter().map(|(_, value)| value.clone()));
            conn.execute(&sql, params_from_iter(values))?;
            Ok(())
        })
        .await
    }

    // ===== Run Management =====

    async fn begin_run(&self, config_hash: &str) -> StorageResult<i64> {
        let config_hash = config_hash.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
                params![now, config_hash, RunStatus::Running.to_db_string()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
                params![status.to_db_string(), now, run_id],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound {
                    entity: "run",
                    id: run_id,
                });
            }
            Ok(())
        })
        .await
    }

    async fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.with_conn(|conn| {
            let run = conn
                .query_row(
                    "SELECT id, started_at, finished_at, config_hash, status
                     FROM runs ORDER BY id DESC LIMIT 1",
                    [],
                    |row| {
                        Ok(RunRecord {
                            id: row.get(0)?,
                            started_at: row.get(1)?,
                            finished_at: row.get(2)?,
                            config_hash: row.get(3)?,
                            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                                .unwrap_or(RunStatus::Failed),
                        })
                    },
                )
                .optional()?;
            Ok(run)
        })
        .await
    }

    // ===== Read side =====

    async fn load_competition(&self, id: i64) -> StorageResult<Option<Competition>> {
        self.with_conn(move |conn| load_competition(conn, id)).await
    }

    async fn counts(&self) -> StorageResult<StoreCounts> {
        self.with_conn(|conn| {
            let count = |table: &str| -> StorageResult<u64> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
                Ok(n as u64)
            };

            let any_stats = STAT_TABLES
                .iter()
                .map(|table| format!("EXISTS (SELECT 1 FROM {} s WHERE s.match_id = m.id)", table))
                .collect::<Vec<_>>()
                .join(" OR ");
            let with_stats: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM matches m WHERE {}", any_stats),
                [],
                |row| row.get(0),
            )?;

            Ok(StoreCounts {
                competitions: count("competitions")?,
                seasons: count("seasons")?,
                rounds: count("rounds")?,
                matches: count("matches")?,
                players: count("players")?,
                plays: count("plays")?,
                matches_with_stats: with_stats as u64,
                runs: count("runs")?,
            })
        })
        .await
    }
}

fn require_match(conn: &Connection, match_id: i64) -> StorageResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM matches WHERE id = ?1", [match_id], |_| Ok(()))
        .optional()?
        .is_some();

    if exists {
        Ok(())
    } else {
        Err(StorageError::NotFound {
            entity: "match",
            id: match_id,
        })
    }
}

// ===== Statistic columns =====

fn push_pair<T: Clone + Into<Value>>(columns: &mut Vec<(String, Value)>, name: &str, pair: &Pair<T>) {
    columns.push((format!("home_{}", name), pair.home.clone().into()));
    columns.push((format!("away_{}", name), pair.away.clone().into()));
}

fn read_pair<T: FromSql>(row: &Row<'_>, name: &str) -> rusqlite::Result<Pair<T>> {
    Ok(Pair::new(
        row.get(format!("home_{}", name).as_str())?,
        row.get(format!("away_{}", name).as_str())?,
    ))
}

/// Column/value list for one statistic group
fn stat_columns(group: &StatGroup) -> Vec<(String, Value)> {
    let mut c = Vec::new();
    match group {
        StatGroup::Possession(s) => {
            push_pair(&mut c, "possession", &s.possession);
            push_pair(&mut c, "possession_time", &s.possession_time);
            push_pair(&mut c, "sets", &s.sets);
            push_pair(&mut c, "sets_completed", &s.sets_completed);
        }
        StatGroup::Attack(s) => {
            push_pair(&mut c, "runs", &s.runs);
            push_pair(&mut c, "run_metres", &s.run_metres);
            push_pair(&mut c, "post_contact_metres", &s.post_contact_metres);
            push_pair(&mut c, "line_breaks", &s.line_breaks);
            push_pair(&mut c, "tackle_breaks", &s.tackle_breaks);
            push_pair(&mut c, "avg_set_distance", &s.avg_set_distance);
            push_pair(&mut c, "kick_return_metres", &s.kick_return_metres);
            push_pair(&mut c, "avg_play_the_ball_speed", &s.avg_play_the_ball_speed);
        }
        StatGroup::Passing(s) => {
            push_pair(&mut c, "offloads", &s.offloads);
            push_pair(&mut c, "receipts", &s.receipts);
            push_pair(&mut c, "total_passes", &s.total_passes);
            push_pair(&mut c, "dummy_passes", &s.dummy_passes);
        }
        StatGroup::Kicking(s) => {
            push_pair(&mut c, "kicks", &s.kicks);
            push_pair(&mut c, "kicking_metres", &s.kicking_metres);
            push_pair(&mut c, "forced_drop_outs", &s.forced_drop_outs);
            push_pair(&mut c, "kick_defusal", &s.kick_defusal);
            push_pair(&mut c, "bombs", &s.bombs);
            push_pair(&mut c, "grubbers", &s.grubbers);
        }
        StatGroup::Defence(s) => {
            push_pair(&mut c, "effective_tackle", &s.effective_tackle);
            push_pair(&mut c, "tackles_made", &s.tackles_made);
            push_pair(&mut c, "missed_tackles", &s.missed_tackles);
            push_pair(&mut c, "intercepts", &s.intercepts);
            push_pair(&mut c, "ineffective_tackles", &s.ineffective_tackles);
        }
        StatGroup::NegativePlays(s) => {
            push_pair(&mut c, "errors", &s.errors);
            push_pair(&mut c, "penalties_conceded", &s.penalties_conceded);
            push_pair(&mut c, "ruck_infringements", &s.ruck_infringements);
            push_pair(&mut c, "inside_ten_metres", &s.inside_ten_metres);
            push_pair(&mut c, "on_reports", &s.on_reports);
        }
    }
    c
}

fn load_stat_row<T, F>(conn: &Connection, table: &str, match_id: i64, read: F) -> StorageResult<Option<T>>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let row = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE match_id = ?1", table),
            [match_id],
            read,
        )
        .optional()?;
    Ok(row)
}

/// Reads back every stored group of a match; `None` if no group is stored
fn load_stats(conn: &Connection, match_id: i64) -> StorageResult<Option<MatchStats>> {
    let mut stats = MatchStats::default();
    let mut found = false;

    if let Some(s) = load_stat_row(conn, "possession_stats", match_id, |row| {
        Ok(PossessionCompletion {
            possession: read_pair(row, "possession")?,
            possession_time: read_pair(row, "possession_time")?,
            sets: read_pair(row, "sets")?,
            sets_completed: read_pair(row, "sets_completed")?,
        })
    })? {
        stats.possession = s;
        found = true;
    }

    if let Some(s) = load_stat_row(conn, "attack_stats", match_id, |row| {
        Ok(Attack {
            runs: read_pair(row, "runs")?,
            run_metres: read_pair(row, "run_metres")?,
            post_contact_metres: read_pair(row, "post_contact_metres")?,
            line_breaks: read_pair(row, "line_breaks")?,
            tackle_breaks: read_pair(row, "tackle_breaks")?,
            avg_set_distance: read_pair(row, "avg_set_distance")?,
            kick_return_metres: read_pair(row, "kick_return_metres")?,
            avg_play_the_ball_speed: read_pair(row, "avg_play_the_ball_speed")?,
        })
    })? {
        stats.attack = s;
        found = true;
    }

    if let Some(s) = load_stat_row(conn, "passing_stats", match_id, |row| {
        Ok(Passing {
            offloads: read_pair(row, "offloads")?,
            receipts: read_pair(row, "receipts")?,
            total_passes: read_pair(row, "total_passes")?,
            dummy_passes: read_pair(row, "dummy_passes")?,
        })
    })? {
        stats.passing = s;
        found = true;
    }

    if let Some(s) = load_stat_row(conn, "kicking_stats", match_id, |row| {
        Ok(Kicking {
            kicks: read_pair(row, "kicks")?,
            kicking_metres: read_pair(row, "kicking_metres")?,
            forced_drop_outs: read_pair(row, "forced_drop_outs")?,
            kick_defusal: read_pair(row, "kick_defusal")?,
            bombs: read_pair(row, "bombs")?,
            grubbers: read_pair(row, "grubbers")?,
        })
    })? {
        stats.kicking = s;
        found = true;
    }

    if let Some(s) = load_stat_row(conn, "defence_stats", match_id, |row| {
        Ok(Defence {
            effective_tackle: read_pair(row, "effective_tackle")?,
            tackles_made: read_pair(row, "tackles_made")?,
            missed_tackles: read_pair(row, "missed_tackles")?,
            intercepts: read_pair(row, "intercepts")?,
            ineffective_tackles: read_pair(row, "ineffective_tackles")?,
        })
    })? {
        stats.defence = s;
        found = true;
    }

    if let Some(s) = load_stat_row(conn, "negative_play_stats", match_id, |row| {
        Ok(NegativePlays {
            errors: read_pair(row, "errors")?,
            penalties_conceded: read_pair(row, "penalties_conceded")?,
            ruck_infringements: read_pair(row, "ruck_infringements")?,
            inside_ten_metres: read_pair(row, "inside_ten_metres")?,
            on_reports: read_pair(row, "on_reports")?,
        })
    })? {
        stats.negative_plays = s;
        found = true;
    }

    Ok(found.then_some(stats))
}

// ===== Tree loading =====

fn load_competition(conn: &Connection, id: i64) -> StorageResult<Option<Competition>> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM competitions WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;

    let name = match name {
        Some(name) => name,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare("SELECT id, year FROM seasons WHERE competition_id = ?1 ORDER BY id")?;
    let season_rows = stmt
        .query_map([id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut seasons = Vec::with_capacity(season_rows.len());
    for (season_id, year) in season_rows {
        seasons.push(Season {
            year,
            rounds: load_rounds(conn, season_id)?,
        });
    }

    Ok(Some(Competition { id, name, seasons }))
}

fn load_rounds(conn: &Connection, season_id: i64) -> StorageResult<Vec<Round>> {
    let mut stmt = conn.prepare(
        "SELECT id, round_index, name, start_day, end_day
         FROM rounds WHERE season_id = ?1 ORDER BY round_index",
    )?;
    let rows = stmt
        .query_map([season_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Round {
                    index: row.get(1)?,
                    name: row.get(2)?,
                    start_day: row.get(3)?,
                    end_day: row.get(4)?,
                    matches: Vec::new(),
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rounds = Vec::with_capacity(rows.len());
    for (round_id, mut round) in rows {
        round.matches = load_matches(conn, round_id)?;
        rounds.push(round);
    }
    Ok(rounds)
}

fn load_matches(conn: &Connection, round_id: i64) -> StorageResult<Vec<Match>> {
    let mut stmt = conn.prepare(
        "SELECT id, home_team, away_team, home_score, away_score, location, date_played, weather
         FROM matches WHERE round_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([round_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Match {
                    home_team: row.get(1)?,
                    away_team: row.get(2)?,
                    home_score: row.get(3)?,
                    away_score: row.get(4)?,
                    location: row.get(5)?,
                    date_played: row.get(6)?,
                    weather: row.get(7)?,
                    ..Match::default()
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut matches = Vec::with_capacity(rows.len());
    for (match_id, mut m) in rows {
        let (home, away) = load_players(conn, match_id)?;
        m.home_team_list = home;
        m.away_team_list = away;
        m.play_by_play = load_plays(conn, match_id)?;
        m.stats = load_stats(conn, match_id)?;
        matches.push(m);
    }
    Ok(matches)
}

fn load_players(conn: &Connection, match_id: i64) -> StorageResult<(Vec<Player>, Vec<Player>)> {
    let mut stmt = conn.prepare(
        "SELECT first_name, last_name, position, number, side
         FROM players WHERE match_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([match_id], |row| {
            Ok((
                Player {
                    first_name: row.get(0)?,
                    last_name: row.get(1)?,
                    position: row.get(2)?,
                    number: row.get(3)?,
                },
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut home = Vec::new();
    let mut away = Vec::new();
    for (player, side) in rows {
        match Side::from_db_string(&side) {
            Some(Side::Home) => home.push(player),
            Some(Side::Away) => away.push(player),
            None => tracing::warn!("Skipping player with unknown side '{}'", side),
        }
    }
    Ok((home, away))
}

fn load_plays(conn: &Connection, match_id: i64) -> StorageResult<Vec<Play>> {
    let mut stmt = conn.prepare(
        "SELECT play_index, time, text, team, notes
         FROM plays WHERE match_id = ?1 ORDER BY play_index",
    )?;
    let plays = stmt
        .query_map([match_id], |row| {
            Ok(Play {
                index: row.get(0)?,
                time: row.get(1)?,
                text: row.get(2)?,
                team: row.get(3)?,
                notes: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(plays)
}
