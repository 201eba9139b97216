//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvest database.
//! Every entity carries a UNIQUE constraint on its natural key.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Draw hierarchy
CREATE TABLE IF NOT EXISTS competitions (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seasons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    competition_id INTEGER NOT NULL REFERENCES competitions(id),
    year TEXT NOT NULL,
    UNIQUE(competition_id, year)
);

CREATE TABLE IF NOT EXISTS rounds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    season_id INTEGER NOT NULL REFERENCES seasons(id),
    round_index INTEGER NOT NULL,
    name TEXT NOT NULL,
    start_day TEXT,
    end_day TEXT,
    UNIQUE(season_id, round_index)
);

CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    round_id INTEGER NOT NULL REFERENCES rounds(id),
    home_team TEXT NOT NULL,
    away_team TEXT NOT NULL,
    home_score INTEGER,
    away_score INTEGER,
    location TEXT,
    date_played TEXT,
    weather TEXT,
    UNIQUE(round_id, home_team, away_team)
);

CREATE INDEX IF NOT EXISTS idx_matches_round ON matches(round_id);

-- Match children
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id INTEGER NOT NULL REFERENCES matches(id),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    position TEXT NOT NULL,
    number INTEGER NOT NULL,
    side TEXT NOT NULL,
    UNIQUE(match_id, first_name, last_name)
);

CREATE TABLE IF NOT EXISTS plays (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id INTEGER NOT NULL REFERENCES matches(id),
    play_index INTEGER NOT NULL,
    time TEXT NOT NULL,
    text TEXT NOT NULL,
    team TEXT NOT NULL,
    notes TEXT NOT NULL,
    UNIQUE(match_id, play_index)
);

-- Statistic groups, one row per match each
CREATE TABLE IF NOT EXISTS possession_stats (
    match_id INTEGER PRIMARY KEY REFERENCES matches(id),
    home_possession INTEGER NOT NULL DEFAULT 0,
    away_possession INTEGER NOT NULL DEFAULT 0,
    home_possession_time TEXT NOT NULL DEFAULT '',
    away_possession_time TEXT NOT NULL DEFAULT '',
    home_sets INTEGER NOT NULL DEFAULT 0,
    away_sets INTEGER NOT NULL DEFAULT 0,
    home_sets_completed INTEGER NOT NULL DEFAULT 0,
    away_sets_completed INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS attack_stats (
    match_id INTEGER PRIMARY KEY REFERENCES matches(id),
    home_runs INTEGER NOT NULL DEFAULT 0,
    away_runs INTEGER NOT NULL DEFAULT 0,
    home_run_metres INTEGER NOT NULL DEFAULT 0,
    away_run_metres INTEGER NOT NULL DEFAULT 0,
    home_post_contact_metres INTEGER NOT NULL DEFAULT 0,
    away_post_contact_metres INTEGER NOT NULL DEFAULT 0,
    home_line_breaks INTEGER NOT NULL DEFAULT 0,
    away_line_breaks INTEGER NOT NULL DEFAULT 0,
    home_tackle_breaks INTEGER NOT NULL DEFAULT 0,
    away_tackle_breaks INTEGER NOT NULL DEFAULT 0,
    home_avg_set_distance REAL NOT NULL DEFAULT 0,
    away_avg_set_distance REAL NOT NULL DEFAULT 0,
    home_kick_return_metres INTEGER NOT NULL DEFAULT 0,
    away_kick_return_metres INTEGER NOT NULL DEFAULT 0,
    home_avg_play_the_ball_speed REAL NOT NULL DEFAULT 0,
    away_avg_play_the_ball_speed REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS passing_stats (
    match_id INTEGER PRIMARY KEY REFERENCES matches(id),
    home_offloads INTEGER NOT NULL DEFAULT 0,
    away_offloads INTEGER NOT NULL DEFAULT 0,
    home_receipts INTEGER NOT NULL DEFAULT 0,
    away_receipts INTEGER NOT NULL DEFAULT 0,
    home_total_passes INTEGER NOT NULL DEFAULT 0,
    away_total_passes INTEGER NOT NULL DEFAULT 0,
    home_dummy_passes INTEGER NOT NULL DEFAULT 0,
    away_dummy_passes INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS kicking_stats (
    match_id INTEGER PRIMARY KEY REFERENCES matches(id),
    home_kicks INTEGER NOT NULL DEFAULT 0,
    away_kicks INTEGER NOT NULL DEFAULT 0,
    home_kicking_metres INTEGER NOT NULL DEFAULT 0,
    away_kicking_metres INTEGER NOT NULL DEFAULT 0,
    home_forced_drop_outs INTEGER NOT NULL DEFAULT 0,
    away_forced_drop_outs INTEGER NOT NULL DEFAULT 0,
    home_kick_defusal INTEGER NOT NULL DEFAULT 0,
    away_kick_defusal INTEGER NOT NULL DEFAULT 0,
    home_bombs INTEGER NOT NULL DEFAULT 0,
    away_bombs INTEGER NOT NULL DEFAULT 0,
    home_grubbers INTEGER NOT NULL DEFAULT 0,
    away_grubbers INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS defence_stats (
    match_id INTEGER PRIMARY KEY REFERENCES matches(id),
    home_effective_tackle REAL NOT NULL DEFAULT 0,
    away_effective_tackle REAL NOT NULL DEFAULT 0,
    home_tackles_made INTEGER NOT NULL DEFAULT 0,
    away_tackles_made INTEGER NOT NULL DEFAULT 0,
    home_missed_tackles INTEGER NOT NULL DEFAULT 0,
    away_missed_tackles INTEGER NOT NULL DEFAULT 0,
    home_intercepts INTEGER NOT NULL DEFAULT 0,
    away_intercepts INTEGER NOT NULL DEFAULT 0,
    home_ineffective_tackles INTEGER NOT NULL DEFAULT 0,
    away_ineffective_tackles INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS negative_play_stats (
    match_id INTEGER PRIMARY KEY REFERENCES matches(id),
    home_errors INTEGER NOT NULL DEFAULT 0,
    away_errors INTEGER NOT NULL DEFAULT 0,
    home_penalties_conceded INTEGER NOT NULL DEFAULT 0,
    away_penalties_conceded INTEGER NOT NULL DEFAULT 0,
    home_ruck_infringements INTEGER NOT NULL DEFAULT 0,
    away_ruck_infringements INTEGER NOT NULL DEFAULT 0,
    home_inside_ten_metres INTEGER NOT NULL DEFAULT 0,
    away_inside_ten_metres INTEGER NOT NULL DEFAULT 0,
    home_on_reports INTEGER NOT NULL DEFAULT 0,
    away_on_reports INTEGER NOT NULL DEFAULT 0
);
"#;

/// Statistic group tables, in dump order
pub const STAT_TABLES: [&str; 6] = [
    "possession_stats",
    "attack_stats",
    "passing_stats",
    "kicking_stats",
    "defence_stats",
    "negative_play_stats",
];

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
