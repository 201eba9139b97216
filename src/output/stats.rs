//! Statistics from the record store
//!
//! This module loads row counts and the latest run from the store and
//! formats them for the terminal.

use crate::storage::{RecordStore, RunRecord, StoreCounts};
use crate::Result;
use std::fmt::Write;

/// Store summary shown by `--stats`
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Row counts per entity
    pub counts: StoreCounts,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl StoreStatistics {
    /// Duration of the latest run, when it has finished
    pub fn latest_run_seconds(&self) -> Option<i64> {
        let run = self.latest_run.as_ref()?;
        let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
        let finished = run
            .finished_at
            .as_deref()?
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        Some((finished - started).num_seconds())
    }
}

/// Loads statistics from the store
pub async fn load_statistics(store: &dyn RecordStore) -> Result<StoreStatistics> {
    let counts = store.counts().await?;
    let latest_run = store.latest_run().await?;

    Ok(StoreStatistics { counts, latest_run })
}

/// Formats statistics as the text printed by `--stats`
pub fn format_statistics(stats: &StoreStatistics) -> String {
    let mut out = String::new();
    let c = &stats.counts;

    // writing to a String cannot fail
    let _ = writeln!(out, "=== Harvest Statistics ===\n");

    let _ = writeln!(out, "Records:");
    let _ = writeln!(out, "  Competitions: {}", c.competitions);
    let _ = writeln!(out, "  Seasons: {}", c.seasons);
    let _ = writeln!(out, "  Rounds: {}", c.rounds);
    let _ = writeln!(out, "  Matches: {}", c.matches);
    let _ = writeln!(out, "  Players: {}", c.players);
    let _ = writeln!(out, "  Plays: {}", c.plays);
    let _ = writeln!(out);

    let coverage = if c.matches > 0 {
        (c.matches_with_stats as f64 / c.matches as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "Statistics Coverage: {:.1}% ({} / {} matches with statistics)",
        coverage, c.matches_with_stats, c.matches
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Runs: {}", c.runs);
    match &stats.latest_run {
        Some(run) => {
            let _ = writeln!(out, "Latest Run:");
            let _ = writeln!(out, "  ID: {}", run.id);
            let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
            let _ = writeln!(out, "  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                let _ = writeln!(out, "  Finished: {}", finished);
            }
            if let Some(secs) = stats.latest_run_seconds() {
                let _ = writeln!(out, "  Duration: {} seconds", secs);
            }
            let _ = writeln!(out, "  Config hash: {}", run.config_hash);
        }
        None => {
            let _ = writeln!(out, "No crawl runs recorded");
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    print!("{}", format_statistics(stats));
}
