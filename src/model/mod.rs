//! In-memory result tree
//!
//! These types mirror what is persisted, nested the way the site is walked.
//! The tree is serialized as the JSON dump at the end of a run.

mod stats;

pub use stats::{
    Attack, Defence, Kicking, MatchStats, NegativePlays, Pair, Passing, PossessionCompletion,
    StatGroup,
};

use serde::Serialize;

/// Root of the crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
    pub id: i64,
    pub name: String,
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub year: String,
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// 1-based position in chronological order
    pub index: u32,
    pub name: String,
    pub start_day: Option<String>,
    pub end_day: Option<String>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub location: Option<String>,
    pub date_played: Option<String>,
    pub weather: Option<String>,
    pub home_team_list: Vec<Player>,
    pub away_team_list: Vec<Player>,
    pub play_by_play: Vec<Play>,
    pub stats: Option<MatchStats>,
}

/// Which side of a match a player lined up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "home" => Some(Self::Home),
            "away" => Some(Self::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub number: u32,
}

/// One play-by-play event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    /// Position of the event in document order
    pub index: u32,
    pub time: String,
    pub text: String,
    pub team: String,
    pub notes: String,
}

/// Replace-type match fields captured from the detail page.
///
/// `None` means the field was not found on the page, and the stored value is
/// left as it is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchDetails {
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub location: Option<String>,
    pub date_played: Option<String>,
    pub weather: Option<String>,
}

impl MatchDetails {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
