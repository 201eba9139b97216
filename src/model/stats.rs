//! Match statistic groups
//!
//! Every statistic is a home/away pair. The six groups are persisted
//! independently, one row per match each.

use serde::Serialize;

/// A home/away value pair
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Pair<T> {
    pub home: T,
    pub away: T,
}

impl<T> Pair<T> {
    pub fn new(home: T, away: T) -> Self {
        Self { home, away }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PossessionCompletion {
    /// Share of possession, in percent
    pub possession: Pair<i64>,
    /// Time in possession as displayed (e.g. "28:41")
    pub possession_time: Pair<String>,
    pub sets: Pair<i64>,
    pub sets_completed: Pair<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    pub runs: Pair<i64>,
    pub run_metres: Pair<i64>,
    pub post_contact_metres: Pair<i64>,
    pub line_breaks: Pair<i64>,
    pub tackle_breaks: Pair<i64>,
    pub avg_set_distance: Pair<f64>,
    pub kick_return_metres: Pair<i64>,
    pub avg_play_the_ball_speed: Pair<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Passing {
    pub offloads: Pair<i64>,
    pub receipts: Pair<i64>,
    pub total_passes: Pair<i64>,
    pub dummy_passes: Pair<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kicking {
    pub kicks: Pair<i64>,
    pub kicking_metres: Pair<i64>,
    pub forced_drop_outs: Pair<i64>,
    pub kick_defusal: Pair<i64>,
    pub bombs: Pair<i64>,
    pub grubbers: Pair<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Defence {
    pub effective_tackle: Pair<f64>,
    pub tackles_made: Pair<i64>,
    pub missed_tackles: Pair<i64>,
    pub intercepts: Pair<i64>,
    pub ineffective_tackles: Pair<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativePlays {
    pub errors: Pair<i64>,
    pub penalties_conceded: Pair<i64>,
    pub ruck_infringements: Pair<i64>,
    pub inside_ten_metres: Pair<i64>,
    pub on_reports: Pair<i64>,
}

/// All six statistic groups of one match
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub possession: PossessionCompletion,
    pub attack: Attack,
    pub passing: Passing,
    pub kicking: Kicking,
    pub defence: Defence,
    pub negative_plays: NegativePlays,
}

/// One statistic group, as handed to the record store
#[derive(Debug, Clone, PartialEq)]
pub enum StatGroup {
    Possession(PossessionCompletion),
    Attack(Attack),
    Passing(Passing),
    Kicking(Kicking),
    Defence(Defence),
    NegativePlays(NegativePlays),
}

impl StatGroup {
    /// Table the group is stored in
    pub fn table(&self) -> &'static str {
        match self {
            Self::Possession(_) => "possession_stats",
            Self::Attack(_) => "attack_stats",
            Self::Passing(_) => "passing_stats",
            Self::Kicking(_) => "kicking_stats",
            Self::Defence(_) => "defence_stats",
            Self::NegativePlays(_) => "negative_play_stats",
        }
    }
}

impl MatchStats {
    /// Splits the record into its independently persisted groups
    pub fn into_groups(self) -> [StatGroup; 6] {
        [
            StatGroup::Possession(self.possession),
            StatGroup::Attack(self.attack),
            StatGroup::Passing(self.passing),
            StatGroup::Kicking(self.kicking),
            StatGroup::Defence(self.defence),
            StatGroup::NegativePlays(self.negative_plays),
        ]
    }
}
