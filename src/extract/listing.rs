//! Draw page extraction: dropdown listings, match links and round dates

use super::{first_text, selector, text_of};
use scraper::Html;

const SEASON_ITEMS: &str = "#season-dropdown li button div";
const ROUND_ITEMS: &str = "#round-dropdown li button div";
const MATCH_HEADER: &str = "p.match-header__title";

/// A match as listed on a round's draw page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLink {
    pub home_team: String,
    pub away_team: String,
    /// Site-relative address of the match centre page
    pub href: String,
}

/// Non-empty trimmed texts of every element matching `css`, in document order
pub fn extract_list(html: &str, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&sel)
        .map(text_of)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Season years from the season dropdown, most recent first
pub fn extract_seasons(html: &str) -> Vec<String> {
    extract_list(html, SEASON_ITEMS)
}

/// Round names from the round dropdown, in listing order
pub fn extract_rounds(html: &str) -> Vec<String> {
    extract_list(html, ROUND_ITEMS)
}

/// Matches on a round page
///
/// A match is kept only when both team names and a detail link are present.
/// If a match card carries several detail links, the last one wins.
pub fn extract_matches(html: &str) -> Vec<MatchLink> {
    let (Some(card), Some(home), Some(away), Some(link)) = (
        selector(".match"),
        selector(".match-team__name--home"),
        selector(".match-team__name--away"),
        selector("a.match--highlighted.u-flex-column.u-flex-align-items-center.u-width-100"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&card)
        .filter_map(|card| {
            let home_team = first_text(card, &home);
            let away_team = first_text(card, &away);
            let href = card
                .select(&link)
                .filter_map(|a| a.value().attr("href"))
                .last()
                .unwrap_or_default()
                .trim()
                .to_string();

            if home_team.is_empty() || away_team.is_empty() || href.is_empty() {
                tracing::debug!("Skipping incomplete match card '{}' v '{}'", home_team, away_team);
                return None;
            }

            Some(MatchLink {
                home_team,
                away_team,
                href,
            })
        })
        .collect()
}

/// First and last match-day headers on a round page
pub fn extract_round_dates(html: &str) -> Option<(String, String)> {
    let dates = extract_list(html, MATCH_HEADER);
    let first = dates.first()?.clone();
    let last = dates.last()?.clone();
    Some((first, last))
}
