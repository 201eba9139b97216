//! Extraction of records from rendered pages
//!
//! Every function here is a pure mapping from page content to records: no
//! network, no storage. A missing element is an extraction miss and yields
//! an empty value rather than an error.
//!
//! - `listing`: season and round dropdowns, match links, round dates
//! - `match_page`: play-by-play, team lists, score/venue/weather
//! - `stats`: the six statistic groups, dispatched from one scan

mod listing;
mod match_page;
pub mod stats;

pub use listing::{
    extract_list, extract_matches, extract_round_dates, extract_rounds, extract_seasons, MatchLink,
};
pub use match_page::{extract_match_details, extract_plays, extract_team_lists};
pub use stats::{extract_match_stats, harvest_match_stats};

use scraper::{ElementRef, Node, Selector};

/// Parses a CSS selector; the selectors used here are constants
fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Trimmed text of an element and all its descendants
fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the element's direct text children only
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text of the first match of `sel` under `scope`, empty if none
fn first_text(scope: ElementRef<'_>, sel: &Selector) -> String {
    scope.select(sel).next().map(text_of).unwrap_or_default()
}

/// Collapses runs of whitespace into single spaces
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leading numeric part of a displayed value, with thousands separators
/// removed ("1,234" -> "1234", "85%" -> "85", "3.41s" -> "3.41")
fn numeric_prefix(s: &str) -> String {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect()
}

/// Parses a displayed integer, zero when unparsable
pub fn parse_int(s: &str) -> i64 {
    let digits = numeric_prefix(s);
    digits
        .parse::<i64>()
        .or_else(|_| digits.parse::<f64>().map(|f| f.round() as i64))
        .unwrap_or(0)
}

/// Parses a displayed decimal, zero when unparsable
pub fn parse_float(s: &str) -> f64 {
    numeric_prefix(s).parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("170"), 170);
        assert_eq!(parse_int(" 1,523 "), 1523);
        assert_eq!(parse_int("52%"), 52);
        assert_eq!(parse_int("8m"), 8);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_int(""), 0);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("45.5"), 45.5);
        assert_eq!(parse_float("3.41s"), 3.41);
        assert_eq!(parse_float("88.2%"), 88.2);
        assert_eq!(parse_float("n/a"), 0.0);
    }

    #[test]
    fn test_own_text_skips_children() {
        let html = Html::parse_fragment(
            r#"<div class="score">24<span class="visually-hidden">points</span></div>"#,
        );
        let sel = selector("div.score").unwrap();
        let element = html.select(&sel).next().unwrap();

        assert_eq!(own_text(element), "24");
        assert_eq!(text_of(element), "24points");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Line \n  Break\t Assist "), "Line Break Assist");
    }
}
