//! Match centre extraction: play-by-play, team lists and match details

use super::{first_text, normalize_whitespace, own_text, selector, text_of};
use crate::model::{MatchDetails, Play, Player};
use scraper::{ElementRef, Html, Selector};

/// Play-by-play events in document order, indexed from 0
pub fn extract_plays(html: &str) -> Vec<Play> {
    let (Some(event), Some(team), Some(title), Some(notes), Some(time)) = (
        selector("div.match-centre-event"),
        selector(".match-centre-event__team-name"),
        selector(".match-centre-event__title"),
        selector(".u-font-weight-500"),
        selector("span.match-centre-event__timestamp"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&event)
        .enumerate()
        .map(|(index, block)| Play {
            index: index as u32,
            time: last_text(block, &time),
            text: last_text(block, &title),
            team: last_text(block, &team),
            notes: block
                .select(&notes)
                .map(|n| normalize_whitespace(&text_of(n)))
                .filter(|n| !n.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect()
}

fn last_text(scope: ElementRef<'_>, sel: &Selector) -> String {
    scope.select(sel).last().map(text_of).unwrap_or_default()
}

/// Splits a displayed name into first name and the remainder
fn split_name(full: &str) -> Option<(String, String)> {
    let mut parts = full.split_whitespace();
    let first = parts.next()?;
    let rest = parts.collect::<Vec<_>>().join(" ");
    if rest.is_empty() {
        return None;
    }
    Some((first.to_string(), rest))
}

/// Home and away team lists
///
/// Each team-list row holds one position with a player per side. The home
/// number doubles as the away number unless the row carries its own.
pub fn extract_team_lists(html: &str) -> (Vec<Player>, Vec<Player>) {
    let (Some(row), Some(position), Some(home_number), Some(away_number), Some(home_name), Some(away_name)) = (
        selector("div.team-list__container > div.team-list"),
        selector("div.team-list-position > span.team-list-position__text"),
        selector("div.team-list-position > p > span.team-list-position__number:not(.u-text-align-left)"),
        selector("div.team-list-position > p > span.team-list-position__number.u-text-align-left"),
        selector(".team-list-profile:not(.team-list-profile--away) > div.team-list-profile-content > div.team-list-profile__name"),
        selector(".team-list-profile:not(.team-list-profile--home) > div.team-list-profile-content > div.team-list-profile__name"),
    ) else {
        return (Vec::new(), Vec::new());
    };

    let document = Html::parse_document(html);
    let mut home = Vec::new();
    let mut away = Vec::new();

    for block in document.select(&row) {
        let position = last_text(block, &position);

        let number = block
            .select(&home_number)
            .last()
            .map(|n| text_of(n).parse().unwrap_or(0))
            .unwrap_or(0);
        let away_no = block
            .select(&away_number)
            .last()
            .map(|n| text_of(n).parse().unwrap_or(0))
            .unwrap_or(number);

        // a name without a first and last part is an extraction miss
        if let Some((first_name, last_name)) = split_name(&last_text(block, &home_name)) {
            home.push(Player {
                first_name,
                last_name,
                position: position.clone(),
                number,
            });
        }
        if let Some((first_name, last_name)) = split_name(&last_text(block, &away_name)) {
            away.push(Player {
                first_name,
                last_name,
                position,
                number: away_no,
            });
        }
    }

    (home, away)
}

/// Score, venue, date and weather from the match header
///
/// Fields not found on the page are left `None`.
pub fn extract_match_details(html: &str) -> MatchDetails {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let own = |css: &str| -> Option<String> {
        let sel = selector(css)?;
        let text = own_text(root.select(&sel).next()?);
        (!text.is_empty()).then_some(text)
    };

    let weather = selector("p.match-weather__text").and_then(|para| {
        let span = selector("span")?;
        root.select(&para)
            .filter(|p| text_of(*p).contains("Weather:"))
            .map(|p| first_text(p, &span))
            .filter(|w| !w.is_empty())
            .last()
    });

    let date_played = selector("p.match-header__title")
        .map(|sel| first_text(root, &sel))
        .filter(|d| !d.is_empty());

    MatchDetails {
        home_score: own(".match-team__score.match-team__score--home").and_then(|s| s.parse().ok()),
        away_score: own(".match-team__score.match-team__score--away").and_then(|s| s.parse().ok()),
        location: own(".match-venue.o-text"),
        date_played,
        weather,
    }
}
