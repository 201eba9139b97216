//! Statistics dispatcher
//!
//! Most statistics share one markup shape: a `figure.stats-bar-chart` with a
//! caption and a home and away label. Each group registers the captions it
//! understands into a [`DispatchTable`]; the merged table is consumed by a
//! single scan over the page, and each label is used at most once. The scan
//! stops as soon as the table is empty.
//!
//! Gauge widgets and the possession/completion donuts have other shapes.
//! They are read by secondary scans, each over its own parsed copy of the
//! page, and merged into the dispatch result after.

use super::{first_text, parse_float, parse_int, selector, text_of};
use crate::model::{MatchStats, Pair, PossessionCompletion};
use scraper::Html;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::{self, JoinError};

/// Writes one home/away pair into the stats record
pub type Setter = fn(&mut MatchStats, &str, &str);

const BAR_CHART: &str = "figure.stats-bar-chart";
const BAR_CHART_TITLE: &str = "figcaption.stats-bar-chart__title";
const BAR_CHART_HOME: &str = ".stats-bar-chart__label--home";
const BAR_CHART_AWAY: &str = ".stats-bar-chart__label--away";

const GAUGE_BLOCK: &str = ".u-spacing-pb-24.u-spacing-pt-16.u-width-100";
const GAUGE_TITLE: &str = "h3.stats-bar-chart__title";
const GAUGE_VALUE: &str = ".donut-chart-stat__value > span > span:not(.donut-chart-stat__value--sup)";
const SPEED_TITLE: &str = "Average Play The Ball Speed";
const DEFUSAL_TITLE: &str = "Kick Defusal %";
const EFFECTIVE_TITLE: &str = "Effective Tackle %";

const SPEED_VALUE: &str = ".donut-chart-stat__value > span > span:not(.donut-chart__unit)";

fn int_pair(home: &str, away: &str) -> Pair<i64> {
    Pair::new(parse_int(home), parse_int(away))
}

fn float_pair(home: &str, away: &str) -> Pair<f64> {
    Pair::new(parse_float(home), parse_float(away))
}

/// Caption -> setter mapping consumed by one bar-chart scan
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<&'static str, Setter>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("labels", &self.labels())
            .finish()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, label: &'static str, setter: Setter) {
        self.handlers.insert(label, setter);
    }

    /// Moves every entry of `other` into this table
    pub fn merge(&mut self, other: DispatchTable) {
        self.handlers.extend(other.handlers);
    }

    /// Keeps only the labels for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.handlers.retain(|label, _| keep(label));
    }

    /// Removes and returns the setter for `label`
    pub fn take(&mut self, label: &str) -> Option<Setter> {
        self.handlers.remove(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.handlers.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Labels not yet consumed, sorted
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<_> = self.handlers.keys().copied().collect();
        labels.sort_unstable();
        labels
    }
}

pub fn attack_handlers() -> DispatchTable {
    let mut t = DispatchTable::new();
    t.register("All Runs", |s, h, a| s.attack.runs = int_pair(h, a));
    t.register("All Run Metres", |s, h, a| s.attack.run_metres = int_pair(h, a));
    t.register("Post Contact Metres", |s, h, a| {
        s.attack.post_contact_metres = int_pair(h, a)
    });
    t.register("Line Breaks", |s, h, a| s.attack.line_breaks = int_pair(h, a));
    t.register("Tackle Breaks", |s, h, a| s.attack.tackle_breaks = int_pair(h, a));
    t.register("Average Set Distance", |s, h, a| {
        s.attack.avg_set_distance = float_pair(h, a)
    });
    t.register("Kick Return Metres", |s, h, a| {
        s.attack.kick_return_metres = int_pair(h, a)
    });
    t
}

pub fn passing_handlers() -> DispatchTable {
    let mut t = DispatchTable::new();
    t.register("Offloads", |s, h, a| s.passing.offloads = int_pair(h, a));
    t.register("Receipts", |s, h, a| s.passing.receipts = int_pair(h, a));
    t.register("Total Passes", |s, h, a| s.passing.total_passes = int_pair(h, a));
    t.register("Dummy Passes", |s, h, a| s.passing.dummy_passes = int_pair(h, a));
    t
}

pub fn kicking_handlers() -> DispatchTable {
    let mut t = DispatchTable::new();
    t.register("Kicks", |s, h, a| s.kicking.kicks = int_pair(h, a));
    t.register("Kicking Metres", |s, h, a| s.kicking.kicking_metres = int_pair(h, a));
    t.register("Forced Drop Outs", |s, h, a| {
        s.kicking.forced_drop_outs = int_pair(h, a)
    });
    t.register("Bombs", |s, h, a| s.kicking.bombs = int_pair(h, a));
    t.register("Grubbers", |s, h, a| s.kicking.grubbers = int_pair(h, a));
    t
}

pub fn defence_handlers() -> DispatchTable {
    let mut t = DispatchTable::new();
    t.register("Tackles Made", |s, h, a| s.defence.tackles_made = int_pair(h, a));
    t.register("Missed Tackles", |s, h, a| s.defence.missed_tackles = int_pair(h, a));
    t.register("Ineffective Tackles", |s, h, a| {
        s.defence.ineffective_tackles = int_pair(h, a)
    });
    t.register("Intercepts", |s, h, a| s.defence.intercepts = int_pair(h, a));
    t
}

pub fn negative_play_handlers() -> DispatchTable {
    let mut t = DispatchTable::new();
    t.register("Errors", |s, h, a| s.negative_plays.errors = int_pair(h, a));
    t.register("Penalties Conceded", |s, h, a| {
        s.negative_plays.penalties_conceded = int_pair(h, a)
    });
    t.register("Ruck Infringements", |s, h, a| {
        s.negative_plays.ruck_infringements = int_pair(h, a)
    });
    t.register("Inside 10 Metres", |s, h, a| {
        s.negative_plays.inside_ten_metres = int_pair(h, a)
    });
    t.register("On Reports", |s, h, a| s.negative_plays.on_reports = int_pair(h, a));
    t
}

/// Every group's bar-chart handlers merged into one table
pub fn bar_chart_table() -> DispatchTable {
    let mut table = attack_handlers();
    table.merge(passing_handlers());
    table.merge(kicking_handlers());
    table.merge(defence_handlers());
    table.merge(negative_play_handlers());
    table
}

/// Outcome of one dispatch scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Chart elements looked at before the scan ended
    pub examined: usize,
    /// Labels that never appeared on the page
    pub unresolved: Vec<&'static str>,
}

/// Runs the single bar-chart scan, consuming `table`
pub fn scan_bar_charts(html: &str, mut table: DispatchTable, stats: &mut MatchStats) -> ScanReport {
    let (Some(chart), Some(title), Some(home), Some(away)) = (
        selector(BAR_CHART),
        selector(BAR_CHART_TITLE),
        selector(BAR_CHART_HOME),
        selector(BAR_CHART_AWAY),
    ) else {
        return ScanReport {
            examined: 0,
            unresolved: table.labels(),
        };
    };

    let document = Html::parse_document(html);
    let mut examined = 0;

    for figure in document.select(&chart) {
        if table.is_empty() {
            break;
        }
        examined += 1;

        let caption = first_text(figure, &title);
        if let Some(setter) = table.take(&caption) {
            setter(stats, &first_text(figure, &home), &first_text(figure, &away));
        }
    }

    ScanReport {
        examined,
        unresolved: table.labels(),
    }
}

/// Home and away values of the gauge block titled `title`
fn scan_gauge(html: &str, title: &str, value_css: &str) -> Option<(String, String)> {
    let block = selector(GAUGE_BLOCK)?;
    let heading = selector(GAUGE_TITLE)?;
    let value = selector(value_css)?;

    let document = Html::parse_document(html);
    let found = document
        .select(&block)
        .find(|b| first_text(*b, &heading) == title)?;

    let mut values = found.select(&value).map(text_of);
    let home = values.next().unwrap_or_default();
    let away = values.next().unwrap_or_default();
    Some((home, away))
}

/// Splits a completion figure such as "33/40" into (completed, sets)
fn completion(s: &str) -> (i64, i64) {
    match s.split_once('/') {
        Some((done, total)) => (parse_int(done), parse_int(total)),
        None => (0, 0),
    }
}

/// Possession share, time in possession and completion rate
fn scan_possession(html: &str) -> PossessionCompletion {
    let mut stats = PossessionCompletion::default();
    let document = Html::parse_document(html);
    let root = document.root_element();

    if let (Some(home), Some(away)) = (
        selector(".match-centre-card-donut__value--home"),
        selector(".match-centre-card-donut__value--away"),
    ) {
        stats.possession = int_pair(&first_text(root, &home), &first_text(root, &away));
    }

    if let (Some(chart), Some(title), Some(home), Some(away)) = (
        selector(BAR_CHART),
        selector(BAR_CHART_TITLE),
        selector(&format!("dd{}", BAR_CHART_HOME)),
        selector(&format!("dd{}", BAR_CHART_AWAY)),
    ) {
        if let Some(figure) = root
            .select(&chart)
            .find(|f| first_text(*f, &title) == "Time In Possession")
        {
            stats.possession_time = Pair::new(first_text(figure, &home), first_text(figure, &away));
        }
    }

    if let (Some(block), Some(heading), Some(footer)) = (
        selector(GAUGE_BLOCK),
        selector(GAUGE_TITLE),
        selector(".match-centre-card-donut__value.match-centre-card-donut__value--footer"),
    ) {
        if let Some(found) = root
            .select(&block)
            .find(|b| first_text(*b, &heading) == "Completion Rate")
        {
            let rates: Vec<String> = found.select(&footer).map(text_of).collect();
            let (home_done, home_sets) = rates.first().map(|r| completion(r)).unwrap_or_default();
            let (away_done, away_sets) = rates.get(1).map(|r| completion(r)).unwrap_or_default();
            stats.sets = Pair::new(home_sets, away_sets);
            stats.sets_completed = Pair::new(home_done, away_done);
        }
    }

    stats
}

fn joined<T: Default>(result: std::result::Result<T, JoinError>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("{} scan failed, leaving values empty: {}", what, e);
        T::default()
    })
}

/// Results of the scans that run beside the bar chart dispatch
#[derive(Debug, Default)]
struct SecondaryScans {
    speed: Option<(String, String)>,
    defusal: Option<(String, String)>,
    effective: Option<(String, String)>,
    possession: PossessionCompletion,
}

fn merge(mut stats: MatchStats, report: ScanReport, secondary: SecondaryScans) -> MatchStats {
    if !report.unresolved.is_empty() {
        tracing::debug!(
            "{} bar chart labels not found: {:?}",
            report.unresolved.len(),
            report.unresolved
        );
    }

    if let Some((h, a)) = secondary.speed {
        stats.attack.avg_play_the_ball_speed = float_pair(&h, &a);
    }
    if let Some((h, a)) = secondary.defusal {
        stats.kicking.kick_defusal = int_pair(&h, &a);
    }
    if let Some((h, a)) = secondary.effective {
        stats.defence.effective_tackle = float_pair(&h, &a);
    }
    stats.possession = secondary.possession;

    stats
}

/// Extracts all six statistic groups from one match centre page
pub fn extract_match_stats(html: &str) -> MatchStats {
    let mut stats = MatchStats::default();
    let report = scan_bar_charts(html, bar_chart_table(), &mut stats);

    let secondary = SecondaryScans {
        speed: scan_gauge(html, SPEED_TITLE, SPEED_VALUE),
        defusal: scan_gauge(html, DEFUSAL_TITLE, GAUGE_VALUE),
        effective: scan_gauge(html, EFFECTIVE_TITLE, GAUGE_VALUE),
        possession: scan_possession(html),
    };

    merge(stats, report, secondary)
}

/// Extracts the statistic groups on the blocking pool
///
/// The dispatch scan and each secondary scan parse their own copy of the
/// page as separate blocking tasks, joined before merging. A scan that
/// panics leaves its values at zero.
pub async fn harvest_match_stats(page: Arc<str>) -> MatchStats {
    let gauge = |title: &'static str, value_css: &'static str| {
        let page = Arc::clone(&page);
        task::spawn_blocking(move || scan_gauge(&page, title, value_css))
    };

    let speed = gauge(SPEED_TITLE, SPEED_VALUE);
    let defusal = gauge(DEFUSAL_TITLE, GAUGE_VALUE);
    let effective = gauge(EFFECTIVE_TITLE, GAUGE_VALUE);
    let possession = {
        let page = Arc::clone(&page);
        task::spawn_blocking(move || scan_possession(&page))
    };
    let dispatch = task::spawn_blocking(move || {
        let mut stats = MatchStats::default();
        let report = scan_bar_charts(&page, bar_chart_table(), &mut stats);
        (stats, report)
    });

    let (stats, report) = match dispatch.await {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!("bar chart scan failed, leaving values empty: {}", e);
            (MatchStats::default(), ScanReport::default())
        }
    };

    let secondary = SecondaryScans {
        speed: joined(speed.await, "play the ball speed"),
        defusal: joined(defusal.await, "kick defusal"),
        effective: joined(effective.await, "effective tackle"),
        possession: joined(possession.await, "possession"),
    };

    merge(stats, report, secondary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(label: &str, home: &str, away: &str) -> String {
        format!(
            r#"<figure class="stats-bar-chart">
                 <figcaption class="stats-bar-chart__title">{}</figcaption>
                 <dl>
                   <dd class="stats-bar-chart__label stats-bar-chart__label--home">{}</dd>
                   <dd class="stats-bar-chart__label stats-bar-chart__label--away">{}</dd>
                 </dl>
               </figure>"#,
            label, home, away
        )
    }

    fn gauge(title: &str, home: &str, away: &str, extra_class: &str) -> String {
        format!(
            r#"<div class="u-spacing-pb-24 u-spacing-pt-16 u-width-100">
                 <h3 class="stats-bar-chart__title">{title}</h3>
                 <div class="donut-chart-stat__value"><span><span>{home}</span><span class="{extra_class}">x</span></span></div>
                 <div class="donut-chart-stat__value"><span><span>{away}</span><span class="{extra_class}">x</span></span></div>
               </div>"#
        )
    }

    fn page(body: &str) -> String {
        format!("<html><body>{}</body></html>", body)
    }

    #[test]
    fn test_merged_table_has_every_label() {
        let table = bar_chart_table();

        assert_eq!(table.len(), 7 + 4 + 5 + 4 + 5);
        assert!(table.contains("All Runs"));
        assert!(table.contains("Dummy Passes"));
        assert!(table.contains("Grubbers"));
        assert!(table.contains("Intercepts"));
        assert!(table.contains("On Reports"));
    }

    #[test]
    fn test_dispatch_stops_when_table_is_exhausted() {
        let wanted = ["All Runs", "Offloads", "Kicks", "Tackles Made", "Errors"];
        let mut table = bar_chart_table();
        table.retain(|label| wanted.contains(&label));
        assert_eq!(table.len(), 5);

        let mut body = String::new();
        body.push_str(&bar("All Runs", "170", "165"));
        body.push_str(&bar("Offloads", "9", "12"));
        body.push_str(&bar("Kicks", "21", "19"));
        body.push_str(&bar("Tackles Made", "312", "298"));
        body.push_str(&bar("Errors", "7", "11"));
        // unrelated charts after the last wanted label
        body.push_str(&bar("Line Breaks", "5", "3"));
        body.push_str(&bar("Bombs", "4", "2"));

        let mut stats = MatchStats::default();
        let report = scan_bar_charts(&page(&body), table, &mut stats);

        assert_eq!(report.examined, 5);
        assert!(report.unresolved.is_empty());
        assert_eq!(stats.attack.runs, Pair::new(170, 165));
        assert_eq!(stats.passing.offloads, Pair::new(9, 12));
        assert_eq!(stats.kicking.kicks, Pair::new(21, 19));
        assert_eq!(stats.defence.tackles_made, Pair::new(312, 298));
        assert_eq!(stats.negative_plays.errors, Pair::new(7, 11));
        // never reached
        assert_eq!(stats.attack.line_breaks, Pair::default());
    }

    #[test]
    fn test_each_label_is_consumed_once() {
        let mut table = DispatchTable::new();
        table.register("Kicks", |s, h, a| s.kicking.kicks = int_pair(h, a));
        table.register("Bombs", |s, h, a| s.kicking.bombs = int_pair(h, a));

        let body = format!(
            "{}{}{}",
            bar("Kicks", "21", "19"),
            bar("Kicks", "99", "99"),
            bar("Grubbers", "1", "1")
        );

        let mut stats = MatchStats::default();
        let report = scan_bar_charts(&page(&body), table, &mut stats);

        assert_eq!(stats.kicking.kicks, Pair::new(21, 19));
        assert_eq!(report.examined, 3);
        assert_eq!(report.unresolved, vec!["Bombs"]);
    }

    #[test]
    fn test_unparsable_values_are_zero() {
        let mut stats = MatchStats::default();
        scan_bar_charts(
            &page(&format!(
                "{}{}",
                bar("All Run Metres", "1,523", "-"),
                bar("Average Set Distance", "45.5m", "n/a")
            )),
            attack_handlers(),
            &mut stats,
        );

        assert_eq!(stats.attack.run_metres, Pair::new(1523, 0));
        assert_eq!(stats.attack.avg_set_distance, Pair::new(45.5, 0.0));
    }

    #[test]
    fn test_completion_split() {
        assert_eq!(completion("33/40"), (33, 40));
        assert_eq!(completion("33"), (0, 0));
    }

    fn full_page() -> String {
        let mut body = String::new();
        body.push_str(r#"<p class="match-centre-card-donut__value--home">52%</p>"#);
        body.push_str(r#"<p class="match-centre-card-donut__value--away">48%</p>"#);
        body.push_str(&bar("Time In Possession", "20:51", "19:09"));
        body.push_str(
            r#"<div class="u-spacing-pb-24 u-spacing-pt-16 u-width-100">
                 <h3 class="stats-bar-chart__title">Completion Rate</h3>
                 <p class="match-centre-card-donut__value match-centre-card-donut__value--footer">33/40</p>
                 <p class="match-centre-card-donut__value match-centre-card-donut__value--footer">30/38</p>
               </div>"#,
        );
        body.push_str(&gauge("Average Play The Ball Speed", "3.41", "3.62", "donut-chart__unit"));
        body.push_str(&gauge("Kick Defusal %", "90", "85", "donut-chart-stat__value--sup"));
        body.push_str(&gauge("Effective Tackle %", "88.2", "86.9", "donut-chart-stat__value--sup"));
        body.push_str(&bar("All Runs", "170", "165"));
        body.push_str(&bar("Receipts", "301", "287"));
        body.push_str(&bar("Forced Drop Outs", "2", "1"));
        body.push_str(&bar("Missed Tackles", "31", "40"));
        body.push_str(&bar("Penalties Conceded", "6", "8"));
        page(&body)
    }

    #[test]
    fn test_full_page() {
        let stats = extract_match_stats(&full_page());

        assert_eq!(stats.possession.possession, Pair::new(52, 48));
        assert_eq!(
            stats.possession.possession_time,
            Pair::new("20:51".to_string(), "19:09".to_string())
        );
        assert_eq!(stats.possession.sets, Pair::new(40, 38));
        assert_eq!(stats.possession.sets_completed, Pair::new(33, 30));

        assert_eq!(stats.attack.avg_play_the_ball_speed, Pair::new(3.41, 3.62));
        assert_eq!(stats.kicking.kick_defusal, Pair::new(90, 85));
        assert_eq!(stats.defence.effective_tackle, Pair::new(88.2, 86.9));

        assert_eq!(stats.attack.runs, Pair::new(170, 165));
        assert_eq!(stats.passing.receipts, Pair::new(301, 287));
        assert_eq!(stats.kicking.forced_drop_outs, Pair::new(2, 1));
        assert_eq!(stats.defence.missed_tackles, Pair::new(31, 40));
        assert_eq!(stats.negative_plays.penalties_conceded, Pair::new(6, 8));
    }

    #[tokio::test]
    async fn test_blocking_pool_scans_match_inline_extraction() {
        let html = full_page();
        let harvested = harvest_match_stats(Arc::from(html.as_str())).await;

        assert_eq!(harvested, extract_match_stats(&html));
        assert_eq!(harvested.possession.sets_completed, Pair::new(33, 30));
        assert_eq!(harvested.kicking.kick_defusal, Pair::new(90, 85));
    }

    #[test]
    fn test_completion_rate_missing_away_value() {
        let body = r#"<div class="u-spacing-pb-24 u-spacing-pt-16 u-width-100">
                 <h3 class="stats-bar-chart__title">Completion Rate</h3>
                 <p class="match-centre-card-donut__value match-centre-card-donut__value--footer">33/40</p>
               </div>"#;

        let stats = scan_possession(&page(body));
        assert_eq!(stats.sets, Pair::new(40, 0));
        assert_eq!(stats.sets_completed, Pair::new(33, 0));
    }
}
