//! Crawl coordinator - the recursive fan-out over the draw hierarchy
//!
//! Competition -> Seasons -> Rounds -> Matches -> {Stats, PlayByPlay, TeamList}
//!
//! Every node runs as its own task and moves through the `NodeState`
//! lifecycle. A parent registers its children in a `JoinSet` and completes
//! only once all of them have ended; a failed or panicked child is logged
//! and left out of the result tree without touching its siblings.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{build_fetcher, FetchError, FetchRequest, Fetcher, Interaction};
use crate::crawler::gate::FetchGate;
use crate::crawler::progress::{spawn_reporter, ProgressTracker};
use crate::crawler::retry::fetch_with_retry;
use crate::extract::{
    extract_match_details, extract_matches, extract_plays, extract_round_dates, extract_rounds,
    extract_seasons, extract_team_lists, harvest_match_stats, MatchLink,
};
use crate::model::{Competition, Match, MatchDetails, MatchStats, Play, Player, Round, Season};
use crate::state::{Node, NodeKind, NodeState};
use crate::storage::{RecordStore, RunStatus, SqliteStore};
use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

const SEASON_DROPDOWN: &str = "[aria-controls=\"season-dropdown\"]";
const ROUND_DROPDOWN: &str = "[aria-controls=\"round-dropdown\"]";
const DROPDOWN_SETTLE: Duration = Duration::from_secs(2);

/// Address of a draw page
///
/// Without a season the site shows its current season.
pub fn draw_address(base: &Url, competition_id: i64, round: u32, season: Option<&str>) -> String {
    let mut address = base.join("/draw/").unwrap_or_else(|_| base.clone());
    {
        let mut query = address.query_pairs_mut();
        query
            .append_pair("competition", &competition_id.to_string())
            .append_pair("round", &round.to_string());
        if let Some(season) = season {
            query.append_pair("season", season);
        }
    }
    address.into()
}

/// Script that opens a dropdown and lets its list render
fn open_dropdown(control: &str) -> Vec<Interaction> {
    vec![
        Interaction::WaitVisible(control.to_string()),
        Interaction::Click(control.to_string()),
        Interaction::Sleep(DROPDOWN_SETTLE),
    ]
}

/// Narrows the listed seasons to the ones to crawl
///
/// An empty filter selects only the first listed (most recent) season.
pub fn select_seasons(listed: Vec<String>, wanted: &[String], all: bool) -> Vec<String> {
    if all {
        return listed;
    }

    if wanted.is_empty() {
        return listed.into_iter().take(1).collect();
    }

    for year in wanted {
        if !listed.contains(year) {
            tracing::warn!("Season {} is not listed on the draw page", year);
        }
    }

    listed.into_iter().filter(|y| wanted.contains(y)).collect()
}

/// Rounds in chronological order with their 1-based index
///
/// The dropdown lists the latest round first.
pub fn index_rounds(listed: Vec<String>) -> Vec<(u32, String)> {
    listed
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, name)| (i as u32 + 1, name))
        .collect()
}

/// Everything a node task needs, shared by the whole tree
struct CrawlContext {
    crawler: CrawlerConfig,
    base: Url,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn RecordStore>,
    gate: FetchGate,
    timeout: Duration,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
}

impl CrawlContext {
    /// Fetches one page through the gate, moving the node to Fetching
    ///
    /// The slot is held for every attempt and released before the caller
    /// goes on to extract or persist.
    async fn fetch(&self, node: &mut Node, request: FetchRequest) -> Result<String> {
        node.advance(NodeState::Fetching)?;

        if self.cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        let slot = self.gate.acquire().await.ok_or(HarvestError::Cancelled)?;
        let result = fetch_with_retry(
            self.fetcher.as_ref(),
            &request,
            true,
            self.timeout,
            &self.cancel,
        )
        .await;
        drop(slot);

        result.map_err(|e| match e {
            FetchError::Cancelled { .. } => HarvestError::Cancelled,
            other => other.into(),
        })
    }

    fn draw(&self, round: u32, season: Option<&str>) -> String {
        draw_address(&self.base, self.crawler.competition_id, round, season)
    }
}

/// Drives one crawl of the configured competition
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a coordinator over the given fetcher and store
    ///
    /// # Arguments
    ///
    /// * `crawler` - Crawl scope and concurrency settings
    /// * `fetcher` - Source of rendered pages
    /// * `store` - Where records are persisted
    /// * `cancel` - Root token; cancelling it drains the whole tree
    pub fn new(
        crawler: &CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn RecordStore>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let base = Url::parse(&crawler.base_url)?;

        Ok(Self {
            ctx: Arc::new(CrawlContext {
                crawler: crawler.clone(),
                base,
                fetcher,
                store,
                gate: FetchGate::new(crawler.max_concurrent_fetches as usize),
                timeout: Duration::from_secs(crawler.fetch_timeout_secs),
                progress: Arc::new(ProgressTracker::new()),
                cancel,
            }),
        })
    }

    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.ctx.progress)
    }

    pub fn gate(&self) -> &FetchGate {
        &self.ctx.gate
    }

    /// Crawls the competition and returns what was harvested
    ///
    /// Fails only when the competition node itself fails. Failed subtrees
    /// below it are logged and missing from the returned tree.
    pub async fn run(&self) -> Result<Competition> {
        // a cancelled crawl must also release everyone waiting on the gate
        let closer = {
            let gate = self.ctx.gate.clone();
            let cancel = self.ctx.cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                gate.close();
            })
        };

        let result = crawl_competition(Arc::clone(&self.ctx)).await;
        closer.abort();
        result
    }
}

/// Parses a fetched page on the blocking pool
async fn parse<P, T, F>(page: P, extract: F) -> Result<T>
where
    P: AsRef<str> + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&str) -> T + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(move || extract(page.as_ref())).await?)
}

/// Collects the results of every child, in their original order
async fn join_children<T: 'static>(set: &mut JoinSet<Result<(usize, T)>>, what: &str) -> Vec<T> {
    let mut done = Vec::with_capacity(set.len());

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(child)) => done.push(child),
            Ok(Err(HarvestError::Cancelled)) => {
                tracing::debug!("{} cancelled", what);
            }
            Ok(Err(e)) => {
                tracing::debug!("{} subtree dropped: {}", what, e);
            }
            Err(e) if e.is_panic() => {
                tracing::warn!("{} task panicked: {}", what, e);
            }
            Err(e) => {
                tracing::debug!("{} task aborted: {}", what, e);
            }
        }
    }

    done.sort_by_key(|(position, _)| *position);
    done.into_iter().map(|(_, child)| child).collect()
}

async fn crawl_competition(ctx: Arc<CrawlContext>) -> Result<Competition> {
    let _unit = ctx.progress.start();
    let mut node = Node::new(NodeKind::Competition, ctx.crawler.competition_name.clone());

    let result = competition_body(&ctx, &mut node).await;
    let competition = result.map_err(|e| node.fail(e))?;

    tracing::info!(
        "Competition {} done: {} seasons harvested",
        competition.name,
        competition.seasons.len()
    );
    Ok(competition)
}

async fn competition_body(ctx: &Arc<CrawlContext>, node: &mut Node) -> Result<Competition> {
    let address = ctx.draw(1, None);
    let page = ctx
        .fetch(
            node,
            FetchRequest::new(address.clone()).with_script(open_dropdown(SEASON_DROPDOWN)),
        )
        .await?;

    node.advance(NodeState::Extracting)?;
    let listed = parse(page, extract_seasons).await?;
    if listed.is_empty() {
        return Err(HarvestError::NothingDiscovered {
            what: "seasons",
            address,
        });
    }
    let seasons = select_seasons(listed, &ctx.crawler.seasons, ctx.crawler.all_seasons);
    tracing::info!("Crawling seasons: {}", seasons.join(", "));

    node.advance(NodeState::Persisting)?;
    let competition_id = ctx.crawler.competition_id;
    ctx.store
        .ensure_competition(competition_id, &ctx.crawler.competition_name)
        .await?;

    node.advance(NodeState::Spawning)?;
    let mut children = JoinSet::new();
    for (position, year) in seasons.into_iter().enumerate() {
        children.spawn(crawl_season(Arc::clone(ctx), position, year));
    }

    node.advance(NodeState::AwaitingChildren)?;
    let seasons = join_children(&mut children, "Season").await;

    node.advance(NodeState::Done)?;
    Ok(Competition {
        id: competition_id,
        name: ctx.crawler.competition_name.clone(),
        seasons,
    })
}

async fn crawl_season(ctx: Arc<CrawlContext>, position: usize, year: String) -> Result<(usize, Season)> {
    let _unit = ctx.progress.start();
    let mut node = Node::new(NodeKind::Season, year.clone());

    let result = season_body(&ctx, &mut node, year).await;
    let season = result.map_err(|e| node.fail(e))?;

    tracing::info!(
        "Season {} done: {} rounds harvested",
        season.year,
        season.rounds.len()
    );
    Ok((position, season))
}

async fn season_body(ctx: &Arc<CrawlContext>, node: &mut Node, year: String) -> Result<Season> {
    let address = ctx.draw(1, Some(&year));
    let page = ctx
        .fetch(
            node,
            FetchRequest::new(address.clone()).with_script(open_dropdown(ROUND_DROPDOWN)),
        )
        .await?;

    node.advance(NodeState::Extracting)?;
    let rounds = index_rounds(parse(page, extract_rounds).await?);
    if rounds.is_empty() {
        return Err(HarvestError::NothingDiscovered {
            what: "rounds",
            address,
        });
    }

    node.advance(NodeState::Persisting)?;
    let season_id = ctx
        .store
        .ensure_season(ctx.crawler.competition_id, &year)
        .await?;

    node.advance(NodeState::Spawning)?;
    let year: Arc<str> = Arc::from(year);
    let mut children = JoinSet::new();
    for (position, (index, name)) in rounds.into_iter().enumerate() {
        children.spawn(crawl_round(
            Arc::clone(ctx),
            position,
            season_id,
            Arc::clone(&year),
            index,
            name,
        ));
    }

    node.advance(NodeState::AwaitingChildren)?;
    let rounds = join_children(&mut children, "Round").await;

    node.advance(NodeState::Done)?;
    Ok(Season {
        year: year.to_string(),
        rounds,
    })
}

async fn crawl_round(
    ctx: Arc<CrawlContext>,
    position: usize,
    season_id: i64,
    year: Arc<str>,
    index: u32,
    name: String,
) -> Result<(usize, Round)> {
    let _unit = ctx.progress.start();
    let mut node = Node::new(NodeKind::Round, format!("{} {}", year, name));

    let result = round_body(&ctx, &mut node, season_id, &year, index, name).await;
    let round = result.map_err(|e| node.fail(e))?;

    tracing::debug!(
        "Round {} of {} done: {} matches harvested",
        round.index,
        year,
        round.matches.len()
    );
    Ok((position, round))
}

async fn round_body(
    ctx: &Arc<CrawlContext>,
    node: &mut Node,
    season_id: i64,
    year: &str,
    index: u32,
    name: String,
) -> Result<Round> {
    let page = ctx
        .fetch(node, FetchRequest::new(ctx.draw(index, Some(year))))
        .await?;

    node.advance(NodeState::Extracting)?;
    let (links, dates) =
        parse(page, |html| (extract_matches(html), extract_round_dates(html))).await?;

    node.advance(NodeState::Persisting)?;
    let handle = ctx.store.ensure_round(season_id, index, &name).await?;

    if handle.dates_set {
        tracing::debug!("Round {} of {} already has dates", index, year);
    } else {
        match &dates {
            Some((start, end)) => ctx.store.set_round_dates(handle.id, start, end).await?,
            None => tracing::warn!("No dates found for round {} of {}", index, year),
        }
    }

    let mut matches = Vec::with_capacity(links.len());
    for link in links {
        let match_id = ctx
            .store
            .ensure_match(handle.id, &link.home_team, &link.away_team)
            .await?;
        matches.push((match_id, link));
    }

    let (start_day, end_day) = dates.unzip();
    let mut round = Round {
        index,
        name,
        start_day,
        end_day,
        matches: Vec::new(),
    };

    if matches.is_empty() {
        tracing::debug!("No matches listed for round {} of {}", index, year);
        node.advance(NodeState::Done)?;
        return Ok(round);
    }

    node.advance(NodeState::Spawning)?;
    let mut children = JoinSet::new();
    for (position, (match_id, link)) in matches.into_iter().enumerate() {
        children.spawn(crawl_match(Arc::clone(ctx), position, match_id, link));
    }

    node.advance(NodeState::AwaitingChildren)?;
    round.matches = join_children(&mut children, "Match").await;

    node.advance(NodeState::Done)?;
    Ok(round)
}

async fn crawl_match(
    ctx: Arc<CrawlContext>,
    position: usize,
    match_id: i64,
    link: MatchLink,
) -> Result<(usize, Match)> {
    let _unit = ctx.progress.start();
    let mut node = Node::new(
        NodeKind::Match,
        format!("{} v {}", link.home_team, link.away_team),
    );

    let result = match_body(&ctx, &mut node, match_id, link).await;
    let harvested = result.map_err(|e| node.fail(e))?;
    Ok((position, harvested))
}

/// Output of one per-match extraction
enum MatchPart {
    Stats(MatchStats),
    Plays(Vec<Play>),
    Teams {
        home: Vec<Player>,
        away: Vec<Player>,
        details: MatchDetails,
    },
}

async fn match_body(
    ctx: &Arc<CrawlContext>,
    node: &mut Node,
    match_id: i64,
    link: MatchLink,
) -> Result<Match> {
    let address = ctx.base.join(&link.href)?;
    let page: Arc<str> = ctx
        .fetch(node, FetchRequest::new(address.as_str()))
        .await?
        .into();

    node.advance(NodeState::Spawning)?;
    let mut children = JoinSet::new();
    children.spawn(harvest_stats(Arc::clone(ctx), match_id, Arc::clone(&page)));
    children.spawn(harvest_plays(Arc::clone(ctx), match_id, Arc::clone(&page)));
    children.spawn(harvest_teams(Arc::clone(ctx), match_id, page));

    node.advance(NodeState::AwaitingChildren)?;
    let parts = join_children(&mut children, "Match detail").await;

    let mut harvested = Match {
        home_team: link.home_team,
        away_team: link.away_team,
        ..Match::default()
    };

    for part in parts {
        match part {
            MatchPart::Stats(stats) => harvested.stats = Some(stats),
            MatchPart::Plays(plays) => harvested.play_by_play = plays,
            MatchPart::Teams {
                home,
                away,
                details,
            } => {
                harvested.home_team_list = home;
                harvested.away_team_list = away;
                harvested.home_score = details.home_score;
                harvested.away_score = details.away_score;
                harvested.location = details.location;
                harvested.date_played = details.date_played;
                harvested.weather = details.weather;
            }
        }
    }

    node.advance(NodeState::Done)?;
    Ok(harvested)
}

/// Starts a per-match extraction node, already moved to Extracting
fn extraction_node(kind: NodeKind, match_id: i64) -> Result<Node> {
    let mut node = Node::new(kind, format!("match {}", match_id));
    node.advance(NodeState::Extracting)?;
    Ok(node)
}

async fn harvest_stats(
    ctx: Arc<CrawlContext>,
    match_id: i64,
    page: Arc<str>,
) -> Result<(usize, MatchPart)> {
    let _unit = ctx.progress.start();
    let mut node = extraction_node(NodeKind::Stats, match_id)?;
    let stats = harvest_match_stats(page).await;

    node.advance(NodeState::Persisting)?;
    let result = store_stats(&ctx, match_id, &stats).await;
    result.map_err(|e| node.fail(e))?;

    node.advance(NodeState::Done)?;
    Ok((0, MatchPart::Stats(stats)))
}

/// Persists every group, returning the first failure after trying them all
async fn store_stats(ctx: &CrawlContext, match_id: i64, stats: &MatchStats) -> Result<()> {
    let mut first_error = None;

    for group in stats.clone().into_groups() {
        if let Err(e) = ctx.store.upsert_stat_group(match_id, &group).await {
            tracing::warn!("Failed to store {} for match {}: {}", group.table(), match_id, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn harvest_plays(
    ctx: Arc<CrawlContext>,
    match_id: i64,
    page: Arc<str>,
) -> Result<(usize, MatchPart)> {
    let _unit = ctx.progress.start();
    let mut node = extraction_node(NodeKind::PlayByPlay, match_id)?;
    let plays = parse(page, extract_plays).await.map_err(|e| node.fail(e))?;

    node.advance(NodeState::Persisting)?;
    let result = ctx.store.upsert_plays(match_id, &plays).await;
    result.map_err(|e| node.fail(e.into()))?;

    node.advance(NodeState::Done)?;
    Ok((1, MatchPart::Plays(plays)))
}

async fn harvest_teams(
    ctx: Arc<CrawlContext>,
    match_id: i64,
    page: Arc<str>,
) -> Result<(usize, MatchPart)> {
    let _unit = ctx.progress.start();
    let mut node = extraction_node(NodeKind::TeamList, match_id)?;
    let ((home, away), details) = parse(page, |html| {
        (extract_team_lists(html), extract_match_details(html))
    })
    .await
    .map_err(|e| node.fail(e))?;

    node.advance(NodeState::Persisting)?;
    let result = store_teams(&ctx, match_id, &home, &away, &details).await;
    result.map_err(|e| node.fail(e))?;

    node.advance(NodeState::Done)?;
    Ok((2, MatchPart::Teams { home, away, details }))
}

async fn store_teams(
    ctx: &CrawlContext,
    match_id: i64,
    home: &[Player],
    away: &[Player],
    details: &MatchDetails,
) -> Result<()> {
    if home.is_empty() && away.is_empty() {
        tracing::warn!("No team lists found for match {}", match_id);
    } else {
        ctx.store.upsert_team_lists(match_id, home, away).await?;
    }

    if details.is_empty() {
        tracing::warn!("No score, venue or weather found for match {}", match_id);
    } else {
        ctx.store.update_match_details(match_id, details).await?;
    }

    Ok(())
}

/// How a crawl run ended
#[derive(Debug)]
pub struct CrawlReport {
    pub run_id: i64,
    pub status: RunStatus,
    /// Harvested tree, absent when the competition node failed
    pub competition: Option<Competition>,
}

/// Runs a complete crawl as configured
///
/// Opens the store, records the run, crawls with progress reporting, and
/// marks the run completed, interrupted or failed.
pub async fn run_crawl(config: &Config, config_hash: &str, cancel: CancellationToken) -> Result<CrawlReport> {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open(&config.database)?);
    let fetcher = build_fetcher(&config.fetcher)?;

    let run_id = store.begin_run(config_hash).await?;
    tracing::info!("Starting crawl run {}", run_id);

    let coordinator = Coordinator::new(&config.crawler, fetcher, Arc::clone(&store), cancel.clone())?;

    let stop_reporter = CancellationToken::new();
    let reporter = spawn_reporter(
        coordinator.progress(),
        Duration::from_secs(config.output.progress_interval_secs.max(1)),
        stop_reporter.clone(),
    );

    let started = std::time::Instant::now();
    let result = coordinator.run().await;

    stop_reporter.cancel();
    if let Err(e) = reporter.await {
        tracing::debug!("Progress reporter ended abnormally: {}", e);
    }

    let (status, competition) = match result {
        Ok(competition) if cancel.is_cancelled() => (RunStatus::Interrupted, Some(competition)),
        Ok(competition) => (RunStatus::Completed, Some(competition)),
        Err(HarvestError::Cancelled) => (RunStatus::Interrupted, None),
        Err(e) => {
            tracing::error!("Crawl run {} failed: {}", run_id, e);
            (RunStatus::Failed, None)
        }
    };

    store.finish_run(run_id, status).await?;

    let progress = coordinator.progress();
    tracing::info!(
        "Crawl run {} {}: {} units finished in {:?}",
        run_id,
        status.to_db_string(),
        progress.finished(),
        started.elapsed()
    );

    Ok(CrawlReport {
        run_id,
        status,
        competition,
    })
}
