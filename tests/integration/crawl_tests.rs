//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small copy of the draw and match
//! centre pages and run complete crawls against it over HTTP.

use nrl_harvest::config::{parse_config, Config};
use nrl_harvest::crawler::{run_crawl, REQUIRED_FETCH_ATTEMPTS};
use nrl_harvest::model::Pair;
use nrl_harvest::output::write_dump;
use nrl_harvest::storage::{RecordStore, RunStatus, SqliteStore};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PANTHERS_BRONCOS: &str = "/draw/nrl-premiership/2024/round-1/panthers-v-broncos/";
const EELS_SHARKS: &str = "/draw/nrl-premiership/2024/round-1/eels-v-sharks/";
const STORM_ROOSTERS: &str = "/draw/nrl-premiership/2024/round-2/storm-v-roosters/";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let db = dir.path().join("harvest.db");
    let dump = dir.path().join("output").join("results.json");

    parse_config(&format!(
        r#"
        [crawler]
        base-url = "{}"
        competition-id = 111
        competition-name = "NRL Premiership"
        max-concurrent-fetches = 4
        fetch-timeout-secs = 5

        [fetcher]
        mode = "http"

        [database]
        path = '{}'

        [output]
        dump-path = '{}'
        progress-interval-secs = 1
        "#,
        base_url,
        db.display(),
        dump.display()
    ))
    .expect("test config should be valid")
}

fn match_card(home: &str, away: &str, href: &str) -> String {
    format!(
        r#"<div class="match">
             <p class="match-team__name--home">{home}</p>
             <p class="match-team__name--away">{away}</p>
             <a class="match--highlighted u-flex-column u-flex-align-items-center u-width-100"
                href="{href}">Match Centre</a>
           </div>"#
    )
}

/// Round 1 page; also the page the season and round dropdowns are read from
fn round_one_page(first_day: &str) -> String {
    format!(
        r#"<html><body>
             <div id="season-dropdown"><ul>
               <li><button><div>2024</div></button></li>
               <li><button><div>2023</div></button></li>
             </ul></div>
             <div id="round-dropdown"><ul>
               <li><button><div>Round 2</div></button></li>
               <li><button><div>Round 1</div></button></li>
             </ul></div>
             <p class="match-header__title">{first_day}</p>
             {}
             <p class="match-header__title">Sunday 10 March</p>
             {}
           </body></html>"#,
        match_card("Panthers", "Broncos", PANTHERS_BRONCOS),
        match_card("Eels", "Sharks", EELS_SHARKS),
    )
}

fn round_two_page() -> String {
    format!(
        r#"<html><body>
             <p class="match-header__title">Friday 15 March</p>
             {}
           </body></html>"#,
        match_card("Storm", "Roosters", STORM_ROOSTERS),
    )
}

fn bar(label: &str, home: &str, away: &str) -> String {
    format!(
        r#"<figure class="stats-bar-chart">
             <figcaption class="stats-bar-chart__title">{label}</figcaption>
             <dl>
               <dd class="stats-bar-chart__label stats-bar-chart__label--home">{home}</dd>
               <dd class="stats-bar-chart__label stats-bar-chart__label--away">{away}</dd>
             </dl>
           </figure>"#
    )
}

/// Values on the site that change between crawls
#[derive(Clone, Copy)]
struct Site {
    first_day: &'static str,
    home_score: u32,
    venue: &'static str,
    weather: &'static str,
    home_runs: &'static str,
}

const ORIGINAL: Site = Site {
    first_day: "Thursday 7 March",
    home_score: 8,
    venue: "BlueBet Stadium",
    weather: "Fine",
    home_runs: "170",
};

/// The same site after a fixture move, a score correction, a venue change,
/// a weather update and a revised run count
const REVISED: Site = Site {
    first_day: "Wednesday 6 March",
    home_score: 12,
    venue: "CommBank Stadium",
    weather: "Showers",
    home_runs: "174",
};

fn match_page(home: &str, away: &str, home_score: u32, site: Site) -> String {
    let Site {
        venue,
        weather,
        home_runs,
        ..
    } = site;

    format!(
        r#"<html><body>
             <p class="match-header__title">Thursday 7 March</p>
             <div class="match-team__score match-team__score--home">{home_score}</div>
             <div class="match-team__score match-team__score--away">6</div>
             <p class="match-venue o-text">{venue}</p>
             <p class="match-weather__text">Weather: <span>{weather}</span></p>

             <div class="match-centre-event">
               <span class="match-centre-event__timestamp">2'</span>
               <p class="match-centre-event__title">Try</p>
               <p class="match-centre-event__team-name">{home}</p>
             </div>
             <div class="match-centre-event">
               <span class="match-centre-event__timestamp">3'</span>
               <p class="match-centre-event__title">Conversion</p>
               <p class="match-centre-event__team-name">{home}</p>
             </div>

             <div class="team-list__container">
               <div class="team-list">
                 <div class="team-list-position">
                   <p><span class="team-list-position__number">1</span></p>
                   <span class="team-list-position__text">Fullback</span>
                 </div>
                 <div class="team-list-profile team-list-profile--home">
                   <div class="team-list-profile-content"><div class="team-list-profile__name">{home} Fullback</div></div>
                 </div>
                 <div class="team-list-profile team-list-profile--away">
                   <div class="team-list-profile-content"><div class="team-list-profile__name">{away} Fullback</div></div>
                 </div>
               </div>
             </div>

             <p class="match-centre-card-donut__value--home">52%</p>
             <p class="match-centre-card-donut__value--away">48%</p>
             {}{}{}
           </body></html>"#,
        bar("All Runs", home_runs, "165"),
        bar("Offloads", "9", "12"),
        bar("Tackles Made", "1,012", "998"),
    )
}

async fn mount_html(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts the whole site as described by `site`
async fn mount_site(server: &MockServer, site: Site) {
    Mock::given(method("GET"))
        .and(path("/draw/"))
        .and(query_param("round", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(round_one_page(site.first_day)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draw/"))
        .and(query_param("round", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(round_two_page()))
        .mount(server)
        .await;

    mount_html(
        server,
        PANTHERS_BRONCOS,
        match_page("Panthers", "Broncos", site.home_score, site),
    )
    .await;
    mount_html(server, EELS_SHARKS, match_page("Eels", "Sharks", 20, site)).await;
    mount_html(server, STORM_ROOSTERS, match_page("Storm", "Roosters", 30, site)).await;
}

fn open_store(config: &Config) -> SqliteStore {
    SqliteStore::open(&config.database).expect("store should open")
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let server = MockServer::start().await;
    mount_site(&server, ORIGINAL).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let report = run_crawl(&config, "hash-1", CancellationToken::new())
        .await
        .expect("crawl should run");
    assert_eq!(report.status, RunStatus::Completed);

    let competition = report.competition.expect("tree should be returned");
    assert_eq!(competition.id, 111);
    assert_eq!(competition.seasons.len(), 1, "only the latest season by default");

    let season = &competition.seasons[0];
    assert_eq!(season.year, "2024");
    assert_eq!(season.rounds.len(), 2);
    assert_eq!(season.rounds[0].index, 1);
    assert_eq!(season.rounds[0].name, "Round 1");
    assert_eq!(season.rounds[1].index, 2);
    assert_eq!(season.rounds[1].name, "Round 2");

    let round = &season.rounds[0];
    assert_eq!(round.start_day.as_deref(), Some("Thursday 7 March"));
    assert_eq!(round.end_day.as_deref(), Some("Sunday 10 March"));
    assert_eq!(round.matches.len(), 2);

    let panthers = &round.matches[0];
    assert_eq!(panthers.home_team, "Panthers");
    assert_eq!(panthers.away_team, "Broncos");
    assert_eq!(panthers.home_score, Some(8));
    assert_eq!(panthers.away_score, Some(6));
    assert_eq!(panthers.location.as_deref(), Some("BlueBet Stadium"));
    assert_eq!(panthers.weather.as_deref(), Some("Fine"));
    assert_eq!(panthers.play_by_play.len(), 2);
    assert_eq!(panthers.home_team_list.len(), 1);
    assert_eq!(panthers.home_team_list[0].first_name, "Panthers");

    let stats = panthers.stats.as_ref().expect("stats should be harvested");
    assert_eq!(stats.attack.runs, Pair::new(170, 165));
    assert_eq!(stats.passing.offloads, Pair::new(9, 12));
    assert_eq!(stats.defence.tackles_made, Pair::new(1012, 998));
    assert_eq!(stats.possession.possession, Pair::new(52, 48));

    let store = open_store(&config);
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.competitions, 1);
    assert_eq!(counts.seasons, 1);
    assert_eq!(counts.rounds, 2);
    assert_eq!(counts.matches, 3);
    assert_eq!(counts.players, 6);
    assert_eq!(counts.plays, 6);
    assert_eq!(counts.matches_with_stats, 3);

    let run = store.latest_run().await.unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let server = MockServer::start().await;
    mount_site(&server, ORIGINAL).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    run_crawl(&config, "hash", CancellationToken::new()).await.unwrap();
    let store = open_store(&config);
    let first = store.counts().await.unwrap();
    let first_tree = store.load_competition(111).await.unwrap().unwrap();

    run_crawl(&config, "hash", CancellationToken::new()).await.unwrap();
    let second = store.counts().await.unwrap();
    let second_tree = store.load_competition(111).await.unwrap().unwrap();

    assert_eq!(first_tree, second_tree);

    assert_eq!(first.competitions, second.competitions);
    assert_eq!(first.seasons, second.seasons);
    assert_eq!(first.rounds, second.rounds);
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.players, second.players);
    assert_eq!(first.plays, second.plays);
    assert_eq!(second.runs, 2);
}

#[tokio::test]
async fn test_round_dates_set_once_and_match_data_replaced() {
    let server = MockServer::start().await;
    mount_site(&server, ORIGINAL).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    run_crawl(&config, "hash", CancellationToken::new()).await.unwrap();

    server.reset().await;
    mount_site(&server, REVISED).await;
    run_crawl(&config, "hash", CancellationToken::new()).await.unwrap();

    let store = open_store(&config);
    let stored = store.load_competition(111).await.unwrap().unwrap();
    let round = &stored.seasons[0].rounds[0];

    assert_eq!(round.start_day.as_deref(), Some("Thursday 7 March"));

    let panthers = &round.matches[0];
    assert_eq!(panthers.home_team, "Panthers");
    assert_eq!(panthers.home_score, Some(12));
    assert_eq!(panthers.away_score, Some(6));
    assert_eq!(panthers.location.as_deref(), Some("CommBank Stadium"));
    assert_eq!(panthers.weather.as_deref(), Some("Showers"));

    let stats = panthers.stats.as_ref().expect("stats should be stored");
    assert_eq!(stats.attack.runs, Pair::new(174, 165));
    assert_eq!(stats.passing.offloads, Pair::new(9, 12));

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.matches, 3);
    assert_eq!(counts.players, 6);
    assert_eq!(counts.plays, 6);
}

#[tokio::test]
async fn test_failing_match_page_is_isolated() {
    let server = MockServer::start().await;

    // mounted first so it takes precedence over the healthy page
    Mock::given(method("GET"))
        .and(path(PANTHERS_BRONCOS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_site(&server, ORIGINAL).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let report = run_crawl(&config, "hash", CancellationToken::new()).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);

    let competition = report.competition.unwrap();
    let round = &competition.seasons[0].rounds[0];
    assert_eq!(round.matches.len(), 1);
    assert_eq!(round.matches[0].home_team, "Eels");
    assert!(round.matches[0].stats.is_some());

    let requests = server.received_requests().await.unwrap();
    let attempts = requests
        .iter()
        .filter(|r| r.url.path() == PANTHERS_BRONCOS)
        .count();
    assert_eq!(attempts, REQUIRED_FETCH_ATTEMPTS as usize);

    let counts = open_store(&config).counts().await.unwrap();
    assert_eq!(counts.matches, 3);
    assert_eq!(counts.matches_with_stats, 2);
}

#[tokio::test]
async fn test_cancelled_run_is_interrupted() {
    let server = MockServer::start().await;
    mount_site(&server, ORIGINAL).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_crawl(&config, "hash", cancel).await.unwrap();
    assert_eq!(report.status, RunStatus::Interrupted);
    assert!(report.competition.is_none());

    let run = open_store(&config).latest_run().await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_export_matches_crawled_tree() {
    let server = MockServer::start().await;
    mount_site(&server, ORIGINAL).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let crawled = run_crawl(&config, "hash", CancellationToken::new())
        .await
        .unwrap()
        .competition
        .unwrap();

    let exported = open_store(&config).load_competition(111).await.unwrap().unwrap();
    assert_eq!(exported.name, crawled.name);
    assert_eq!(exported.seasons.len(), crawled.seasons.len());

    let crawled_round = &crawled.seasons[0].rounds[0];
    let exported_round = &exported.seasons[0].rounds[0];
    assert_eq!(exported_round.start_day, crawled_round.start_day);
    assert_eq!(exported_round.matches.len(), crawled_round.matches.len());
    assert_eq!(exported_round.matches[0].stats, crawled_round.matches[0].stats);
    assert_eq!(
        exported_round.matches[0].play_by_play,
        crawled_round.matches[0].play_by_play
    );

    let dump_path = std::path::Path::new(&config.output.dump_path);
    write_dump(&exported, dump_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dump_path).unwrap()).unwrap();
    assert_eq!(json["seasons"][0]["rounds"][1]["matches"][0]["homeTeam"], "Storm");
}
