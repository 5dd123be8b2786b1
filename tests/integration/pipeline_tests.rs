//! End-to-end pipeline tests against mock HTTP servers

use atelier_rank::config::{
    Config, CrawlConfig, DiscoveryConfig, EnrichConfig, FetchConfig, ScoringConfig, SeedEntry,
    StorageConfig, UserAgentConfig,
};
use atelier_rank::pipeline::{Pipeline, Stage};
use atelier_rank::state::{CrawlState, EnrichState};
use atelier_rank::storage::{NewItem, Store};
use atelier_rank::url::identity_of;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at a temp database
fn test_config(tmp: &TempDir) -> Config {
    Config {
        fetch: FetchConfig {
            min_delay_ms: 100,
            max_retries: 2,
            timeout_secs: 5,
            connect_timeout_secs: 5,
        },
        crawl: CrawlConfig {
            page_cap: 50,
            workers: 2,
        },
        enrich: EnrichConfig {
            budget: 100,
            hidden_cooldown_days: 7,
            stale_after_days: 7,
            workers: 2,
        },
        scoring: ScoringConfig {
            min_votes_prior: 10,
            prior_mean: 3.5,
        },
        discovery: DiscoveryConfig {
            feeds: vec![],
            browse_pages: vec![],
            browse_page_cap: 3,
        },
        user_agent: UserAgentConfig {
            crawler_name: "atelier-rank-test".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: tmp
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
        },
        seeds: vec![],
    }
}

fn listing_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for (href, title) in items {
        html.push_str(&format!(
            r#"<div class="game_cell">
                <a class="title game_link" href="{}">{}</a>
                <div class="published_at">Jan 15, 2024</div>
               </div>"#,
            href, title
        ));
    }
    if let Some(next) = next {
        html.push_str(&format!(r#"<a class="next_page" href="{}">Next</a>"#, next));
    }
    html.push_str("</body></html>");
    html
}

fn rated_detail_page(rating: f64, count: u32) -> String {
    format!(
        r#"<html><body>
        <div class="game_info_panel_widget"><table><tr><td>Status</td><td>Released</td></tr></table></div>
        <div class="aggregate_rating" itemprop="aggregateRating">
            <span itemprop="ratingValue">{}</span>
            (<span itemprop="ratingCount">{}</span> ratings)
        </div>
        <div class="formatted_description">A game.</div>
        </body></html>"#,
        rating, count
    )
}

fn hidden_detail_page() -> String {
    r#"<html><body>
    <div class="game_info_panel_widget"><table><tr><td>Status</td><td>Released</td></tr></table></div>
    <div class="formatted_description">No votes yet.</div>
    </body></html>"#
        .to_string()
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_backfill_walks_pagination_and_marks_complete() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        listing_page(&[("/game-a", "Game A"), ("/game-b", "Game B")], Some("/page2")),
    )
    .await;
    mount_html(
        &server,
        "/page2",
        listing_page(&[("/game-c", "Game C")], None),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(test_config(&tmp), "test".to_string()).unwrap();

    {
        let mut store = pipeline.store().lock().unwrap();
        store.upsert_parent("testdev", &format!("{}/", base)).unwrap();
    }

    let report = pipeline.run_stage(Stage::Backfill).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);

    let store = pipeline.store().lock().unwrap();
    let parent = store.get_parent_by_handle("testdev").unwrap().unwrap();
    assert_eq!(parent.crawl_state, CrawlState::Complete);
    assert_eq!(store.count_items().unwrap(), 3);
    assert_eq!(
        store.count_items_by_state(EnrichState::Unvisited).unwrap(),
        3
    );
}

#[tokio::test]
async fn test_backfill_first_page_failure_leaves_parent_not_started() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(test_config(&tmp), "test".to_string()).unwrap();

    {
        let mut store = pipeline.store().lock().unwrap();
        store.upsert_parent("testdev", &format!("{}/", base)).unwrap();
    }

    let report = pipeline.run_stage(Stage::Backfill).await.unwrap();
    assert_eq!(report.failed, 1);

    let store = pipeline.store().lock().unwrap();
    let parent = store.get_parent_by_handle("testdev").unwrap().unwrap();

    // Never `complete` with an empty history; retried on a later run.
    assert_eq!(parent.crawl_state, CrawlState::NotStarted);
    assert!(parent.crawl_error.is_some());
    assert_eq!(store.count_items().unwrap(), 0);
}

#[tokio::test]
async fn test_backfill_pagination_cycle_terminates() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        listing_page(&[("/game-a", "Game A")], Some("/page2")),
    )
    .await;
    // Page 2 links back to page 1: the walk must end, not loop.
    mount_html(
        &server,
        "/page2",
        listing_page(&[("/game-b", "Game B")], Some("/")),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(test_config(&tmp), "test".to_string()).unwrap();

    {
        let mut store = pipeline.store().lock().unwrap();
        store
            .upsert_parent("testdev", &format!("{}/", server.uri()))
            .unwrap();
    }

    let report = pipeline.run_stage(Stage::Backfill).await.unwrap();
    assert_eq!(report.succeeded, 1);

    let store = pipeline.store().lock().unwrap();
    let parent = store.get_parent_by_handle("testdev").unwrap().unwrap();
    assert_eq!(parent.crawl_state, CrawlState::Complete);
    assert_eq!(store.count_items().unwrap(), 2);
}

#[tokio::test]
async fn test_backfill_page_cap_aborts_without_complete() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        listing_page(&[("/game-a", "Game A")], Some("/p2")),
    )
    .await;
    mount_html(
        &server,
        "/p2",
        listing_page(&[("/game-b", "Game B")], Some("/p3")),
    )
    .await;
    // /p3 is never mounted: the cap stops the walk before it is requested.

    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.crawl.page_cap = 2;
    let pipeline = Pipeline::new(config, "test".to_string()).unwrap();

    {
        let mut store = pipeline.store().lock().unwrap();
        store
            .upsert_parent("testdev", &format!("{}/", server.uri()))
            .unwrap();
    }

    let report = pipeline.run_stage(Stage::Backfill).await.unwrap();
    assert_eq!(report.failed, 1);

    let store = pipeline.store().lock().unwrap();
    let parent = store.get_parent_by_handle("testdev").unwrap().unwrap();

    // Items from the walked pages are kept, but the parent is not complete.
    assert_eq!(parent.crawl_state, CrawlState::InProgress);
    assert_eq!(parent.crawl_error.as_deref(), Some("page cap reached"));
    assert_eq!(store.count_items().unwrap(), 2);
}

/// Seeds one parent with three known items pointing at the mock server.
fn seed_items(pipeline: &Pipeline, base: &str) -> i64 {
    let mut store = pipeline.store().lock().unwrap();
    let (pid, _) = store.upsert_parent("testdev", base).unwrap();

    for slug in ["game-a", "game-b", "game-c"] {
        let (url, identity) = identity_of(&format!("{}/{}", base, slug)).unwrap();
        store
            .upsert_item(
                pid,
                &NewItem {
                    identity,
                    url: url.to_string(),
                    slug: Some(slug.to_string()),
                    title: Some(slug.to_string()),
                    publish_date: None,
                },
            )
            .unwrap();
    }
    pid
}

#[tokio::test]
async fn test_enrichment_scenario_settled_hidden_and_failure() {
    let server = MockServer::start().await;
    let base = server.uri();

    // A: rated. B: positively hidden. C: unparseable page.
    mount_html(&server, "/game-a", rated_detail_page(4.5, 20)).await;
    mount_html(&server, "/game-b", hidden_detail_page()).await;
    mount_html(
        &server,
        "/game-c",
        "<html><body>maintenance</body></html>".to_string(),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(test_config(&tmp), "test".to_string()).unwrap();
    seed_items(&pipeline, &base);

    let report = pipeline.run_stage(Stage::Enrich).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    {
        let store = pipeline.store().lock().unwrap();

        let (_, id_a) = identity_of(&format!("{}/game-a", base)).unwrap();
        let a = store.get_item_by_identity(&id_a).unwrap().unwrap();
        assert_eq!(a.enrich_state, EnrichState::Settled);
        assert_eq!(a.rating, Some(4.5));
        assert_eq!(a.rating_count, 20);

        let (_, id_b) = identity_of(&format!("{}/game-b", base)).unwrap();
        let b = store.get_item_by_identity(&id_b).unwrap().unwrap();
        assert_eq!(b.enrich_state, EnrichState::RatingsHidden);
        assert!(b.hidden_until.is_some());
        assert!(b.last_enriched_at.is_none());

        // C is untouched: still unvisited, immediately eligible next run.
        let (_, id_c) = identity_of(&format!("{}/game-c", base)).unwrap();
        let c = store.get_item_by_identity(&id_c).unwrap().unwrap();
        assert_eq!(c.enrich_state, EnrichState::Unvisited);
        assert!(c.last_enriched_at.is_none());
    }

    // The parent's score reflects only A.
    pipeline.run_stage(Stage::Rescore).await.unwrap();

    let store = pipeline.store().lock().unwrap();
    let ranked = store.ranked_parents(10).unwrap();
    assert_eq!(ranked.len(), 1);

    let score = &ranked[0].score;
    assert_eq!(score.item_count, 3);
    assert_eq!(score.rated_item_count, 1);
    assert_eq!(score.total_ratings, 20);
    assert_eq!(score.avg_rating, Some(4.5));
    // A is the only rated item system-wide, so the global average equals its
    // own average and the Bayesian blend stays at 4.5.
    assert_eq!(score.bayesian_score, Some(4.5));
}

#[tokio::test]
async fn test_hidden_item_not_reselected_within_cooldown() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(&server, "/game-a", rated_detail_page(4.0, 5)).await;
    mount_html(&server, "/game-b", hidden_detail_page()).await;
    mount_html(&server, "/game-c", rated_detail_page(3.0, 7)).await;

    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(test_config(&tmp), "test".to_string()).unwrap();
    seed_items(&pipeline, &base);

    let first = pipeline.run_stage(Stage::Enrich).await.unwrap();
    assert_eq!(first.processed, 3);

    // Everything settled or cooling down: a second pass finds nothing due.
    let second = pipeline.run_stage(Stage::Enrich).await.unwrap();
    assert_eq!(second.processed, 0);
}

#[tokio::test]
async fn test_discover_from_feed() {
    let server = MockServer::start().await;

    let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
    <title>New releases</title>
    <link>https://example.com/games</link>
    <description>latest</description>
    <item>
        <title>Cool Game</title>
        <link>https://testdev.itch.io/cool-game</link>
        <pubDate>Mon, 15 Jan 2024 12:00:00 GMT</pubDate>
    </item>
    <item>
        <title>Front Page Jam</title>
        <link>https://itch.io/jam/front-page</link>
    </item>
    <item>
        <title>Other Game</title>
        <link>https://otherdev.itch.io/other-game</link>
    </item>
</channel></rss>"#;

    Mock::given(method("GET"))
        .and(path("/releases.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(feed)
                .insert_header("content-type", "application/rss+xml"),
        )
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.discovery.feeds = vec![format!("{}/releases.xml", server.uri())];
    let pipeline = Pipeline::new(config, "test".to_string()).unwrap();

    let report = pipeline.run_stage(Stage::Discover).await.unwrap();
    // The jam entry has no derivable creator handle and is skipped.
    assert_eq!(report.succeeded, 2);

    let store = pipeline.store().lock().unwrap();
    assert_eq!(store.count_parents().unwrap(), 2);
    assert_eq!(store.count_items().unwrap(), 2);

    let testdev = store.get_parent_by_handle("testdev").unwrap().unwrap();
    assert_eq!(testdev.profile_url, "https://testdev.itch.io/");
    assert_eq!(testdev.crawl_state, CrawlState::NotStarted);

    let (_, identity) = identity_of("https://testdev.itch.io/cool-game").unwrap();
    let item = store.get_item_by_identity(&identity).unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("Cool Game"));
    assert!(item.publish_date.is_some());
}

#[tokio::test]
async fn test_full_pipeline_from_seed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        listing_page(&[("/game-a", "Game A"), ("/game-b", "Game B")], None),
    )
    .await;
    mount_html(&server, "/game-a", rated_detail_page(4.5, 20)).await;
    mount_html(&server, "/game-b", rated_detail_page(3.0, 100)).await;

    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.seeds = vec![SeedEntry {
        handle: "testdev".to_string(),
        profile_url: format!("{}/", base),
    }];
    let pipeline = Pipeline::new(config, "test".to_string()).unwrap();

    let reports = pipeline.run_all().await.unwrap();
    assert_eq!(reports.len(), 4);

    let stats = pipeline.stats(10).unwrap();
    assert_eq!(stats.parents, 1);
    assert_eq!(stats.parents_complete, 1);
    assert_eq!(stats.items, 2);
    assert_eq!(stats.items_settled, 2);
    assert_eq!(stats.ranking.len(), 1);

    // Count-weighted: (4.5·20 + 3.0·100)/120 = 3.25, not the 3.75 an
    // unweighted mean would give.
    let score = &stats.ranking[0].score;
    assert_eq!(score.total_ratings, 120);
    assert_eq!(score.avg_rating, Some(3.25));
}

#[tokio::test]
async fn test_cancelled_run_leaves_state_consistent() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        listing_page(&[("/game-a", "Game A")], None),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(test_config(&tmp), "test".to_string()).unwrap();

    {
        let mut store = pipeline.store().lock().unwrap();
        store
            .upsert_parent("testdev", &format!("{}/", server.uri()))
            .unwrap();
    }

    // Cancel before the stage starts: no work is picked up.
    pipeline.cancel();
    let report = pipeline.run_stage(Stage::Backfill).await.unwrap();
    assert_eq!(report.processed, 0);

    let store = pipeline.store().lock().unwrap();
    let parent = store.get_parent_by_handle("testdev").unwrap().unwrap();
    assert_ne!(parent.crawl_state, CrawlState::Complete);
    assert_eq!(store.count_items().unwrap(), 0);
}
