//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the provider API and run the
//! full crawl cycle end-to-end against a temporary data directory.

use follownet::config::Config;
use follownet::crawler::{build_fetcher, Coordinator, CrawlSettings, EdgeFetcher};
use follownet::output::{compute_statistics, export_users_db, USERS_DB_FILE};
use follownet::storage::{begin_run, open_run, JsonlRunStore, RunStatus, RunStore};
use follownet::{EdgeDirection, NodeId};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, data_path: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.bearer_token = Some("test-token".to_string());
    config.crawler.seed_user_id = Some("1".to_string());
    config.crawler.max_depth = 2;
    config.crawler.workers = 2;
    config.retry.backoff_base_ms = 1;
    config.output.data_path = data_path.to_path_buf();
    config
}

fn node(id: &str) -> NodeId {
    NodeId::parse(id).unwrap()
}

fn open_fetcher(config: &Config, run_id: &str) -> (Arc<JsonlRunStore>, Arc<EdgeFetcher>) {
    let store = Arc::new(open_run(&config.output.data_path, run_id));
    let fetcher = Arc::new(build_fetcher(config, store.clone()).unwrap());
    (store, fetcher)
}

async fn mount_edges(server: &MockServer, user: &str, edge: &str, neighbors: &[&str]) {
    let data: Vec<_> = neighbors
        .iter()
        .map(|id| json!({"id": id, "username": format!("user{}", id)}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/{}", user, edge)))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": data,
            "meta": {"result_count": neighbors.len()}
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Seed 1 follows 11, 12 and 13; each of those follows three more users
async fn mount_tree(server: &MockServer) {
    mount_edges(server, "1", "following", &["11", "12", "13"]).await;
    mount_edges(server, "11", "following", &["111", "112", "113"]).await;
    mount_edges(server, "12", "following", &["121", "122", "123"]).await;
    mount_edges(server, "13", "following", &["131", "132", "133"]).await;
}

#[tokio::test]
async fn test_full_crawl_then_resume_without_requests() {
    let mock_server = MockServer::start().await;
    mount_tree(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    // First pass fetches every node above the depth ceiling
    let (store, fetcher) = open_fetcher(&config, "1_test");
    let mut coordinator =
        Coordinator::new(fetcher.clone(), CrawlSettings::from_config(&config, true));
    let summary = coordinator.crawl_from(node("1")).await;

    assert_eq!(summary.crawled_count, 12);
    assert_eq!(summary.fetched, 4);
    assert_eq!(fetcher.requests_made(), 4);
    assert_eq!(store.list().unwrap().len(), 4);
    assert!(store
        .run_dir()
        .join("users")
        .join("12_following.jsonl")
        .is_file());

    // A new process on the same run answers everything from disk
    let (_store, fetcher) = open_fetcher(&config, "1_test");
    let mut coordinator =
        Coordinator::new(fetcher.clone(), CrawlSettings::from_config(&config, true));
    let summary = coordinator.crawl_from(node("1")).await;

    assert_eq!(summary.crawled_count, 12);
    assert_eq!(summary.cached, 4);
    assert_eq!(summary.fetched, 0);
    assert_eq!(fetcher.requests_made(), 0);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_where_it_stopped() {
    let mock_server = MockServer::start().await;
    mount_tree(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let seed = config.seed_user_id().unwrap();

    // Interrupt right after the seed has been expanded
    let (store, fetcher) = open_fetcher(&config, "run");
    let mut manifest = begin_run(&store, &seed, EdgeDirection::Following, 2, "hash").unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut coordinator = Coordinator::new(fetcher, CrawlSettings::from_config(&config, true))
        .with_cancellation(cancel)
        .with_progress(move |report| {
            if report.depth == 0 {
                trigger.cancel();
            }
        });
    let summary = coordinator.crawl_from(seed.clone()).await;
    assert!(summary.cancelled);
    manifest.finish(RunStatus::Interrupted);
    store.save_manifest(&manifest).unwrap();

    // Resume: the seed comes from disk, the rest is fetched once
    let (store, fetcher) = open_fetcher(&config, "run");
    let manifest = begin_run(&store, &seed, EdgeDirection::Following, 2, "hash").unwrap();
    assert_eq!(manifest.status, RunStatus::Running);

    let mut coordinator =
        Coordinator::new(fetcher.clone(), CrawlSettings::from_config(&config, true));
    let summary = coordinator.crawl_from(seed).await;

    assert!(!summary.cancelled);
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.crawled_count, 12);
    assert_eq!(fetcher.requests_made(), 3);
}

#[tokio::test]
async fn test_fresh_crawl_refetches_stored_records() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1/following"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "2"}],
            "meta": {"result_count": 1}
        })))
        .expect(2)
        .mount(&mock_server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.max_depth = 1;

    for resume in [true, false] {
        let (_store, fetcher) = open_fetcher(&config, "run");
        let mut coordinator =
            Coordinator::new(fetcher.clone(), CrawlSettings::from_config(&config, resume));
        let summary = coordinator.crawl_from(node("1")).await;
        assert_eq!(summary.fetched, 1);
        assert_eq!(fetcher.requests_made(), 1);
    }
}

#[tokio::test]
async fn test_followers_crawl_with_unretrievable_user() {
    let mock_server = MockServer::start().await;
    mount_edges(&mock_server, "1", "followers", &["21", "22"]).await;
    mount_edges(&mock_server, "21", "followers", &["31"]).await;
    Mock::given(method("GET"))
        .and(path("/users/22/followers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"title": "Not Found Error", "detail": "Could not find user"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.edge = EdgeDirection::Followers;

    let (store, fetcher) = open_fetcher(&config, "run");
    let mut coordinator =
        Coordinator::new(fetcher.clone(), CrawlSettings::from_config(&config, true));
    let summary = coordinator.crawl_from(node("1")).await;

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.crawled_count, 3);
    assert!(store
        .read(&node("22"), EdgeDirection::Followers)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_stats_and_export_after_crawl() {
    let mock_server = MockServer::start().await;
    mount_tree(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    let (store, fetcher) = open_fetcher(&config, "run");
    let mut coordinator = Coordinator::new(fetcher, CrawlSettings::from_config(&config, true));
    coordinator.crawl_from(node("1")).await;

    let stats = compute_statistics(store.as_ref()).unwrap();
    assert_eq!(stats.edge_sets, 4);
    assert_eq!(stats.total_edges, 12);
    assert_eq!(stats.unique_users, 12);

    let db_path = store.run_dir().join(USERS_DB_FILE);
    let export = export_users_db(store.as_ref(), &db_path).unwrap();
    assert_eq!(export.users, 12);
    assert_eq!(export.edges, 12);
}
