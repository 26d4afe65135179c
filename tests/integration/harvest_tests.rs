//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the catalog's web interface, and
//! recorded fixtures for runs that need precise control over what each
//! identifier returns.

use catalog_harvest::config::{CatalogConfig, Config, HarvestConfig, IdentityConfig, OutputConfig};
use catalog_harvest::harvester::{
    CatalogExtractor, Coordinator, FetchResult, Fetcher, FixtureFetcher, HttpFetcher,
};
use catalog_harvest::state::HarvestPhase;
use catalog_harvest::storage::{read_records, JsonFileStore, Record};
use catalog_harvest::HarvestError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETAIL_PATH: &str = "/cgi-bin/koha/opac-detail.pl";

/// Creates a test configuration for the given catalog base URL
fn create_test_config(base_url: &str, dir: &TempDir, id_max: u64, target: u64) -> Config {
    Config {
        catalog: CatalogConfig {
            url_template: format!("{}{}?biblionumber={{id}}", base_url, DETAIL_PATH),
            not_found_marker: "Erro 404".to_string(),
            id_min: 1,
            id_max,
        },
        harvest: HarvestConfig {
            target,
            sample_size: Some(id_max),
            request_timeout_secs: 1,
            checkpoint_interval: 10,
            min_delay_ms: 0, // No pacing in tests
            max_delay_ms: 0,
        },
        identity: IdentityConfig {
            user_agent: "Mozilla/5.0 (TestBrowser)".to_string(),
            accept_language: "pt-PT,pt;q=0.9".to_string(),
            referer: None,
        },
        output: OutputConfig {
            output_path: dir.path().join("records.json").display().to_string(),
            checkpoint_path: None,
        },
    }
}

fn detail_page(title: &str, author: &str) -> String {
    format!(
        r#"<html><body>
            <h1>{}</h1>
            <span class="results_summary author">
                <span class="label">Autor: </span><a href="/au">{}</a>
            </span>
            <span class="results_summary language">
                <span class="label">Idioma: </span><span>Português</span>
            </span>
            <table><tr typeof="Offer">
                <td class="itype">Livro</td>
                <td><span class="shelvingloc">Sala 1</span></td>
                <td class="call_no">869 ABC</td>
            </tr></table>
        </body></html>"#,
        title, author
    )
}

fn fixture_coordinator<F: Fetcher>(
    config: Config,
    fetcher: F,
) -> Coordinator<F, CatalogExtractor, JsonFileStore> {
    let checkpoint = JsonFileStore::new(config.output.checkpoint_path());
    Coordinator::new(config, fetcher, CatalogExtractor::default(), checkpoint)
}

fn ids_of(records: &[Record]) -> HashSet<u64> {
    records.iter().map(|r| r.id).collect()
}

/// Every record is unique by id, inside the range, and has a title
fn assert_valid_records(records: &[Record], id_min: u64, id_max: u64) {
    assert_eq!(ids_of(records).len(), records.len(), "duplicate ids");
    for record in records {
        assert!(record.id >= id_min && record.id <= id_max);
        assert!(!record.title.trim().is_empty());
    }
}

/// Wraps a fetcher and cancels the run once `limit` fetches have completed
struct CancellingFetcher {
    inner: FixtureFetcher,
    cancel: CancellationToken,
    limit: usize,
    fetched: AtomicUsize,
}

impl Fetcher for CancellingFetcher {
    async fn fetch(&self, id: u64) -> FetchResult {
        let result = self.inner.fetch(id).await;
        if self.fetched.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
            self.cancel.cancel();
        }
        result
    }
}

// ===== HTTP fetcher =====

#[tokio::test]
async fn test_http_fetcher_found() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, 10, 1);

    let body = detail_page("Os Maias", "Queirós, Eça de");
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("biblionumber", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    assert_eq!(fetcher.fetch(7).await, FetchResult::Found(body));
}

#[tokio::test]
async fn test_http_fetcher_sends_identity_headers() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, 10, 1);

    Mock::given(method("GET"))
        .and(header("user-agent", "Mozilla/5.0 (TestBrowser)"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Ok</h1>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    assert!(matches!(fetcher.fetch(1).await, FetchResult::Found(_)));
    assert!(matches!(fetcher.fetch(2).await, FetchResult::Found(_)));
}

#[tokio::test]
async fn test_http_fetcher_error_status_is_not_found() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, 10, 1);

    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    assert_eq!(
        fetcher.fetch(3).await,
        FetchResult::NotFound { status: 500 }
    );
}

#[tokio::test]
async fn test_http_fetcher_not_found_marker_on_success_status() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, 10, 1);

    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Erro 404</h1></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    assert_eq!(
        fetcher.fetch(3).await,
        FetchResult::NotFound { status: 200 }
    );
}

#[tokio::test]
async fn test_http_fetcher_timeout() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, 10, 1);

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<h1>Too late</h1>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    assert_eq!(fetcher.fetch(1).await, FetchResult::TimedOut);
}

#[tokio::test]
async fn test_http_fetcher_connection_refused() {
    // Reserve a port, then free it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("http://127.0.0.1:{}", port), &dir, 10, 1);

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    assert!(matches!(
        fetcher.fetch(1).await,
        FetchResult::TransportError(_)
    ));
}

// ===== Full harvest =====

#[tokio::test]
async fn test_full_harvest_against_mock_catalog() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, 10, 3);
    let output = PathBuf::from(&config.output.output_path);
    let checkpoint = config.output.checkpoint_path();

    for (id, title) in [(2, "Mensagem"), (5, "Os Lusíadas"), (9, "Ensaio sobre a Cegueira")] {
        Mock::given(method("GET"))
            .and(path(DETAIL_PATH))
            .and(query_param("biblionumber", id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(title, "Autor")))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    // Everything else is the catalog's not-found page
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Erro 404</h1>"))
        .mount(&mock_server)
        .await;

    let mut coordinator = Coordinator::from_config(config, false).unwrap();
    let summary = coordinator.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcome, HarvestPhase::TargetReached);
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.counts.collected, 3);
    assert_eq!(summary.counts.not_found, summary.attempts - 3);

    let records = read_records(&output).unwrap();
    assert_eq!(ids_of(&records), HashSet::from([2, 5, 9]));
    assert_valid_records(&records, 1, 10);

    let lusiadas = records.iter().find(|r| r.id == 5).unwrap();
    assert_eq!(lusiadas.title, "Os Lusíadas");
    assert_eq!(lusiadas.language.as_deref(), Some("Português"));
    assert_eq!(lusiadas.call_number.as_deref(), Some("869 ABC"));

    // The final checkpoint holds the same records as the output
    assert_eq!(read_records(&checkpoint).unwrap(), records);
}

#[tokio::test]
async fn test_target_above_available_records_exhausts() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("http://127.0.0.1", &dir, 10, 5);
    let output = PathBuf::from(&config.output.output_path);

    let fetcher = FixtureFetcher::new().with_pages([
        (2, detail_page("A", "X")),
        (5, detail_page("B", "Y")),
        (9, detail_page("C", "Z")),
    ]);
    let mut coordinator = fixture_coordinator(config, fetcher);
    let summary = coordinator.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcome, HarvestPhase::Exhausted);
    assert_eq!(summary.attempts, 10);
    assert_eq!(summary.candidates_left, 0);

    let records = read_records(&output).unwrap();
    assert_eq!(ids_of(&records), HashSet::from([2, 5, 9]));
}

#[tokio::test]
async fn test_missing_fields_do_not_reject_record() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("http://127.0.0.1", &dir, 3, 3);
    let output = PathBuf::from(&config.output.output_path);

    let fetcher = FixtureFetcher::new().with_pages([
        (1, detail_page("Completo", "Alguém")),
        (2, "<html><body><h1>Só título</h1></body></html>".to_string()),
        (3, "<html><body><p>Sem título</p></body></html>".to_string()),
    ]);
    let mut coordinator = fixture_coordinator(config, fetcher);
    let summary = coordinator.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.counts.collected, 2);
    assert_eq!(summary.counts.rejected, 1);

    let records = read_records(&output).unwrap();
    let bare = records.iter().find(|r| r.id == 2).unwrap();
    assert_eq!(bare.title, "Só título");
    assert_eq!(bare.author, None);
    assert_eq!(bare.language, None);
    assert!(bare.subjects.is_empty());
    assert_eq!(bare.call_number, None);

    let full = records.iter().find(|r| r.id == 1).unwrap();
    assert_eq!(full.author.as_deref(), Some("Alguém"));
}

#[tokio::test]
async fn test_invalid_sample_size_aborts_without_fetching() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config("http://127.0.0.1", &dir, 10, 3);
    config.harvest.sample_size = Some(11);
    let output = PathBuf::from(&config.output.output_path);
    let checkpoint = config.output.checkpoint_path();

    let mut coordinator = fixture_coordinator(config, FixtureFetcher::new());
    let result = coordinator.run(&CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(HarvestError::InvalidSampleSize { requested: 11, .. })
    ));
    assert!(!output.exists());
    assert!(!checkpoint.exists());
}

// ===== Interruption and resume =====

#[tokio::test]
async fn test_interrupt_writes_everything_collected() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("http://127.0.0.1", &dir, 20, 20);
    let output = PathBuf::from(&config.output.output_path);

    let cancel = CancellationToken::new();
    let fetcher = CancellingFetcher {
        inner: FixtureFetcher::new()
            .with_pages((1..=20).map(|id| (id, detail_page(&format!("Livro {}", id), "A")))),
        cancel: cancel.clone(),
        limit: 4,
        fetched: AtomicUsize::new(0),
    };

    let mut coordinator = fixture_coordinator(config, fetcher);
    let summary = coordinator.run(&cancel).await.unwrap();

    assert_eq!(summary.outcome, HarvestPhase::Interrupted);
    assert_eq!(summary.attempts, 4);
    assert_eq!(summary.total_records, 4);

    let records = read_records(&output).unwrap();
    assert_eq!(records, coordinator.state().accumulated());
    assert_valid_records(&records, 1, 20);
}

#[tokio::test]
async fn test_resume_after_interrupt_never_refetches() {
    let dir = TempDir::new().unwrap();
    let pages: Vec<(u64, String)> = (1..=12)
        .map(|id| (id, detail_page(&format!("Livro {}", id), "A")))
        .collect();

    // First run: interrupted after 5 records
    let cancel = CancellationToken::new();
    let fetcher = CancellingFetcher {
        inner: FixtureFetcher::new().with_pages(pages.clone()),
        cancel: cancel.clone(),
        limit: 5,
        fetched: AtomicUsize::new(0),
    };
    let config = create_test_config("http://127.0.0.1", &dir, 12, 8);
    let mut first = fixture_coordinator(config, fetcher);
    let first_summary = first.run(&cancel).await.unwrap();
    assert_eq!(first_summary.outcome, HarvestPhase::Interrupted);
    let first_ids = ids_of(first.state().accumulated());
    assert_eq!(first_ids.len(), 5);

    // Second run: same checkpoint, no interruption
    let config = create_test_config("http://127.0.0.1", &dir, 12, 8);
    let output = PathBuf::from(&config.output.output_path);
    let mut second = fixture_coordinator(config, FixtureFetcher::new().with_pages(pages));
    let summary = second.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcome, HarvestPhase::TargetReached);
    assert_eq!(summary.loaded, 5);
    assert_eq!(summary.total_records, 8);

    let requested = second.fetcher().requested();
    assert_eq!(requested.len(), 3);
    assert!(requested.iter().all(|id| !first_ids.contains(id)));

    let records = read_records(&output).unwrap();
    assert_valid_records(&records, 1, 12);
    assert!(first_ids.is_subset(&ids_of(&records)));
}

#[tokio::test]
async fn test_fresh_start_discards_checkpoint() {
    let dir = TempDir::new().unwrap();
    let pages: Vec<(u64, String)> = (1..=4)
        .map(|id| (id, detail_page(&format!("Livro {}", id), "A")))
        .collect();

    let mut first = fixture_coordinator(
        create_test_config("http://127.0.0.1", &dir, 4, 4),
        FixtureFetcher::new().with_pages(pages.clone()),
    );
    first.run(&CancellationToken::new()).await.unwrap();

    let config = create_test_config("http://127.0.0.1", &dir, 4, 4);
    let mut second =
        fixture_coordinator(config, FixtureFetcher::new().with_pages(pages)).with_fresh_start(true);
    let summary = second.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.loaded, 0);
    assert_eq!(second.fetcher().requested().len(), 4);
    assert_eq!(summary.total_records, 4);
}

#[tokio::test]
async fn test_blank_title_in_checkpoint_file_is_refetched() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("http://127.0.0.1", &dir, 3, 3);
    let output = PathBuf::from(&config.output.output_path);
    std::fs::write(config.output.checkpoint_path(), r#"[{"id": 2, "title": ""}]"#).unwrap();

    let fetcher = FixtureFetcher::new().with_pages([(2, detail_page("Real", "A"))]);
    let mut coordinator = fixture_coordinator(config, fetcher);
    let summary = coordinator.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.loaded, 0);
    assert!(coordinator.fetcher().requested().contains(&2));

    let records = read_records(&output).unwrap();
    assert_valid_records(&records, 1, 3);
    let titles: Vec<(u64, &str)> = records.iter().map(|r| (r.id, r.title.as_str())).collect();
    assert_eq!(titles, vec![(2, "Real")]);
}
