use std::sync::{Arc, Mutex};
use std::time::Duration;

use harvester_engine::{
    FailureKind, HarvestConfig, HarvestError, HarvestEvent, Harvester, InvalidInput, LinkSource,
    PaginationStyle, ParseError, ParsePolicy, ProgressSink, StopReason,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<HarvestEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: HarvestEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn listing(hrefs: &[&str]) -> String {
    let posts: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<article><h2 class="entry-title"><a href="{href}" rel="bookmark">{href}</a></h2></article>"#
            )
        })
        .collect();
    format!("<html><head><title>Listing</title></head><body>{posts}<p>end</p></body></html>")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn quick_config() -> HarvestConfig {
    HarvestConfig {
        request_delay: Duration::ZERO,
        ..HarvestConfig::default()
    }
}

async fn mount_paged(server: &MockServer, at: &str, paged: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .and(query_param("paged", paged))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn blog_pages_are_deduped_and_harvest_stops_after_empty_page() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    mount_page(&server, "/blog", html(listing(&["/blog/post-a", "/blog/post-b"]))).await;
    mount_page(
        &server,
        "/blog/page/2/",
        html(listing(&["/blog/post-b", "/blog/post-c"])),
    )
    .await;
    mount_page(&server, "/blog/page/3/", html(listing(&[]))).await;

    let base = format!("{}/blog", server.uri());
    let report = Harvester::new(quick_config())
        .unwrap()
        .harvest(&base)
        .await
        .unwrap();

    assert_eq!(
        report.links,
        vec![
            format!("{base}/post-a"),
            format!("{base}/post-b"),
            format!("{base}/post-c"),
        ]
    );
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(
        report.source,
        LinkSource::Pages(StopReason::NoNewLinks { page: 3 })
    );
}

#[tokio::test]
async fn server_error_on_first_page_aborts_harvest() {
    let server = MockServer::start().await;
    mount_page(&server, "/", ResponseTemplate::new(500)).await;

    let err = Harvester::new(quick_config())
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap_err();

    match err {
        HarvestError::Fetch { page, source, .. } => {
            assert_eq!(page, 1);
            assert_eq!(source.kind, FailureKind::HttpStatus(500));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_mid_pagination_discards_partial_results() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&["/a"]))).await;
    mount_page(&server, "/page/2/", ResponseTemplate::new(503)).await;

    let err = Harvester::new(quick_config())
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Fetch { page: 2, .. }));
}

#[tokio::test]
async fn malformed_input_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = Harvester::new(quick_config())
        .unwrap()
        .harvest("not-a-url")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarvestError::InvalidInput(InvalidInput::Malformed(_))
    ));
}

#[tokio::test]
async fn not_found_page_ends_pagination() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&["/a", "/b"]))).await;
    mount_page(&server, "/page/2/", ResponseTemplate::new(404)).await;

    let report = Harvester::new(quick_config())
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap();

    assert_eq!(report.links.len(), 2);
    assert_eq!(
        report.source,
        LinkSource::Pages(StopReason::PageNotFound { page: 2 })
    );
}

#[tokio::test]
async fn malformed_page_is_skipped_and_reported() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&["/a"]))).await;
    mount_page(
        &server,
        "/page/2/",
        ResponseTemplate::new(200).set_body_raw("{\"oops\": true}", "application/json"),
    )
    .await;
    mount_page(&server, "/page/3/", html(listing(&["/c"]))).await;
    mount_page(&server, "/page/4/", ResponseTemplate::new(404)).await;

    let mut config = quick_config();
    config.settings.max_empty_pages = 2;
    let sink = Arc::new(TestSink::default());
    let report = Harvester::new(config)
        .unwrap()
        .with_sink(sink.clone())
        .harvest(&server.uri())
        .await
        .unwrap();

    let base = server.uri();
    assert_eq!(report.links, vec![format!("{base}/a"), format!("{base}/c")]);
    assert_eq!(report.pages_fetched, 4);

    let skipped: Vec<u32> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            HarvestEvent::PageSkipped { page, .. } => Some(page),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![2]);
}

#[tokio::test]
async fn skipped_page_ends_pagination_like_an_empty_one() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&["/a"]))).await;
    mount_page(
        &server,
        "/page/2/",
        ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/3/"))
        .respond_with(html(listing(&["/c"])))
        .expect(0)
        .mount(&server)
        .await;

    let report = Harvester::new(quick_config())
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap();

    assert_eq!(report.links, vec![format!("{}/a", server.uri())]);
    assert_eq!(
        report.source,
        LinkSource::Pages(StopReason::NoNewLinks { page: 2 })
    );
}

#[tokio::test]
async fn bare_or_blank_page_past_the_end_stops_pagination() {
    for past_the_end in ["<html><body></body></html>", ""] {
        let server = MockServer::start().await;
        mount_page(&server, "/", html(listing(&["/a"]))).await;
        mount_page(&server, "/page/2/", html(past_the_end.to_string())).await;
        Mock::given(method("GET"))
            .and(path("/page/3/"))
            .respond_with(html(String::new()))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = quick_config();
        config.settings.max_pages = 50;
        let report = Harvester::new(config)
            .unwrap()
            .harvest(&server.uri())
            .await
            .unwrap();

        assert_eq!(report.links, vec![format!("{}/a", server.uri())]);
        assert_eq!(report.pages_fetched, 2, "page 2 body {past_the_end:?}");
        assert_eq!(
            report.source,
            LinkSource::Pages(StopReason::NoNewLinks { page: 2 })
        );
    }
}

#[tokio::test]
async fn path_then_query_retries_pages_with_paged_parameter() {
    let server = MockServer::start().await;
    mount_page(&server, "/blog", html(listing(&["/blog/a"]))).await;
    mount_page(&server, "/blog/page/2/", ResponseTemplate::new(404)).await;
    mount_paged(&server, "/blog/", "2", html(listing(&["/blog/b"]))).await;
    mount_page(&server, "/blog/page/3/", html(listing(&[]))).await;
    mount_paged(&server, "/blog/", "3", html(listing(&["/blog/a"]))).await;

    let mut config = quick_config();
    config.settings.pagination = PaginationStyle::PathThenQuery;
    let base = format!("{}/blog", server.uri());
    let report = Harvester::new(config)
        .unwrap()
        .harvest(&base)
        .await
        .unwrap();

    assert_eq!(
        report.links,
        vec![format!("{base}/a"), format!("{base}/b")]
    );
    assert_eq!(report.pages_fetched, 5);
    assert_eq!(
        report.source,
        LinkSource::Pages(StopReason::NoNewLinks { page: 3 })
    );
}

#[tokio::test]
async fn strict_parse_policy_aborts_on_malformed_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw("just words", "text/html"),
    )
    .await;

    let mut config = quick_config();
    config.settings.parse_policy = ParsePolicy::Abort;
    let err = Harvester::new(config)
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap_err();

    match err {
        HarvestError::Parse { page, source, .. } => {
            assert_eq!(page, 1);
            assert_eq!(source, ParseError::NotHtml);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_links_is_a_successful_harvest() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&[]))).await;

    let report = Harvester::new(quick_config())
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap();

    assert!(report.links.is_empty());
    assert_eq!(report.pages_fetched, 1);
}

#[tokio::test]
async fn tracking_parameters_and_fragments_do_not_create_duplicates() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html(listing(&["/post/?utm_source=rss", "/post#respond"])),
    )
    .await;
    mount_page(&server, "/page/2/", html(listing(&["/post/"]))).await;

    let report = Harvester::new(quick_config())
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap();

    assert_eq!(report.links, vec![format!("{}/post", server.uri())]);
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn progress_events_follow_each_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&["/a", "/b"]))).await;
    mount_page(&server, "/page/2/", html(listing(&[]))).await;

    let sink = Arc::new(TestSink::default());
    Harvester::new(quick_config())
        .unwrap()
        .with_sink(sink.clone())
        .harvest(&server.uri())
        .await
        .unwrap();

    let events = sink.take();
    assert_eq!(
        events,
        vec![
            HarvestEvent::PageRequested {
                page: 1,
                url: server.uri(),
            },
            HarvestEvent::PageHarvested {
                page: 1,
                candidates: 2,
                total_links: 2,
            },
            HarvestEvent::PageRequested {
                page: 2,
                url: format!("{}/page/2/", server.uri()),
            },
            HarvestEvent::PageHarvested {
                page: 2,
                candidates: 0,
                total_links: 2,
            },
            HarvestEvent::Finished {
                links: 2,
                pages_fetched: 2,
            },
        ]
    );
}

#[tokio::test]
async fn page_recovered_at_fallback_address_is_not_reported_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, "/blog", html(listing(&["/blog/a"]))).await;
    mount_page(
        &server,
        "/blog/page/2/",
        ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
    )
    .await;
    mount_paged(&server, "/blog/", "2", html(listing(&["/blog/b"]))).await;
    mount_page(&server, "/blog/page/3/", ResponseTemplate::new(404)).await;
    mount_paged(&server, "/blog/", "3", ResponseTemplate::new(404)).await;

    let mut config = quick_config();
    config.settings.pagination = PaginationStyle::PathThenQuery;
    let sink = Arc::new(TestSink::default());
    let base = format!("{}/blog", server.uri());
    let report = Harvester::new(config)
        .unwrap()
        .with_sink(sink.clone())
        .harvest(&base)
        .await
        .unwrap();

    assert_eq!(report.links, vec![format!("{base}/a"), format!("{base}/b")]);
    assert_eq!(
        report.source,
        LinkSource::Pages(StopReason::PageNotFound { page: 3 })
    );
    assert!(!sink
        .take()
        .iter()
        .any(|event| matches!(event, HarvestEvent::PageSkipped { .. })));
}

#[tokio::test]
async fn page_limit_comes_from_the_state_machine() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html(listing(&["/a"]))).await;
    mount_page(&server, "/page/2/", html(listing(&["/b"]))).await;
    Mock::given(method("GET"))
        .and(path("/page/3/"))
        .respond_with(html(listing(&["/c"])))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = quick_config();
    config.settings.max_pages = 2;
    let report = Harvester::new(config)
        .unwrap()
        .harvest(&server.uri())
        .await
        .unwrap();

    assert_eq!(report.links.len(), 2);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(
        report.source,
        LinkSource::Pages(StopReason::PageLimit { max_pages: 2 })
    );
}
