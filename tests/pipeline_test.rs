use chrono::{Datelike, Duration, Utc};
use tracing::info;
use weekly_digest::pipeline;
use weekly_digest::types::{DigestError, Priority, Source, SourceKind};
use weekly_digest::{FetchConfig, Fetcher, RunConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss_source(name: &str, url: String) -> Source {
    Source {
        name: name.to_string(),
        kind: SourceKind::Rss,
        url,
        category: "Kubernetes Core".to_string(),
        priority: Priority::default(),
    }
}

fn test_config() -> RunConfig {
    RunConfig {
        batch_delay_ms: 0,
        fetch: FetchConfig {
            max_retries: 2,
            initial_backoff_seconds: 0,
            ..FetchConfig::default()
        },
        ..RunConfig::default()
    }
}

fn feed_with(entries: &[(&str, &str, chrono::DateTime<Utc>)]) -> String {
    let items: String = entries
        .iter()
        .map(|(title, link, published)| {
            format!(
                "<item><title>{}</title><link>{}</link>\
                 <description>Body text for the entry.</description>\
                 <pubDate>{}</pubDate></item>",
                title,
                link,
                published.to_rfc2822()
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>\
         <title>Test Feed</title><link>https://example.com</link>{}\
         </channel></rss>",
        items
    )
}

#[tokio::test]
async fn keyword_mode_run_produces_a_validated_digest() {
    let _ = tracing_subscriber::fmt().try_init();

    let server = MockServer::start().await;
    let feed = feed_with(&[
        (
            "Kubernetes 1.32 released",
            "https://example.com/k8s-132",
            Utc::now() - Duration::days(1),
        ),
        (
            "Old story from last month",
            "https://example.com/old",
            Utc::now() - Duration::days(30),
        ),
        (
            "KubeCon Is Coming! Register today",
            "https://example.com/kubecon",
            Utc::now() - Duration::days(2),
        ),
    ]);
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;

    let sources = vec![rss_source("test", format!("{}/feed.xml", server.uri()))];
    let digest = pipeline::run(&test_config(), &sources, None)
        .await
        .expect("pipeline run must succeed")
        .expect("recent items must produce a digest");

    info!("Produced {} with {} items", digest.relative_path, digest.item_count);

    assert_eq!(digest.item_count, 1);
    assert!(digest.markdown.contains("Kubernetes 1.32 released"));
    assert!(!digest.markdown.contains("Old story from last month"));
    assert!(!digest.markdown.contains("KubeCon Is Coming!"));

    let week = Utc::now().iso_week();
    assert_eq!(
        digest.relative_path,
        format!("{}/week-{:02}.md", week.year(), week.week())
    );
}

#[tokio::test]
async fn a_relative_entry_link_drops_the_item_not_the_run() {
    let server = MockServer::start().await;
    let feed = feed_with(&[
        (
            "Kubernetes scheduler deep dive",
            "https://example.com/scheduler",
            Utc::now() - Duration::days(1),
        ),
        (
            "Broken syndication entry",
            "/blog/relative-post",
            Utc::now() - Duration::days(1),
        ),
    ]);
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;

    let sources = vec![rss_source("test", format!("{}/feed.xml", server.uri()))];
    let digest = pipeline::run(&test_config(), &sources, None)
        .await
        .expect("a malformed entry must not abort the run")
        .expect("the well-formed item still yields a digest");

    assert_eq!(digest.item_count, 1);
    assert!(digest.markdown.contains("Kubernetes scheduler deep dive"));
    assert!(!digest.markdown.contains("/blog/relative-post"));
}

#[tokio::test]
async fn stale_feeds_produce_no_digest() {
    let server = MockServer::start().await;
    let feed = feed_with(&[
        (
            "Ancient story one",
            "https://example.com/one",
            Utc::now() - Duration::days(20),
        ),
        (
            "Ancient story two",
            "https://example.com/two",
            Utc::now() - Duration::days(45),
        ),
    ]);
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;

    let sources = vec![rss_source("stale", format!("{}/feed.xml", server.uri()))];
    let result = pipeline::run(&test_config(), &sources, None)
        .await
        .expect("an empty week is a successful run");

    assert!(result.is_none(), "nothing inside the window must yield no file");
}

#[tokio::test]
async fn an_unreachable_source_does_not_abort_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_with(&[(
            "kubectl tips and tricks",
            "https://example.com/kubectl",
            Utc::now() - Duration::days(1),
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sources = vec![
        rss_source("good", format!("{}/good.xml", server.uri())),
        rss_source("broken", format!("{}/broken.xml", server.uri())),
    ];
    let digest = pipeline::run(&test_config(), &sources, None)
        .await
        .expect("a failing source must be absorbed")
        .expect("the healthy source still yields a digest");

    assert_eq!(digest.item_count, 1);
    assert!(digest.markdown.contains("kubectl tips and tricks"));
}

#[tokio::test]
async fn web_sources_discover_an_advertised_feed() {
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><head><link rel="alternate" type="application/rss+xml" href="{}/index.xml"></head><body></body></html>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_with(&[(
            "etcd performance notes",
            "https://example.com/etcd",
            Utc::now() - Duration::days(1),
        )])))
        .mount(&server)
        .await;

    let sources = vec![Source {
        name: "blog".to_string(),
        kind: SourceKind::Web,
        url: format!("{}/blog", server.uri()),
        category: "Cloud Native Ecosystem".to_string(),
        priority: Priority::default(),
    }];
    let digest = pipeline::run(&test_config(), &sources, None)
        .await
        .expect("pipeline run must succeed")
        .expect("the discovered feed yields a digest");

    assert!(digest.markdown.contains("etcd performance notes"));
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("eventually fine"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(FetchConfig {
        max_retries: 3,
        initial_backoff_seconds: 0,
        ..FetchConfig::default()
    });
    let body = fetcher
        .fetch_text(&format!("{}/flaky", server.uri()))
        .await
        .expect("two failures fit inside a three-retry budget");

    assert_eq!(body, "eventually fine");
}

#[tokio::test]
async fn persistent_server_errors_exhaust_the_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(FetchConfig {
        max_retries: 2,
        initial_backoff_seconds: 0,
        ..FetchConfig::default()
    });
    let err = fetcher
        .fetch_text(&format!("{}/down", server.uri()))
        .await
        .expect_err("a persistently failing URL must error out");

    match err {
        DigestError::Fetch { attempts, reason, .. } => {
            assert_eq!(attempts, 3);
            assert!(reason.contains("500"));
        }
        other => panic!("expected a fetch error, got {:?}", other),
    }
}
