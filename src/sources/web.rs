use crate::fetcher::Fetcher;
use crate::sources::rss;
use crate::types::{Item, Source};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Conventional feed locations probed when the page itself advertises
/// nothing.
const CONVENTIONAL_PATHS: [&str; 5] = ["/feed", "/rss", "/feed.xml", "/rss.xml", "/blog/feed"];

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Collect a `web` source: discover a feed URL on the page, then hand the
/// source to the RSS collector with the feed URL substituted. Not finding a
/// feed is an expected outcome, not an error.
pub async fn collect(fetcher: &Fetcher, source: &Source) -> Vec<Item> {
    let feed_url = match discover_feed(fetcher, source).await {
        Some(url) => url,
        None => {
            info!("No feed discovered for '{}', skipping", source.name);
            return Vec::new();
        }
    };

    debug!("Discovered feed for '{}': {}", source.name, feed_url);
    let feed_source = Source {
        url: feed_url,
        ..source.clone()
    };
    rss::collect(fetcher, &feed_source).await
}

async fn discover_feed(fetcher: &Fetcher, source: &Source) -> Option<String> {
    let base = match Url::parse(&source.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Source '{}' has an invalid URL: {}", source.name, e);
            return None;
        }
    };

    let html = match fetcher.fetch_text(&source.url).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Page fetch failed for '{}': {}", source.name, e);
            return None;
        }
    };

    // Advertised feeds win outright; only the conventional-path guesses need
    // probing.
    if let Some(advertised) = advertised_feed(&html, &base) {
        return Some(advertised);
    }

    probe_conventional_paths(&base).await
}

/// Scan the page for an advertised feed: `<link rel="alternate">` tags with
/// an RSS/Atom type first, then anchors whose href smells like a feed. The
/// first candidate that resolves to an absolute URL wins.
fn advertised_feed(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    let link_selector = Selector::parse(r#"link[rel="alternate"]"#).expect("valid selector");
    for element in document.select(&link_selector) {
        let kind = element.value().attr("type").unwrap_or_default();
        if kind != "application/rss+xml" && kind != "application/atom+xml" {
            continue;
        }
        if let Some(href) = element.value().attr("href") {
            if let Ok(resolved) = base.join(href) {
                return Some(resolved.to_string());
            }
        }
    }

    let anchor_selector = Selector::parse("a[href]").expect("valid selector");
    for element in document.select(&anchor_selector) {
        let href = element.value().attr("href").unwrap_or_default();
        let lowered = href.to_lowercase();
        if !lowered.contains("rss") && !lowered.contains("feed") {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            return Some(resolved.to_string());
        }
    }

    None
}

/// Probe conventional paths with a short timeout, accepting a response only
/// when the body actually looks like a feed.
async fn probe_conventional_paths(base: &Url) -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client");

    for path in CONVENTIONAL_PATHS {
        let candidate = match base.join(path) {
            Ok(url) => url,
            Err(_) => continue,
        };

        let response = match client.get(candidate.clone()).send().await {
            Ok(response) if response.status().is_success() => response,
            _ => continue,
        };

        match response.text().await {
            Ok(body) if looks_like_feed(&body) => {
                return Some(candidate.to_string());
            }
            _ => {
                debug!("Probe at {} did not return a feed", candidate);
            }
        }
    }

    None
}

/// Cheap feed sniff used on probe responses.
pub fn looks_like_feed(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("<rss") || lowered.contains("<feed")
}
