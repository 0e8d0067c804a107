use crate::types::Item;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Query parameters that vary per-syndication without changing the story.
const TRACKING_PARAMS: [&str; 4] = ["utm_source", "utm_medium", "utm_campaign", "ref"];

/// Two-phase deduplication, pure and order-stable per winning item.
///
/// Phase one collapses by canonical URL (first occurrence wins): the same
/// story is frequently syndicated with tracking parameters or trailing-slash
/// variants. Phase two collapses by normalized title, keeping the more
/// recently published copy: republished stories often get a fresh URL but the
/// same headline. URL-only dedup under-collapses and title-only over-collapses,
/// so both run in sequence, URL first.
pub fn dedupe(items: Vec<Item>) -> Vec<Item> {
    let before = items.len();
    let by_url = dedupe_by_url(items);
    let out = dedupe_by_title(by_url);
    if out.len() < before {
        debug!("Dedupe removed {} of {} items", before - out.len(), before);
    }
    out
}

fn dedupe_by_url(items: Vec<Item>) -> Vec<Item> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        let key = canonical_url(&item.url);
        if seen.insert(key, ()).is_none() {
            kept.push(item);
        } else {
            debug!("Duplicate URL dropped: {}", item.url);
        }
    }
    kept
}

fn dedupe_by_title(items: Vec<Item>) -> Vec<Item> {
    let mut slot_by_title: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Item> = Vec::with_capacity(items.len());

    for item in items {
        let key = normalized_title(&item.title);
        match slot_by_title.get(&key) {
            Some(&slot) => {
                // Same headline at a different URL: keep the fresher copy in
                // the slot the first occurrence claimed.
                if item.published_at > kept[slot].published_at {
                    debug!("Duplicate title, newer copy wins: {}", item.title);
                    kept[slot] = item;
                } else {
                    debug!("Duplicate title dropped: {}", item.title);
                }
            }
            None => {
                slot_by_title.insert(key, kept.len());
                kept.push(item);
            }
        }
    }
    kept
}

/// Canonical form used as the dedupe key: tracking parameters stripped,
/// trailing slash dropped, lowercased.
pub fn canonical_url(raw: &str) -> String {
    let canonical = match Url::parse(raw.trim()) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }
            url.to_string()
        }
        Err(_) => raw.trim().to_string(),
    };

    canonical
        .strip_suffix('/')
        .unwrap_or(&canonical)
        .to_lowercase()
}

/// Titles lowercased, punctuation stripped, whitespace collapsed.
pub fn normalized_title(title: &str) -> String {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn item(title: &str, url: &str, age_hours: i64) -> Item {
        Item {
            title: title.to_string(),
            url: url.to_string(),
            excerpt: String::new(),
            source: "test".to_string(),
            published_at: Utc::now() - Duration::hours(age_hours),
            category: None,
            tags: Vec::new(),
            summary: None,
            include: None,
            priority: None,
        }
    }

    #[test]
    fn tracking_params_and_trailing_slash_collapse() {
        assert_eq!(
            canonical_url("https://x.com/a?utm_source=foo"),
            canonical_url("https://x.com/a")
        );
        assert_eq!(
            canonical_url("https://x.com/a/"),
            canonical_url("https://X.com/a")
        );
    }

    #[test]
    fn real_query_params_survive_canonicalization() {
        assert_ne!(
            canonical_url("https://x.com/a?id=1"),
            canonical_url("https://x.com/a?id=2")
        );
    }

    #[test]
    fn url_dedupe_keeps_first_occurrence() {
        let out = dedupe(vec![
            item("one", "https://x.com/a?utm_source=foo", 1),
            item("two", "https://x.com/a", 2),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "one");
    }

    #[test]
    fn title_dedupe_keeps_the_newer_copy() {
        let out = dedupe(vec![
            item("Same Headline!", "https://a.com/1", 24),
            item("same headline", "https://b.com/2", 1),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://b.com/2");
    }

    #[test]
    fn output_urls_and_titles_are_unique() {
        let out = dedupe(vec![
            item("alpha", "https://x.com/a", 1),
            item("alpha", "https://y.com/b", 2),
            item("beta", "https://x.com/a/", 3),
            item("gamma", "https://z.com/c", 4),
        ]);

        let mut urls: Vec<_> = out.iter().map(|i| canonical_url(&i.url)).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), out.len());

        let mut titles: Vec<_> = out.iter().map(|i| normalized_title(&i.title)).collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), out.len());
    }
}
