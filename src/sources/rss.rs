use crate::fetcher::Fetcher;
use crate::normalize::strip_markup;
use crate::types::{DigestError, Item, Result, Source};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Collect one RSS/Atom source. Fetch or parse failures are absorbed here:
/// the source contributes an empty sequence and the batch continues. A
/// single bad source must never abort the run.
pub async fn collect(fetcher: &Fetcher, source: &Source) -> Vec<Item> {
    match collect_inner(fetcher, source).await {
        Ok(items) => {
            info!("Collected {} items from '{}'", items.len(), source.name);
            items
        }
        Err(e) => {
            warn!("Source '{}' failed, skipping: {}", source.name, e);
            Vec::new()
        }
    }
}

async fn collect_inner(fetcher: &Fetcher, source: &Source) -> Result<Vec<Item>> {
    let body = fetcher.fetch_text(&source.url).await?;
    parse_feed(&body, source)
}

/// Parse a feed body into items for this source.
///
/// Entries without a usable link are skipped silently (counted, not errors);
/// the excerpt takes the richest non-empty text field, full content first,
/// then the summary/description.
pub fn parse_feed(body: &str, source: &Source) -> Result<Vec<Item>> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| DigestError::Parse(format!("'{}': {}", source.name, e)))?;

    let mut items = Vec::new();
    let mut skipped = 0usize;

    for entry in feed.entries {
        let title = entry.title.as_ref().map(|t| t.content.clone());
        let link = entry.links.first().map(|l| l.href.clone());

        let (title, url) = match (title, link) {
            (Some(title), Some(url)) => (title, url),
            (None, Some(url)) => ("Untitled".to_string(), url),
            // No link means nothing to cite; a bare title is just as useless.
            _ => {
                skipped += 1;
                continue;
            }
        };

        let excerpt_raw = entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .filter(|body| !body.trim().is_empty())
            .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
            .unwrap_or_default();

        // Missing or unparsable dates substitute the current time rather
        // than failing the item.
        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let tags = entry.categories.into_iter().map(|c| c.term).collect();

        items.push(Item {
            title,
            url,
            excerpt: strip_markup(&excerpt_raw),
            source: source.name.clone(),
            published_at,
            category: Some(source.category.clone()),
            tags,
            summary: None,
            include: None,
            priority: Some(source.priority),
        });
    }

    if skipped > 0 {
        debug!("Skipped {} incomplete entries from '{}'", skipped, source.name);
    }
    Ok(items)
}
