use crate::llm_adapter::DynLlmAdapter;
use crate::types::Item;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, warn};

const SUMMARIZE_INSTRUCTION: &str = "You write item summaries for a weekly cloud-native \
engineering digest. Write exactly two sentences: what happened, then why it matters to a \
platform engineer. Add a third line only when a release contains a breaking change worth \
flagging. Never exceed three lines. No promotional language. Respond with the summary \
text only.";

/// Fallback and keyword-mode summary length.
const EXCERPT_SUMMARY_MAX_CHARS: usize = 200;

/// Attach a summary to every item. With an adapter this is model-assisted and
/// batched like classification; without one (or on any per-item failure) a
/// truncated excerpt stands in. An item already carrying a sufficiently long
/// summary from classification is left alone — the classifier's summary is
/// treated as authoritative when it clears `reuse_min_chars`.
pub async fn summarize_all(
    items: Vec<Item>,
    adapter: Option<&DynLlmAdapter>,
    concurrency: usize,
    batch_delay: Duration,
    reuse_min_chars: usize,
) -> Vec<Item> {
    let total = items.len();

    let out = match adapter {
        None => items.into_iter().map(fallback_summary).collect(),
        Some(adapter) => {
            let chunks: Vec<Vec<Item>> = items
                .chunks(concurrency.max(1))
                .map(|c| c.to_vec())
                .collect();
            let last = chunks.len().saturating_sub(1);
            let mut out = Vec::with_capacity(total);

            for (index, chunk) in chunks.into_iter().enumerate() {
                let batch = join_all(chunk.into_iter().map(|item| async move {
                    summarize_one(item, adapter, reuse_min_chars).await
                }))
                .await;
                out.extend(batch);

                if index < last {
                    tokio::time::sleep(batch_delay).await;
                }
            }
            out
        }
    };

    info!("Summarized {} items", out.len());
    out
}

async fn summarize_one(item: Item, adapter: &DynLlmAdapter, reuse_min_chars: usize) -> Item {
    if let Some(existing) = &item.summary {
        if existing.chars().count() >= reuse_min_chars {
            debug!("Reusing classifier summary for '{}'", item.title);
            return item;
        }
    }

    let payload = format!(
        "Title: {}\nSource: {}\nCategory: {}\nLink: {}\nExcerpt: {}",
        item.title,
        item.source,
        item.category.as_deref().unwrap_or(""),
        item.url,
        item.excerpt
    );

    match adapter.complete(SUMMARIZE_INSTRUCTION, &payload).await {
        Ok(text) => {
            let summary = cap_lines(&text, 3);
            Item {
                summary: Some(summary),
                ..item
            }
        }
        Err(e) => {
            warn!(
                "Summarization failed for '{}', using excerpt fallback: {}",
                item.title, e
            );
            fallback_summary(item)
        }
    }
}

fn fallback_summary(item: Item) -> Item {
    if item.summary.is_some() {
        return item;
    }
    let summary = excerpt_summary(&item.excerpt);
    Item {
        summary: Some(summary),
        ..item
    }
}

/// Truncate the excerpt, preferring a sentence boundary when one exists in
/// range.
pub fn excerpt_summary(excerpt: &str) -> String {
    if excerpt.chars().count() <= EXCERPT_SUMMARY_MAX_CHARS {
        return excerpt.to_string();
    }

    let head: String = excerpt.chars().take(EXCERPT_SUMMARY_MAX_CHARS).collect();
    match head.rfind('.') {
        Some(end) if end > 0 => head[..=end].to_string(),
        _ => format!("{}...", head.trim_end()),
    }
}

fn cap_lines(text: &str, max: usize) -> String {
    text.trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(max)
        .collect::<Vec<_>>()
        .join("\n")
}
