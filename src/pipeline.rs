use crate::classify;
use crate::config::RunConfig;
use crate::dedupe::dedupe;
use crate::digest::{assemble, relative_path, render, validate};
use crate::fetcher::Fetcher;
use crate::llm_adapter::DynLlmAdapter;
use crate::normalize::normalize;
use crate::select::{filter_window, limit};
use crate::sources::collect_all;
use crate::summarize::summarize_all;
use crate::types::{Result, Source};
use chrono::Utc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// A rendered digest ready to be written by the caller. The pipeline decides
/// the relative path but does not manage where it lives.
#[derive(Debug, Clone)]
pub struct RenderedDigest {
    pub relative_path: String,
    pub markdown: String,
    pub item_count: usize,
}

/// Run the whole pipeline once: crawl, normalize, dedupe, date-filter,
/// classify, limit, summarize, assemble, render, validate.
///
/// `adapter` selects the run mode: `Some` is model-assisted classification
/// and summarization, `None` is the keyword-and-excerpt fallback with zero
/// external calls. Returns `Ok(None)` when nothing survives the filters —
/// "no news this week" is a successful run that produces no file.
pub async fn run(
    config: &RunConfig,
    sources: &[Source],
    adapter: Option<DynLlmAdapter>,
) -> Result<Option<RenderedDigest>> {
    let run_id = Uuid::new_v4();
    let mode = if adapter.is_some() { "model-assisted" } else { "keyword" };
    info!(
        "Starting digest run {} ({} mode, {} sources)",
        run_id,
        mode,
        sources.len()
    );

    let fetcher = Fetcher::new(config.fetch.clone());
    let items = collect_all(&fetcher, sources, config).await;

    let items = normalize(items);
    let items = dedupe(items);
    let items = filter_window(items, config.window_days);
    if items.is_empty() {
        info!("Run {}: no items inside the window, nothing to publish", run_id);
        return Ok(None);
    }

    let batch_delay = Duration::from_millis(config.batch_delay_ms);
    let items = classify::classify_all(
        items,
        adapter.as_ref(),
        config.classify_concurrency,
        batch_delay,
    )
    .await;
    if items.is_empty() {
        info!("Run {}: every item was excluded, nothing to publish", run_id);
        return Ok(None);
    }

    let items = limit(items, config.max_per_source, config.max_per_category);

    let items = if config.skip_summaries {
        // Bypassed stage: the renderer falls back to the normalized excerpt.
        items
    } else {
        summarize_all(
            items,
            adapter.as_ref(),
            config.classify_concurrency,
            batch_delay,
            config.summary_reuse_min_chars,
        )
        .await
    };

    let digest = assemble(items, Utc::now());
    let markdown = render(&digest);
    validate(&markdown)?;

    let item_count: usize = digest.sections.iter().map(|(_, items)| items.len()).sum();
    info!(
        "Run {} produced {} with {} items",
        run_id,
        relative_path(&digest.meta),
        item_count
    );

    Ok(Some(RenderedDigest {
        relative_path: relative_path(&digest.meta),
        markdown,
        item_count,
    }))
}
