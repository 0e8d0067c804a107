use crate::fetcher::FetchConfig;
use crate::types::{DigestError, Result, Source};
use std::path::Path;
use tracing::info;

/// Tunables for one pipeline run. Everything has a sensible default so tests
/// and callers only override what they care about.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Trailing window: keep items published strictly after now - window_days.
    pub window_days: i64,
    pub max_per_source: usize,
    pub max_per_category: usize,
    /// Feed fetches in flight at once.
    pub rss_concurrency: usize,
    /// HTML fetch + probing is heavier, so web sources get a lower bound.
    pub web_concurrency: usize,
    /// Classification/summarization calls in flight at once (model mode).
    pub classify_concurrency: usize,
    /// Pause between model-call batches; not applied in keyword mode.
    pub batch_delay_ms: u64,
    /// A classifier-provided summary at least this long is reused instead of
    /// making a second model call. Arbitrary cutoff, exposed as a tunable.
    pub summary_reuse_min_chars: usize,
    /// Bypass the summarizer stage entirely and render the excerpt.
    pub skip_summaries: bool,
    pub fetch: FetchConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            max_per_source: 4,
            max_per_category: 12,
            rss_concurrency: 5,
            web_concurrency: 3,
            classify_concurrency: 10,
            batch_delay_ms: 1_000,
            summary_reuse_min_chars: 80,
            skip_summaries: false,
            fetch: FetchConfig::default(),
        }
    }
}

/// Load the source list from a JSON file. Any failure here is a
/// configuration error and aborts the run before network activity starts.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DigestError::Config(format!("cannot read source list {}: {}", path.display(), e))
    })?;

    let sources: Vec<Source> = serde_json::from_str(&raw).map_err(|e| {
        DigestError::Config(format!("malformed source list {}: {}", path.display(), e))
    })?;

    if sources.is_empty() {
        return Err(DigestError::Config(format!(
            "source list {} is empty",
            path.display()
        )));
    }

    info!("Loaded {} sources from {}", sources.len(), path.display());
    Ok(sources)
}
