use crate::llm_adapter::{decode_verdict, DynLlmAdapter};
use crate::types::{Classification, Item, Result};
use futures::future::join_all;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Category display names in digest priority order. Classification (either
/// mode) assigns one of these, or falls back to the item's source bucket.
pub const CATEGORY_ORDER: [&str; 6] = [
    "Kubernetes Core",
    "Cloud Native Ecosystem",
    "Security",
    "Releases & Updates",
    "Tooling & Platform",
    "Community",
];

pub const DEFAULT_CATEGORY: &str = "Community";

const CLASSIFY_INSTRUCTION: &str = "You are triaging stories for a weekly cloud-native \
engineering digest. Decide whether the story is worth a busy platform engineer's time. \
Assign exactly one category from: Kubernetes Core, Cloud Native Ecosystem, Security, \
Releases & Updates, Tooling & Platform, Community. Respond with JSON only, no prose: \
{\"include\": boolean, \"category\": string, \"tags\": [string], \"summary\": string}. \
Exclude marketing fluff and duplicate coverage. Keep the summary to two sentences.";

/// Keyword classifier: no external dependency, an ordered list of category
/// signatures where the first match wins. Also owns the event-announcement
/// exclusion both modes share.
pub struct KeywordClassifier {
    signatures: Vec<(&'static str, Regex)>,
    re_coming: Regex,
    re_event_year: Regex,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        let signatures = vec![
            ("Kubernetes Core", r"kubernetes|k8s|kubectl|kubelet|kubeadm"),
            (
                "Cloud Native Ecosystem",
                r"\bcncf\b|istio|envoy|helm|etcd|containerd|cilium|argo\b|fluxcd|\bflux\b",
            ),
            (
                "Security",
                r"cve-\d{4}|vulnerab|security|exploit|hardening",
            ),
            (
                "Releases & Updates",
                r"\breleased?\b|\brelease\b|changelog|\bga\b|v\d+\.\d+",
            ),
            (
                "Tooling & Platform",
                r"terraform|docker|gitops|ci/cd|observability|prometheus|grafana|opentelemetry",
            ),
        ];

        Self {
            signatures: signatures
                .into_iter()
                .map(|(cat, re)| (cat, Regex::new(&format!("(?i){}", re)).expect("valid regex")))
                .collect(),
            re_coming: Regex::new(r"(?i)is coming!").expect("valid regex"),
            re_event_year: Regex::new(r"(?i)\b(conference|summit|meetup|event|webinar|kubecon)\b.{0,40}\b20\d{2}\b")
                .expect("valid regex"),
        }
    }

    /// Conference/event announcements are excluded up front in both modes;
    /// in model mode this also saves the call.
    pub fn is_event_announcement(&self, title: &str) -> bool {
        self.re_coming.is_match(title) || self.re_event_year.is_match(title)
    }

    pub fn classify(&self, item: &Item) -> Classification {
        let fallback_category = item
            .category
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        if self.is_event_announcement(&item.title) {
            debug!("Event announcement excluded: {}", item.title);
            return Classification {
                include: false,
                category: fallback_category,
                tags: Vec::new(),
                summary: None,
            };
        }

        let haystack = format!("{} {}", item.title, item.excerpt);
        for (category, signature) in &self.signatures {
            if signature.is_match(&haystack) {
                return Classification {
                    include: true,
                    category: (*category).to_string(),
                    tags: Vec::new(),
                    summary: None,
                };
            }
        }

        Classification {
            include: true,
            category: fallback_category,
            tags: Vec::new(),
            summary: None,
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify every item and drop the excluded ones. With an adapter present
/// this is the model-assisted path, batched with bounded concurrency and an
/// inter-batch delay to respect the provider's rate limits; without one it is
/// pure keyword matching with no delays. A failed or undecodable model call
/// falls back to the keyword rules for that single item — classification
/// failures are per-item, never fatal.
pub async fn classify_all(
    items: Vec<Item>,
    adapter: Option<&DynLlmAdapter>,
    concurrency: usize,
    batch_delay: Duration,
) -> Vec<Item> {
    let keyword = KeywordClassifier::new();
    let total = items.len();
    let mut classified = Vec::with_capacity(total);

    match adapter {
        None => {
            for item in items {
                let verdict = keyword.classify(&item);
                classified.push(apply(item, verdict));
            }
        }
        Some(adapter) => {
            let chunks: Vec<Vec<Item>> = items
                .chunks(concurrency.max(1))
                .map(|c| c.to_vec())
                .collect();
            let last = chunks.len().saturating_sub(1);

            for (index, chunk) in chunks.into_iter().enumerate() {
                let keyword = &keyword;
                let batch = join_all(chunk.into_iter().map(|item| async move {
                    let verdict = classify_one(&item, adapter, keyword).await;
                    apply(item, verdict)
                }))
                .await;
                classified.extend(batch);

                if index < last {
                    tokio::time::sleep(batch_delay).await;
                }
            }
        }
    }

    let kept: Vec<Item> = classified
        .into_iter()
        .filter(|item| item.include != Some(false))
        .collect();
    info!("Classification kept {} of {} items", kept.len(), total);
    kept
}

async fn classify_one(
    item: &Item,
    adapter: &DynLlmAdapter,
    keyword: &KeywordClassifier,
) -> Classification {
    // Short-circuit before spending a model call.
    if keyword.is_event_announcement(&item.title) {
        return keyword.classify(item);
    }

    match model_verdict(item, adapter).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(
                "Model classification failed for '{}', using keyword fallback: {}",
                item.title, e
            );
            keyword.classify(item)
        }
    }
}

async fn model_verdict(item: &Item, adapter: &DynLlmAdapter) -> Result<Classification> {
    let payload = format!(
        "Title: {}\nSource: {}\nPublished: {}\nExcerpt: {}",
        item.title,
        item.source,
        item.published_at.to_rfc3339(),
        item.excerpt
    );
    let response = adapter.complete(CLASSIFY_INSTRUCTION, &payload).await?;
    decode_verdict(&response)
}

/// Fold a classification into the item, producing a new value record.
fn apply(item: Item, verdict: Classification) -> Item {
    let mut tags = item.tags.clone();
    for tag in verdict.tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Item {
        category: Some(verdict.category),
        tags,
        summary: verdict.summary.or(item.summary),
        include: Some(verdict.include),
        ..item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str, excerpt: &str) -> Item {
        Item {
            title: title.to_string(),
            url: "https://example.com/a".to_string(),
            excerpt: excerpt.to_string(),
            source: "test".to_string(),
            published_at: Utc::now(),
            category: Some("Bucket".to_string()),
            tags: Vec::new(),
            summary: None,
            include: None,
            priority: None,
        }
    }

    #[test]
    fn first_matching_signature_wins() {
        let kw = KeywordClassifier::new();
        // Matches both the Kubernetes and Releases signatures; the earlier
        // signature in the ordered list must win.
        let verdict = kw.classify(&item("Kubernetes v1.32 released", ""));
        assert!(verdict.include);
        assert_eq!(verdict.category, "Kubernetes Core");
    }

    #[test]
    fn unmatched_items_fall_back_to_the_source_bucket() {
        let kw = KeywordClassifier::new();
        let verdict = kw.classify(&item("A quiet week in tech", "nothing notable"));
        assert!(verdict.include);
        assert_eq!(verdict.category, "Bucket");
    }

    #[test]
    fn event_announcements_are_excluded() {
        let kw = KeywordClassifier::new();
        let verdict = kw.classify(&item("Kubernetes 1.32 Is Coming! Register Now", ""));
        assert!(!verdict.include);

        let verdict = kw.classify(&item("KubeCon 2026 schedule announced", ""));
        assert!(!verdict.include);
    }
}
