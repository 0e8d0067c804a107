use crate::types::Item;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// Keep items published strictly inside the trailing window. An empty result
/// is a valid terminal state for the run ("no news this week"), not an error.
pub fn filter_window(items: Vec<Item>, window_days: i64) -> Vec<Item> {
    let cutoff = Utc::now() - Duration::days(window_days);
    let before = items.len();
    let kept: Vec<Item> = items
        .into_iter()
        .filter(|item| item.published_at > cutoff)
        .collect();
    info!(
        "Date filter kept {} of {} items ({}-day window)",
        kept.len(),
        before,
        window_days
    );
    kept
}

/// Cap contributions per source, then per category. The order matters: the
/// source pass stops one prolific feed from crowding out a category before
/// the category pass runs; the category pass then stops any single bucket
/// from overwhelming the digest even when no source is over its own cap.
pub fn limit(items: Vec<Item>, max_per_source: usize, max_per_category: usize) -> Vec<Item> {
    let by_source = cap_groups(items, max_per_source, |item| item.source.clone());
    cap_groups(by_source, max_per_category, |item| {
        item.category.clone().unwrap_or_default()
    })
}

/// Group by key (group order follows first appearance), sort each group by
/// `published_at` descending, keep the first `max`, flatten.
fn cap_groups<F>(items: Vec<Item>, max: usize, key_of: F) -> Vec<Item>
where
    F: Fn(&Item) -> String,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Item>> = HashMap::new();

    for item in items {
        let key = key_of(&item);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(item);
    }

    let mut out = Vec::new();
    for key in order {
        let mut group = groups.remove(&key).unwrap_or_default();
        group.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if group.len() > max {
            debug!("Capping group '{}' from {} to {}", key, group.len(), max);
            group.truncate(max);
        }
        out.extend(group);
    }
    out
}
