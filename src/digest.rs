use crate::classify::CATEGORY_ORDER;
use crate::types::{Digest, DigestError, DigestMeta, Item, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use url::Url;

static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\(([^)]+)\)").expect("valid regex"));

/// Group the final item collection into the digest shape. Section order
/// follows the fixed category priority list — not discovery order — so the
/// digest layout is stable across runs; categories outside the list (custom
/// source buckets) are appended in first-appearance order. Items inside a
/// section are ordered by `published_at` descending.
pub fn assemble(items: Vec<Item>, now: DateTime<Utc>) -> Digest {
    let total = items.len();

    let mut discovery_order: Vec<String> = Vec::new();
    let mut by_category: HashMap<String, Vec<Item>> = HashMap::new();
    for item in items {
        let category = item
            .category
            .clone()
            .unwrap_or_else(|| CATEGORY_ORDER[CATEGORY_ORDER.len() - 1].to_string());
        if !by_category.contains_key(&category) {
            discovery_order.push(category.clone());
        }
        by_category.entry(category).or_default().push(item);
    }

    let mut sections: Vec<(String, Vec<Item>)> = Vec::new();
    for category in CATEGORY_ORDER {
        if let Some(mut group) = by_category.remove(category) {
            group.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            sections.push((category.to_string(), group));
        }
    }
    for category in discovery_order {
        if let Some(mut group) = by_category.remove(&category) {
            group.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            sections.push((category, group));
        }
    }

    let iso = now.iso_week();
    let meta = DigestMeta {
        title: format!("Weekly Digest: Week {}, {}", iso.week(), iso.year()),
        date: now.date_naive(),
        week: iso.week(),
        year: iso.year(),
        synopsis: format!("{} stories across {} categories", total, sections.len()),
    };

    info!(
        "Assembled digest for week {}/{} with {} sections",
        meta.week,
        meta.year,
        sections.len()
    );
    Digest { meta, sections }
}

/// Relative output path for a digest, keyed by (year, week). The caller
/// decides where that path lives and writes the file.
pub fn relative_path(meta: &DigestMeta) -> String {
    format!("{}/week-{:02}.md", meta.year, meta.week)
}

/// Serialize the digest: a front-matter block, then one section per
/// category, each item rendered with a fixed template.
pub fn render(digest: &Digest) -> String {
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str(&format!("title: \"{}\"\n", digest.meta.title));
    out.push_str(&format!("date: {}\n", digest.meta.date.format("%Y-%m-%d")));
    out.push_str(&format!("summary: \"{}\"\n", digest.meta.synopsis));
    out.push_str("---\n\n");

    out.push_str(&format!("# {}\n", digest.meta.title));

    for (category, items) in &digest.sections {
        out.push_str(&format!("\n## {}\n", category));
        for item in items {
            out.push_str(&format!(
                "\n### [{}]({})\n\n",
                link_text(&item.title),
                link_target(&item.url)
            ));
            let body = item
                .summary
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(&item.excerpt);
            if !body.is_empty() {
                out.push_str(body);
                out.push_str("\n\n");
            }
            out.push_str(&format!(
                "*{}, {}*\n",
                item.source,
                item.published_at.format("%Y-%m-%d")
            ));
        }
    }

    out
}

/// Markdown link hardening: a stray bracket in a headline or a parenthesis
/// in a URL would terminate the `[text](url)` form early. Brackets become
/// parentheses in the link text; parentheses are percent-encoded in the
/// target, which keeps the URL valid and duplicate detection consistent.
fn link_text(title: &str) -> String {
    title.replace('[', "(").replace(']', ")")
}

fn link_target(url: &str) -> String {
    url.replace('(', "%28").replace(')', "%29")
}

/// Re-parse the rendered document and check the invariants downstream
/// tooling depends on: well-formed front matter, syntactically valid links,
/// and no duplicate URLs. A failure here indicates a rendering-stage bug and
/// is fatal for the run.
pub fn validate(markdown: &str) -> Result<()> {
    let mut problems: Vec<String> = Vec::new();

    match parse_front_matter(markdown) {
        Some(fields) => {
            for required in ["title", "date", "summary"] {
                match fields.get(required) {
                    Some(value) if !value.is_empty() => {}
                    _ => problems.push(format!("front matter field '{}' missing", required)),
                }
            }
            if let Some(date) = fields.get("date") {
                if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                    problems.push(format!("front matter date '{}' is not a valid date", date));
                }
            }
        }
        None => problems.push("front matter block missing".to_string()),
    }

    let mut seen: HashSet<String> = HashSet::new();
    for capture in RE_LINK.captures_iter(markdown) {
        let link = capture[1].to_string();
        if Url::parse(&link).is_err() {
            problems.push(format!("invalid link: {}", link));
        }
        if !seen.insert(link.clone()) {
            problems.push(format!("duplicate link: {}", link));
        }
    }

    if problems.is_empty() {
        debug!("Rendered digest passed validation");
        Ok(())
    } else {
        Err(DigestError::Validation(problems.join("; ")))
    }
}

fn parse_front_matter(markdown: &str) -> Option<HashMap<String, String>> {
    let mut lines = markdown.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }

    let mut fields = HashMap::new();
    for line in lines {
        if line.trim() == "---" {
            return Some(fields);
        }
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim().trim_matches('"').to_string();
            fields.insert(key.trim().to_string(), value);
        }
    }
    None
}
