use crate::types::Item;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use url::Url;

const EXCERPT_MAX_CHARS: usize = 500;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("valid regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static RE_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

/// Normalize every item: pure, no I/O, and idempotent — running it twice
/// yields the same collection as running it once. Items whose link does not
/// parse as an absolute URL are dropped here; nothing downstream can cite
/// them, and a malformed entry must never abort the run.
pub fn normalize(items: Vec<Item>) -> Vec<Item> {
    items.into_iter().filter_map(normalize_item).collect()
}

fn normalize_item(item: Item) -> Option<Item> {
    let url = match canonicalize(&item.url) {
        Some(url) => url,
        None => {
            warn!(
                "Dropping '{}' from '{}': unusable link {}",
                item.title, item.source, item.url
            );
            return None;
        }
    };

    Some(Item {
        title: normalize_title(&item.title),
        excerpt: normalize_excerpt(&item.excerpt),
        url,
        ..item
    })
}

/// Titles: decode entities, drop bracketed tag markers like `[Podcast]`,
/// collapse whitespace.
pub fn normalize_title(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let stripped = RE_BRACKETS.replace_all(&decoded, " ");
    collapse_whitespace(&stripped)
}

/// Excerpts: decode entities, strip HTML tags, collapse whitespace, cap the
/// length so one verbose feed cannot dominate a prompt or the rendered page.
pub fn normalize_excerpt(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let stripped = RE_TAGS.replace_all(&decoded, " ");
    let collapsed = collapse_whitespace(&stripped);
    if collapsed.chars().count() > EXCERPT_MAX_CHARS {
        collapsed.chars().take(EXCERPT_MAX_CHARS).collect()
    } else {
        collapsed
    }
}

/// Re-serialize the URL through a parser, which drops non-canonical notation
/// (default ports, percent-case differences). Query parameters are kept
/// intact at this stage; tracking-parameter stripping belongs to dedupe.
/// `None` for anything that does not parse as an absolute URL, relative feed
/// links included.
pub fn canonicalize(raw: &str) -> Option<String> {
    Url::parse(raw.trim()).ok().map(|url| url.to_string())
}

/// Decode the five entities feeds most commonly leave encoded, repeating
/// until the text stops changing: double-encoded feeds (`&amp;lt;`) settle
/// to a fixpoint in one call, keeping normalization idempotent. Each pass
/// strictly shrinks the string, so the loop terminates.
pub fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let decoded = current
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#039;", "'")
            .replace("&amp;", "&");
        if decoded == current {
            return decoded;
        }
        current = decoded;
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    RE_WS.replace_all(text, " ").trim().to_string()
}

/// Strip HTML markup and collapse whitespace; used by collectors on raw feed
/// bodies before an item is even constructed.
pub fn strip_markup(text: &str) -> String {
    collapse_whitespace(&RE_TAGS.replace_all(text, " "))
}
