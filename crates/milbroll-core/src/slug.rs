// Player display name → URL slug used by the stats site's player pages.

use regex::Regex;
use std::sync::LazyLock;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_\s\-.]").expect("static slug pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern is valid"));

/// Normalize a display name into a lowercase, hyphen-joined slug.
///
/// Steps, in order: drop every character that is not a letter, number,
/// underscore, whitespace, hyphen, or period (combining marks and connector
/// punctuation other than `_` are dropped); drop periods; trim and collapse whitespace
/// runs to one space; lowercase; turn spaces into hyphens.
///
/// A name with nothing usable normalizes to `""`, which still yields a
/// syntactically valid (empty) path segment.
pub fn normalize_name(name: &str) -> String {
    let cleaned = DISALLOWED.replace_all(name, "");
    let cleaned = cleaned.replace('.', "");
    let collapsed = WHITESPACE.replace_all(cleaned.trim(), " ");
    collapsed.to_lowercase().replace(' ', "-")
}
