use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

const CONTENT_PREFIX_CHARS: usize = 50;

/// Lower-case ASCII slug: letters, digits, `_` and single hyphens between words.
///
/// Text is NFKD-decomposed first, so accented letters keep their base letter.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    SEPARATORS
        .replace_all(&cleaned, "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// Slug stem for a post: the title, else the first characters of the content, else `post`.
pub fn base_slug(title: &str, content: &str) -> String {
    let from_title = slugify(title);
    if !from_title.is_empty() {
        return from_title;
    }
    let prefix: String = content.chars().take(CONTENT_PREFIX_CHARS).collect();
    let from_content = slugify(&prefix);
    if !from_content.is_empty() {
        return from_content;
    }
    "post".to_string()
}

/// `base` for the first attempt, then `base-1`, `base-2`, ...
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}
