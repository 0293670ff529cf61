//! Relaxed URL extraction from chat message text
//!
//! Deliberately looser than RFC 3986: bare domains and scheme-less links
//! are accepted, since people paste `arxiv.org/abs/...` as often as the
//! full form. Slack's `<url |label>` wrapping is handled by stopping the
//! match at `<`, `>` and `|`.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://)?(?:[a-z0-9][a-z0-9_-]*\.)+[a-z]{2,}(?::\d{1,5})?(?:/[^\s<>|]*)?",
    )
    .expect("URL regex is valid")
});

/// All URL-looking substrings of `text`, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|found| {
            found
                .as_str()
                .trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | '\'' | '"'))
                .to_string()
        })
        .collect()
}
