//! Cleanup of text extracted from PDFs.
//!
//! PDF text comes out with words hyphenated across line breaks, hard line
//! wraps, runs of spaces, and punctuation detached from the words around it.
//! [`normalize_text`] turns that into single-line prose.

use regex::Regex;
use std::sync::LazyLock;

static HYPHEN_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\s*\n\s*").unwrap());
static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static PERIOD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\.\s*").unwrap());
static COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").unwrap());
static COLON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*:\s*").unwrap());

/// Normalizes raw extracted text.
///
/// Rules, in order:
/// 1. `-` followed by a line break rejoins the split word
/// 2. newline runs become one space
/// 3. whitespace runs become one space
/// 4. `.`, `,` and `:` get no leading space and exactly one trailing space
/// 5. leading and trailing whitespace is trimmed
///
/// The function is total and idempotent.
pub fn normalize_text(text: &str) -> String {
    let text = HYPHEN_BREAK.replace_all(text, "");
    let text = NEWLINES.replace_all(&text, " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = PERIOD.replace_all(&text, ". ");
    let text = COMMA.replace_all(&text, ", ");
    let text = COLON.replace_all(&text, ": ");
    text.trim().to_string()
}
