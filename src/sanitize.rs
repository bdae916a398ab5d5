//! Input scrubbing for free-text book fields.
//!
//! Every string that reaches the store passes through one of the two entry points here:
//! [`sanitize_text`] for single-line fields (title, author) and [`sanitize_textarea`]
//! for the description, which keeps its line breaks.

use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("script/style pattern")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[a-zA-Z/!?][^>]*>").expect("tag pattern"));

static OCTET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("octet pattern"));

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n\t ]+").expect("whitespace pattern"));

fn strip_markup(input: &str) -> String {
    let without_blocks = SCRIPT_OR_STYLE.replace_all(input, "");
    let without_tags = TAG.replace_all(&without_blocks, "");
    without_tags.replace('<', "&lt;")
}

fn strip_octets(input: String) -> String {
    let mut out = input;
    while OCTET.is_match(&out) {
        out = OCTET.replace_all(&out, "").into_owned();
    }
    out
}

fn strip_controls(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

fn scrub(input: &str) -> String {
    strip_controls(&strip_octets(strip_markup(input)))
}

/// Cleans a single-line field: markup and control content removed, whitespace collapsed, trimmed.
pub fn sanitize_text(input: &str) -> String {
    let scrubbed = scrub(input);
    WHITESPACE_RUN.replace_all(&scrubbed, " ").trim().to_string()
}

/// Cleans a multi-line field. Same as [`sanitize_text`] except line breaks survive.
pub fn sanitize_textarea(input: &str) -> String {
    let scrubbed = scrub(input).replace("\r\n", "\n").replace('\r', "\n");
    scrubbed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
