//! Best-effort JSON extraction from model replies.
//!
//! Model output is free text that usually, but not always, contains the JSON
//! we asked for. This is a heuristic, not a parser: a fixed set of structural
//! patterns is tried in order and the first one that parses wins.

use serde_json::Value;

/// Pull a JSON value out of raw model output.
///
/// Control characters 0x00-0x1F (except newline, carriage return, tab) are
/// replaced with spaces first, since models occasionally emit them inside
/// string literals. Patterns tried in order:
///
/// 1. fenced code block (with or without a `json` tag)
/// 2. bare object, first `{` to last `}`
/// 3. bare array, first `[` to last `]`
///
/// Returns `None` when nothing parses. Pure and idempotent.
pub fn extract_json(raw: &str) -> Option<Value> {
    let cleaned = scrub(raw);
    let text = cleaned.trim();
    if text.is_empty() {
        return None;
    }

    let candidates = [fenced_block(text), bare_object(text), bare_array(text)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate.trim()) {
            return Some(value);
        }
    }

    None
}

/// Replace disallowed ASCII control characters with spaces and drop a BOM
fn scrub(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .chars()
        .map(|c| {
            if (c as u32) < 0x20 && !matches!(c, '\n' | '\r' | '\t') {
                ' '
            } else {
                c
            }
        })
        .collect()
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(&after[..end])
}

fn bare_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn bare_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}
