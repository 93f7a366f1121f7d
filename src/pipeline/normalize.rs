//! Normalization of raw model output into obligation lists.
//!
//! Models do not reliably return clean JSON. The cascade tries
//! progressively looser readings and never fails: worst case it degrades
//! to a single placeholder obligation carrying the raw response, so the
//! document still lands in `analyzed`.

use serde_json::Value;
use tracing::debug;

use crate::models::Obligation;

/// Text of the placeholder obligation emitted when no structured list can
/// be recovered from the model output.
pub const PLACEHOLDER_TEXT: &str = "could not extract structured obligations";

/// Normalize raw model output into a list of obligations.
///
/// Cascade:
/// 1. strip code fences, parse as a JSON array, keep elements with a
///    non-empty `text` field
/// 2. scan for a bracketed substring and parse that
/// 3. fall back to one placeholder obligation with the raw response
///    attached
pub fn normalize_response(raw: &str) -> Vec<Obligation> {
    let stripped = strip_code_fences(raw);

    if let Some(obligations) = parse_array_lenient(stripped) {
        debug!(count = obligations.len(), "Parsed obligations directly");
        return obligations;
    }

    if let Some(candidate) = bracketed_substring(stripped) {
        if let Some(obligations) = parse_array_lenient(candidate) {
            debug!(count = obligations.len(), "Parsed obligations from embedded array");
            return obligations;
        }
    }

    debug!("Model output not parseable, emitting placeholder obligation");
    vec![Obligation {
        text: PLACEHOLDER_TEXT.to_string(),
        section: None,
        due_date: None,
        raw_response: Some(raw.to_string()),
    }]
}

/// Remove a surrounding markdown code fence if present.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim_start()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse a JSON array of obligation objects, skipping malformed elements.
/// Elements without a non-empty `text` field are dropped. Returns `None`
/// when the input is not a JSON array at all, or when the array had
/// elements but none were usable: that is a failed parse, not an empty
/// result, and must reach the placeholder so the raw text is kept.
fn parse_array_lenient(text: &str) -> Option<Vec<Obligation>> {
    let values: Vec<Value> = serde_json::from_str(text).ok()?;
    let had_elements = !values.is_empty();
    let obligations: Vec<Obligation> = values
        .into_iter()
        .filter_map(|value| {
            let obligation: Obligation = serde_json::from_value(value).ok()?;
            if obligation.text.trim().is_empty() {
                None
            } else {
                Some(obligation)
            }
        })
        .collect();
    if had_elements && obligations.is_empty() {
        return None;
    }
    Some(obligations)
}

/// Locate a balanced `[...]` substring starting at the first `[`.
/// Bracket depth is tracked outside of string literals so nested arrays
/// and bracketed obligation text survive.
fn bracketed_substring(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
