//! Defensive extraction of JSON arrays from free-form oracle text.
//!
//! The oracle is asked for "only a JSON list" but routinely wraps it in prose
//! or markdown fences. Two strategies are used, matching the two kinds of call
//! site: a greedy bracket pattern for the batched planner/cleansing calls, and
//! an outermost-slice with fenced-block fallback for the concept passes.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\[.*?\])\s*```").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON array found in oracle output")]
    NotFound,
    #[error("extracted text is not a JSON array: {0}")]
    Decode(#[from] serde_json::Error),
}

/// First `[` through the last `]`, located by pattern search.
pub fn bracketed_region(raw: &str) -> Option<&str> {
    BRACKETED.find(raw).map(|m| m.as_str())
}

/// Outermost `[ ... ]` slice; falls back to a ```` ```json ```` fenced block
/// when the brackets are missing or inverted.
pub fn outermost_array(raw: &str) -> Option<&str> {
    match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if end > start => Some(&raw[start..=end]),
        _ => fenced_array(raw),
    }
}

/// Array inside the first ```` ```json ```` fence.
pub fn fenced_array(raw: &str) -> Option<&str> {
    FENCED_JSON
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Locate with [`bracketed_region`] and decode as a JSON array.
pub fn decode_bracketed(raw: &str) -> Result<Vec<Value>, ExtractError> {
    let region = bracketed_region(raw).ok_or(ExtractError::NotFound)?;
    Ok(serde_json::from_str(region)?)
}

/// Decode the outermost slice, then the fenced block if the slice is absent
/// or does not decode. Fails only when neither yields an array.
pub fn decode_outermost(raw: &str) -> Result<Vec<Value>, ExtractError> {
    let sliced = match outermost_array(raw) {
        Some(region) => serde_json::from_str(region).map_err(ExtractError::from),
        None => Err(ExtractError::NotFound),
    };
    match sliced {
        Ok(items) => Ok(items),
        Err(first) => match fenced_array(raw) {
            Some(region) => serde_json::from_str(region).map_err(|e| match first {
                ExtractError::NotFound => ExtractError::Decode(e),
                decode => decode,
            }),
            None => Err(first),
        },
    }
}

/// Keep elements that are non-negative integers or all-digit strings.
pub fn integer_ids(items: &[Value]) -> Vec<u32> {
    items
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().ok()
            }
            _ => None,
        })
        .collect()
}
