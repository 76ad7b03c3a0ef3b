use crate::outcome::StageOutcome;
use crate::stages::{fanout, prompts};
use serde_json::Value;
use smartcut_core::batch::batch_ranges;
use smartcut_core::extract::{self, ExtractError};
use smartcut_core::text::sanitize_line;
use smartcut_core::{BigSegment, RemovalRecord, SegmentId, SegmentRef, NO_REASON_PLACEHOLDER};
use smartcut_oracle::OracleClient;
use std::collections::HashSet;

const STAGE: &str = "cleansing";

/// Ask the oracle which segments to cut, batch by batch.
///
/// Never fails: a batch whose call or parse fails counts as "no removals"
/// and is reported through `Degraded`.
pub async fn plan_removals(
    client: &OracleClient,
    segments: &[BigSegment],
    num_batches: usize,
) -> StageOutcome<Vec<RemovalRecord>> {
    let prompts = batch_ranges(segments.len(), num_batches)
        .into_iter()
        .map(|range| prompts::cleansing(&quote_segments(&segments[range])))
        .collect::<Vec<_>>();
    if prompts.is_empty() {
        return StageOutcome::Complete(Vec::new());
    }
    tracing::info!(segments = segments.len(), batches = prompts.len(), "cleansing");

    let results = fanout::fan_out(client, STAGE, prompts, parse_removals).await;
    let removals = merge_removals(results.answered);
    tracing::info!(removed = removals.len(), "removals planned");
    StageOutcome::from_batches(removals, results.failed)
}

/// `(seg_N) "text"` per line.
fn quote_segments(segments: &[BigSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("({}) \"{}\"", s.id, sanitize_line(&s.text)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep objects carrying an `id`; fill in a missing reason.
fn parse_removals(raw: &str) -> Result<Vec<RemovalRecord>, ExtractError> {
    let items = extract::decode_bracketed(raw)?;
    Ok(items.iter().filter_map(removal_from_value).collect())
}

fn removal_from_value(item: &Value) -> Option<RemovalRecord> {
    let obj = item.as_object()?;
    let id = match obj.get("id")? {
        Value::String(s) => SegmentRef::new(s.clone()),
        Value::Number(n) => SegmentRef::new(format!("seg_{n}")),
        _ => return None,
    };
    let reason = match obj.get("reason") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NO_REASON_PLACEHOLDER.to_string(),
        Some(other) => other.to_string(),
    };
    Some(RemovalRecord { id, reason })
}

/// Dedup key: the segment an id names, or the raw text when it names none.
#[derive(PartialEq, Eq, Hash)]
enum RemovalKey {
    Segment(SegmentId),
    Raw(String),
}

impl RemovalKey {
    fn of(id: &SegmentRef) -> Self {
        match id.resolve() {
            Some(seg) => RemovalKey::Segment(seg),
            None => RemovalKey::Raw(id.as_str().to_string()),
        }
    }
}

/// First occurrence of a segment wins, scanning batches in index order. The
/// result is sorted by segment number when every id parses; otherwise it is
/// left in merge order.
pub fn merge_removals(batches: Vec<Vec<RemovalRecord>>) -> Vec<RemovalRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<RemovalRecord> = batches
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(RemovalKey::of(&r.id)))
        .collect();

    if merged.iter().all(|r| r.id.resolve().is_some()) {
        merged.sort_by_key(|r| r.id.resolve().map(SegmentId::number));
    } else {
        tracing::warn!("removal list has malformed ids; keeping merge order");
    }
    merged
}

/// Segments not named in `removals`, order preserved.
pub fn apply_removals(segments: &[BigSegment], removals: &[RemovalRecord]) -> Vec<BigSegment> {
    let doomed: HashSet<SegmentId> = removals.iter().filter_map(|r| r.id.resolve()).collect();
    segments
        .iter()
        .filter(|s| !doomed.contains(&s.id))
        .cloned()
        .collect()
}
