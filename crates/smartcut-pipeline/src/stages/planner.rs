use crate::config::SegmentationConfig;
use crate::outcome::{StageError, StageOutcome};
use crate::stages::{fanout, prompts};
use smartcut_core::batch::batch_ranges;
use smartcut_core::extract::{self, ExtractError};
use smartcut_core::text::sanitize_line;
use smartcut_core::MiniUnit;
use smartcut_oracle::OracleClient;

const STAGE: &str = "segmentation";

/// Ask the oracle where segments end and merge every batch's answer into one
/// sorted, deduplicated breakpoint list whose last element is the last unit id.
///
/// Batches that fail contribute no breakpoints; the outcome is then
/// `Degraded`. Zero units is the only hard failure.
pub async fn plan_breakpoints(
    client: &OracleClient,
    units: &[MiniUnit],
    guide: &SegmentationConfig,
) -> Result<StageOutcome<Vec<u32>>, StageError> {
    let Some(last) = units.last().map(|u| u.mini_id) else {
        return Err(StageError::EmptyTranscript);
    };

    let prompts = batch_ranges(units.len(), guide.batches)
        .into_iter()
        .map(|range| {
            prompts::segmentation(
                &number_lines(&units[range]),
                guide.min_guide,
                guide.max_guide,
            )
        })
        .collect::<Vec<_>>();
    tracing::info!(units = units.len(), batches = prompts.len(), "planning breakpoints");

    let results = fanout::fan_out(client, STAGE, prompts, parse_breakpoints).await;
    let breakpoints = merge_breakpoints(results.answered, last);
    tracing::info!(breakpoints = breakpoints.len(), "breakpoints planned");
    Ok(StageOutcome::from_batches(breakpoints, results.failed))
}

/// `[id] text` per line, one line per unit.
fn number_lines(units: &[MiniUnit]) -> String {
    units
        .iter()
        .map(|u| format!("[{}] {}", u.mini_id, sanitize_line(&u.text)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_breakpoints(raw: &str) -> Result<Vec<u32>, ExtractError> {
    extract::decode_bracketed(raw).map(|items| extract::integer_ids(&items))
}

/// Concatenate, sort, dedupe, and close with `last`. Ids past `last` are
/// hallucinated and dropped so the maximum is always `last`.
pub fn merge_breakpoints(batches: Vec<Vec<u32>>, last: u32) -> Vec<u32> {
    let mut all: Vec<u32> = batches
        .into_iter()
        .flatten()
        .filter(|&id| id <= last)
        .collect();
    all.sort_unstable();
    all.dedup();
    if all.last() != Some(&last) {
        all.push(last);
    }
    all
}
