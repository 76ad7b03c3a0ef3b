use smartcut_core::{BigSegment, MiniUnit, RangeMap, SegmentId};

struct Fold {
    cursor: usize,
    next_id: u32,
    out: Vec<BigSegment>,
}

/// Fold units into big segments, one per breakpoint.
///
/// Each breakpoint closes the slice `cursor..=breakpoint` (clamped to the
/// unit count). Empty slices are skipped without consuming an id, so ids run
/// `seg_1, seg_2, ...` with no gaps. Assumes `units[i].mini_id == i`.
pub fn merge_segments(units: &[MiniUnit], breakpoints: &[u32]) -> Vec<BigSegment> {
    let folded = breakpoints.iter().fold(
        Fold {
            cursor: 0,
            next_id: 1,
            out: Vec::new(),
        },
        |mut acc, &bp| {
            let end = (bp as usize).saturating_add(1).min(units.len());
            if end > acc.cursor {
                acc.out
                    .push(build_segment(SegmentId::new(acc.next_id), &units[acc.cursor..end]));
                acc.next_id += 1;
            }
            acc.cursor = acc.cursor.max(end);
            acc
        },
    );
    if folded.cursor < units.len() {
        tracing::warn!(
            uncovered = units.len() - folded.cursor,
            "breakpoints stop short of the last unit"
        );
    }
    folded.out
}

fn build_segment(id: SegmentId, chunk: &[MiniUnit]) -> BigSegment {
    BigSegment {
        id,
        text: chunk
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        start: chunk.first().map_or(0.0, |u| u.start_second),
        end: chunk.last().map_or(0.0, |u| u.end_second),
        mini_segments_used: chunk.iter().map(|u| u.mini_id).collect(),
    }
}

/// `seg_N -> first-last` for every segment with constituents.
pub fn range_map(segments: &[BigSegment]) -> RangeMap {
    segments
        .iter()
        .filter_map(|s| Some((s.id, s.mini_range()?)))
        .collect()
}
