use smartcut_core::{
    BigSegment, ConceptClip, MappedConceptClip, RangeEntry, RangeMap, SegmentId, SegmentSpan,
    TimestampEntry,
};
use std::collections::HashMap;

/// Attach to every clip the mini-id range and timing of each segment it uses.
///
/// An id missing from either lookup gets the matching sentinel instead of
/// failing the batch.
pub fn remap_clips(
    clips: &[ConceptClip],
    ranges: &RangeMap,
    segments: &[BigSegment],
) -> Vec<MappedConceptClip> {
    if clips.is_empty() {
        return Vec::new();
    }
    let spans: HashMap<SegmentId, SegmentSpan> =
        segments.iter().map(|s| (s.id, s.span())).collect();

    let mut misses = 0usize;
    let mapped = clips
        .iter()
        .map(|clip| {
            let resolved: Vec<Option<SegmentId>> =
                clip.big_segments_used.iter().map(|r| r.resolve()).collect();
            let mapped_mini_segment_ranges = resolved
                .iter()
                .copied()
                .map(|id| match id.and_then(|id| ranges.get(&id)) {
                    Some(range) => RangeEntry::Known(*range),
                    None => {
                        misses += 1;
                        RangeEntry::Unknown
                    }
                })
                .collect();
            let source_segment_timestamps = resolved
                .iter()
                .copied()
                .map(|id| match id.and_then(|id| spans.get(&id)) {
                    Some(span) => TimestampEntry::Known(*span),
                    None => TimestampEntry::Unknown,
                })
                .collect();
            MappedConceptClip {
                clip: clip.clone(),
                mapped_mini_segment_ranges,
                source_segment_timestamps,
            }
        })
        .collect();

    if misses > 0 {
        tracing::warn!(misses, "clips reference segments with no known range");
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcut_core::{MiniRange, SegmentRef, UNKNOWN_RANGE, UNKNOWN_TIMESTAMP};

    fn seg(n: u32, first: u32, last: u32) -> BigSegment {
        BigSegment {
            id: SegmentId::new(n),
            text: String::new(),
            start: first as f64,
            end: last as f64 + 1.0,
            mini_segments_used: (first..=last).collect(),
        }
    }

    fn clip(ids: &[&str]) -> ConceptClip {
        ConceptClip {
            vid_title: "Unit economics".into(),
            big_segments_used: ids.iter().map(|s| SegmentRef::new(*s)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_every_reference() {
        let segments = vec![seg(1, 0, 4), seg(3, 9, 13)];
        let ranges: RangeMap =
            serde_json::from_str(r#"{"seg_1":"0-4","seg_3":"9-13"}"#).unwrap();

        let mapped = remap_clips(&[clip(&["seg_1", "seg_3"])], &ranges, &segments);
        assert_eq!(mapped.len(), 1);
        assert_eq!(
            mapped[0].mapped_mini_segment_ranges,
            vec![
                RangeEntry::Known(MiniRange { first: 0, last: 4 }),
                RangeEntry::Known(MiniRange { first: 9, last: 13 }),
            ]
        );
        assert_eq!(
            mapped[0].source_segment_timestamps,
            vec![
                TimestampEntry::Known(SegmentSpan { start: 0.0, end: 5.0 }),
                TimestampEntry::Known(SegmentSpan { start: 9.0, end: 14.0 }),
            ]
        );
        let json = serde_json::to_value(&mapped[0]).unwrap();
        assert_eq!(json["mapped_mini_segment_ranges"], serde_json::json!(["0-4", "9-13"]));
        assert_eq!(json["vid_title"], "Unit economics");
    }

    #[test]
    fn unknown_ids_get_sentinels() {
        let segments = vec![seg(1, 0, 4)];
        let ranges: RangeMap = serde_json::from_str(r#"{"seg_1":"0-4"}"#).unwrap();

        let mapped = remap_clips(&[clip(&["seg_1", "seg_7", "opening"])], &ranges, &segments);
        let json = serde_json::to_value(&mapped[0]).unwrap();
        assert_eq!(
            json["mapped_mini_segment_ranges"],
            serde_json::json!(["0-4", UNKNOWN_RANGE, UNKNOWN_RANGE])
        );
        assert_eq!(json["source_segment_timestamps"][1], UNKNOWN_TIMESTAMP);
        assert_eq!(json["source_segment_timestamps"][2], UNKNOWN_TIMESTAMP);
    }

    #[test]
    fn empty_clips_map_to_nothing() {
        assert!(remap_clips(&[], &RangeMap::new(), &[]).is_empty());
    }
}
