use crate::ids::{MiniRange, SegmentId, SegmentRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Sentinel written when a clip references a segment id missing from the range map.
pub const UNKNOWN_RANGE: &str = "UNKNOWN_RANGE";

/// Sentinel written when a clip references a segment id with no known timing.
pub const UNKNOWN_TIMESTAMP: &str = "UNKNOWN_TIMESTAMP";

/// Reason recorded when the oracle flags a segment without saying why.
pub const NO_REASON_PLACEHOLDER: &str = "No specific reason provided by LLM";

// ── Transcript ──

/// One line of a speech-to-text transcript, as supplied upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TranscriptLine {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub start_second: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub end_second: f64,
}

/// A transcript line with its position-derived id. Never mutated after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MiniUnit {
    pub text: String,
    pub start_second: f64,
    pub end_second: f64,
    #[serde(rename = "mini_seg_id")]
    pub mini_id: u32,
}

/// Number transcript lines by input order, starting at 0.
pub fn assign_mini_ids(lines: Vec<TranscriptLine>) -> Vec<MiniUnit> {
    lines
        .into_iter()
        .zip(0u32..)
        .map(|(line, mini_id)| MiniUnit {
            text: line.text,
            start_second: line.start_second,
            end_second: line.end_second,
            mini_id,
        })
        .collect()
}

// ── Big segments ──

/// A run of contiguous mini-units forming one coherent thought.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BigSegment {
    pub id: SegmentId,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub mini_segments_used: Vec<u32>,
}

impl BigSegment {
    /// Inclusive mini-id range, `None` only for a segment with no constituents.
    pub fn mini_range(&self) -> Option<MiniRange> {
        Some(MiniRange {
            first: *self.mini_segments_used.first()?,
            last: *self.mini_segments_used.last()?,
        })
    }

    pub fn span(&self) -> SegmentSpan {
        SegmentSpan {
            start: self.start,
            end: self.end,
        }
    }
}

/// `seg_N -> "first-last"` lookup persisted next to the big segments.
pub type RangeMap = BTreeMap<SegmentId, MiniRange>;

/// Start/end seconds of one big segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentSpan {
    pub start: f64,
    pub end: f64,
}

// ── Cleansing ──

/// A segment the cleansing pass decided to drop, with the oracle's reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovalRecord {
    pub id: SegmentRef,
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    NO_REASON_PLACEHOLDER.to_string()
}

// ── Concept clips ──

/// A cluster of big segments that together teach one concept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConceptClip {
    #[serde(default)]
    pub merged_text: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub start: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub end: f64,
    #[serde(default)]
    pub big_segments_used: Vec<SegmentRef>,
    #[serde(default)]
    pub vid_title: String,
    #[serde(default)]
    pub reasoning: String,
    /// Fields the oracle added beyond the above, carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Resolved mini-id range for one referenced segment, or the unknown sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeEntry {
    Known(MiniRange),
    Unknown,
}

impl Serialize for RangeEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RangeEntry::Known(r) => serializer.collect_str(r),
            RangeEntry::Unknown => serializer.serialize_str(UNKNOWN_RANGE),
        }
    }
}

impl<'de> Deserialize<'de> for RangeEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == UNKNOWN_RANGE {
            return Ok(RangeEntry::Unknown);
        }
        s.parse()
            .map(RangeEntry::Known)
            .map_err(serde::de::Error::custom)
    }
}

/// Resolved timing for one referenced segment, or the unknown sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimestampEntry {
    Known(SegmentSpan),
    Unknown,
}

impl TimestampEntry {
    pub fn span(&self) -> Option<SegmentSpan> {
        match self {
            TimestampEntry::Known(s) => Some(*s),
            TimestampEntry::Unknown => None,
        }
    }
}

impl Serialize for TimestampEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TimestampEntry::Known(span) => span.serialize(serializer),
            TimestampEntry::Unknown => serializer.serialize_str(UNKNOWN_TIMESTAMP),
        }
    }
}

impl<'de> Deserialize<'de> for TimestampEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Span(SegmentSpan),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Span(span) => Ok(TimestampEntry::Known(span)),
            Raw::Text(s) if s == UNKNOWN_TIMESTAMP => Ok(TimestampEntry::Unknown),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected {{start, end}} or {UNKNOWN_TIMESTAMP:?}, got {s:?}"
            ))),
        }
    }
}

/// Terminal artifact: a concept clip plus per-reference provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappedConceptClip {
    #[serde(flatten)]
    pub clip: ConceptClip,
    pub mapped_mini_segment_ranges: Vec<RangeEntry>,
    pub source_segment_timestamps: Vec<TimestampEntry>,
}

// ── Serde helpers ──

/// Accept a JSON number, a numeric string, or null (as 0.0).
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null(()),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0.0),
    }
}
