use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display prefix for big-segment ids: `seg_<n>`.
pub const SEGMENT_PREFIX: &str = "seg_";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("segment id must look like `seg_<n>`, got {0:?}")]
    Segment(String),
    #[error("mini range must look like `<first>-<last>`, got {0:?}")]
    Range(String),
}

/// Identifier of a [`crate::BigSegment`]. Numbered from 1 in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SegmentId(u32);

impl SegmentId {
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SEGMENT_PREFIX}{}", self.0)
    }
}

impl FromStr for SegmentId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix(SEGMENT_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .map(SegmentId)
            .ok_or_else(|| ParseIdError::Segment(s.to_string()))
    }
}

impl TryFrom<String> for SegmentId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SegmentId> for String {
    fn from(id: SegmentId) -> Self {
        id.to_string()
    }
}

/// A segment id as written by the oracle. Kept verbatim so a hallucinated or
/// malformed reference survives into audit artifacts instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SegmentRef(String);

impl SegmentRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(&self) -> Option<SegmentId> {
        self.0.parse().ok()
    }
}

impl From<SegmentId> for SegmentRef {
    fn from(id: SegmentId) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SegmentRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => SegmentRef(s),
            // Oracles occasionally drop the prefix and answer with the bare number.
            Raw::Number(n) => SegmentRef(format!("{SEGMENT_PREFIX}{n}")),
        })
    }
}

/// Inclusive mini-unit id range covered by one big segment, shown as `first-last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MiniRange {
    pub first: u32,
    pub last: u32,
}

impl fmt::Display for MiniRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

impl FromStr for MiniRange {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::Range(s.to_string());
        let (a, b) = s.split_once('-').ok_or_else(err)?;
        let first = a.trim().parse().map_err(|_| err())?;
        let last = b.trim().parse().map_err(|_| err())?;
        Ok(MiniRange { first, last })
    }
}

impl TryFrom<String> for MiniRange {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MiniRange> for String {
    fn from(r: MiniRange) -> Self {
        r.to_string()
    }
}
