//! Post-hoc checks on concept clips.
//!
//! The oracle is told the group-size bounds and the boundary rules in prose;
//! nothing forces it to follow them. These checks report what it got wrong.
//! Findings are logged, never fatal.

use crate::config::ConceptPolicy;
use smartcut_core::{BigSegment, ConceptClip, SegmentId};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ClipFinding {
    /// Segment count outside `min_group..=max_group`.
    GroupSize { clip: usize, used: usize },
    /// Reference to an id not among the cleansed segments.
    UnknownSegment { clip: usize, id: String },
    /// Cleansed segments inside the clip's id span that the clip left out.
    SkippedNeighbors { clip: usize, skipped: Vec<SegmentId> },
    /// Fewer clips than the requested minimum.
    FewClips { produced: usize, requested: usize },
}

impl fmt::Display for ClipFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipFinding::GroupSize { clip, used } => {
                write!(f, "clip {clip} uses {used} segments")
            }
            ClipFinding::UnknownSegment { clip, id } => {
                write!(f, "clip {clip} references unknown segment {id:?}")
            }
            ClipFinding::SkippedNeighbors { clip, skipped } => {
                let ids: Vec<String> = skipped.iter().map(|id| id.to_string()).collect();
                write!(f, "clip {clip} skips {}", ids.join(", "))
            }
            ClipFinding::FewClips {
                produced,
                requested,
            } => write!(f, "{produced} clips produced, {requested} requested"),
        }
    }
}

/// Check `clips` against the policy and the segments they were drawn from.
pub fn audit_clips(
    clips: &[ConceptClip],
    segments: &[BigSegment],
    policy: &ConceptPolicy,
) -> Vec<ClipFinding> {
    let available: BTreeSet<SegmentId> = segments.iter().map(|s| s.id).collect();
    let mut findings = Vec::new();

    for (clip, c) in clips.iter().enumerate() {
        let used = c.big_segments_used.len();
        if used < policy.min_group || used > policy.max_group {
            findings.push(ClipFinding::GroupSize { clip, used });
        }

        let mut chosen = BTreeSet::new();
        for r in &c.big_segments_used {
            match r.resolve().filter(|id| available.contains(id)) {
                Some(id) => {
                    chosen.insert(id);
                }
                None => findings.push(ClipFinding::UnknownSegment {
                    clip,
                    id: r.as_str().to_string(),
                }),
            }
        }

        if let (Some(&lo), Some(&hi)) = (chosen.first(), chosen.last()) {
            let skipped: Vec<SegmentId> = available
                .range(lo..=hi)
                .filter(|id| !chosen.contains(id))
                .copied()
                .collect();
            if !skipped.is_empty() {
                findings.push(ClipFinding::SkippedNeighbors { clip, skipped });
            }
        }
    }

    if !segments.is_empty() && clips.len() < policy.min_clips {
        findings.push(ClipFinding::FewClips {
            produced: clips.len(),
            requested: policy.min_clips,
        });
    }
    findings
}

/// Run [`audit_clips`] and log every finding.
pub fn log_findings(clips: &[ConceptClip], segments: &[BigSegment], policy: &ConceptPolicy) {
    let findings = audit_clips(clips, segments, policy);
    for finding in &findings {
        tracing::warn!(%finding, "concept clip audit");
    }
    if findings.is_empty() {
        tracing::debug!(clips = clips.len(), "concept clips pass audit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcut_core::SegmentRef;

    fn seg(n: u32) -> BigSegment {
        BigSegment {
            id: SegmentId::new(n),
            text: String::new(),
            start: 0.0,
            end: 0.0,
            mini_segments_used: vec![n],
        }
    }

    fn clip(ids: &[&str]) -> ConceptClip {
        ConceptClip {
            big_segments_used: ids.iter().map(|s| SegmentRef::new(*s)).collect(),
            ..Default::default()
        }
    }

    fn policy(min_group: usize, max_group: usize, min_clips: usize) -> ConceptPolicy {
        ConceptPolicy {
            min_group,
            max_group,
            min_clips,
        }
    }

    #[test]
    fn clean_clip_has_no_findings() {
        // seg_2 was removed by cleansing, so jumping over it is not a skip.
        let segments = vec![seg(1), seg(3), seg(4)];
        let findings = audit_clips(
            &[clip(&["seg_1", "seg_3", "seg_4"])],
            &segments,
            &policy(2, 3, 1),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn flags_size_unknown_and_skips() {
        let segments: Vec<BigSegment> = (1..=6).map(seg).collect();
        let findings = audit_clips(
            &[clip(&["seg_1", "seg_4", "seg_99"])],
            &segments,
            &policy(4, 5, 1),
        );
        assert_eq!(
            findings,
            vec![
                ClipFinding::GroupSize { clip: 0, used: 3 },
                ClipFinding::UnknownSegment {
                    clip: 0,
                    id: "seg_99".into()
                },
                ClipFinding::SkippedNeighbors {
                    clip: 0,
                    skipped: vec![SegmentId::new(2), SegmentId::new(3)]
                },
            ]
        );
        assert_eq!(findings[2].to_string(), "clip 0 skips seg_2, seg_3");
    }

    #[test]
    fn too_few_clips() {
        let findings = audit_clips(&[], &[seg(1)], &policy(1, 2, 8));
        assert_eq!(
            findings,
            vec![ClipFinding::FewClips {
                produced: 0,
                requested: 8
            }]
        );
        assert!(audit_clips(&[], &[], &policy(1, 2, 8)).is_empty());
    }
}
