//! Hand-off documents derived from the mapped clips: the cut list for the
//! trimming engine and the rows stored as snippets.

use regex::Regex;
use serde::{Deserialize, Serialize};
use smartcut_core::text::truncate_chars;
use smartcut_core::{MappedConceptClip, SegmentSpan};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\n\r\x0B\x0C]+").unwrap());

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-]").unwrap());

const MAX_NAME_CHARS: usize = 100;

/// Cut list consumed by the trimming engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrimPlan {
    pub video_outputs: Vec<VideoOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoOutput {
    pub vid_title: String,
    pub source_segment_timestamps: Vec<SegmentSpan>,
}

/// One stored snippet per clip. Times are whole seconds, truncated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnippetRecord {
    pub name: String,
    pub summary: String,
    pub start_second: i64,
    pub end_second: i64,
}

/// Every clip becomes one output video. Unknown timestamps are left out; a
/// clip with none left still appears, and the trimming engine skips it.
pub fn build_trim_plan(clips: &[MappedConceptClip]) -> TrimPlan {
    TrimPlan {
        video_outputs: clips
            .iter()
            .map(|c| VideoOutput {
                vid_title: c.clip.vid_title.clone(),
                source_segment_timestamps: c
                    .source_segment_timestamps
                    .iter()
                    .filter_map(|t| t.span())
                    .collect(),
            })
            .collect(),
    }
}

/// File-system safe form of a clip title.
pub fn sanitize_filename(name: &str) -> String {
    let underscored = WHITESPACE.replace_all(name, "_");
    let cleaned = UNSAFE_CHARS.replace_all(&underscored, "");
    let trimmed = truncate_chars(&cleaned, MAX_NAME_CHARS).trim_matches(|c| c == '_' || c == '-');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Output file name of the `index`-th (0-based) video.
pub fn output_file_name(index: usize, title: &str) -> String {
    if title.is_empty() {
        format!("{}) generated_video.mp4", index + 1)
    } else {
        format!("{}) {}.mp4", index + 1, sanitize_filename(title))
    }
}

pub fn snippet_records(clips: &[MappedConceptClip]) -> Vec<SnippetRecord> {
    clips
        .iter()
        .map(|c| SnippetRecord {
            name: if c.clip.vid_title.is_empty() {
                "Untitled".to_string()
            } else {
                c.clip.vid_title.clone()
            },
            summary: c.clip.reasoning.clone(),
            start_second: c.clip.start as i64,
            end_second: c.clip.end as i64,
        })
        .collect()
}
