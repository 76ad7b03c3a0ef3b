//! Structured event logging for pipeline runs.
//!
//! Writes append-only JSONL to `<session>/events.jsonl`.

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// ── Event types ──

/// A pipeline event. Serialized as tagged JSON (`"type": "run_start"`, etc.).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    RunStart {
        session: String,
        units: usize,
    },
    StageStart {
        stage: String,
    },
    StageResumed {
        stage: String,
    },
    StagePassed {
        stage: String,
        duration_ms: u64,
        items: usize,
    },
    StageDegraded {
        stage: String,
        duration_ms: u64,
        items: usize,
        failed_batches: Vec<usize>,
    },
    StageFailed {
        stage: String,
        duration_ms: u64,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_output: Option<String>,
    },
    RunFinished {
        clips: usize,
        degraded_stages: Vec<String>,
    },
    RunFailed {
        stage: String,
        error: String,
    },
}

/// Wrapper that adds sequence number and timestamp to each event.
#[derive(Debug, Serialize)]
pub struct FullEvent {
    pub seq: u32,
    pub ts: String,
    #[serde(flatten)]
    pub event: Event,
}

// ── EventLogger ──

/// Append-only JSONL event writer.
pub struct EventLogger {
    jsonl_path: PathBuf,
    seq: u32,
}

impl EventLogger {
    pub fn new(jsonl_path: impl Into<PathBuf>) -> Self {
        Self {
            jsonl_path: jsonl_path.into(),
            seq: 0,
        }
    }

    /// Record an event. Best-effort: a failed write is logged, never raised.
    pub fn record(&mut self, event: Event) {
        let full = FullEvent {
            seq: self.seq,
            ts: now_rfc3339(),
            event,
        };
        self.seq += 1;

        match serde_json::to_string(&full) {
            Ok(line) => {
                if let Err(e) = append_line(&self.jsonl_path, &line) {
                    tracing::debug!(error = %e, "event log write failed");
                }
            }
            Err(e) => tracing::debug!(error = %e, "event serialization failed"),
        }
    }
}

/// Append a single line to a file, creating parent dirs if needed.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
