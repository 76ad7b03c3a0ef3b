use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use smartcut_store::Artifact;
use std::fmt;

// ── Stages ──

/// The pipeline's stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Segmenting,
    Merging,
    Cleansing,
    Clustering,
    Finalizing,
    Remapping,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Segmenting,
        Stage::Merging,
        Stage::Cleansing,
        Stage::Clustering,
        Stage::Finalizing,
        Stage::Remapping,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Segmenting => "Segmenting",
            Stage::Merging => "Merging",
            Stage::Cleansing => "Cleansing",
            Stage::Clustering => "Clustering",
            Stage::Finalizing => "Finalizing",
            Stage::Remapping => "Remapping",
        }
    }

    /// Artifacts a stage writes; all must exist for the stage to be resumable.
    pub fn artifacts(self) -> &'static [Artifact] {
        match self {
            Stage::Segmenting => &[Artifact::MiniUnits],
            Stage::Merging => &[Artifact::BigSegments, Artifact::RangeMap],
            Stage::Cleansing => &[Artifact::Removals, Artifact::Cleansed],
            Stage::Clustering => &[Artifact::ConceptMerges],
            Stage::Finalizing => &[Artifact::FinalClips],
            Stage::Remapping => &[Artifact::MappedClips],
        }
    }

    /// Stages that run after this one.
    pub fn later(self) -> &'static [Stage] {
        let index = Stage::ALL.iter().position(|s| *s == self).unwrap_or(0);
        &Stage::ALL[index + 1..]
    }

    /// Job-status string while the stage runs.
    pub fn status_line(self) -> String {
        format!("Processing: {}", self.name())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Status enums ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Passed,
    /// Finished on partial oracle signal.
    Degraded,
    Failed,
}

impl StageStatus {
    /// Output is usable downstream.
    pub fn is_done(self) -> bool {
        matches!(self, StageStatus::Passed | StageStatus::Degraded)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

// ── State types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub session: String,
    /// Job-status string as surfaced to the persistence layer.
    pub status: String,
    pub run_status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub stages: Vec<StageState>,
    /// Segmentation output, needed to resume the merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Vec<u32>>,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageState {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_batches: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Valid transitions ──

const VALID_TRANSITIONS: &[(StageStatus, &[StageStatus])] = &[
    (StageStatus::Pending, &[StageStatus::Running]),
    (
        StageStatus::Running,
        &[
            StageStatus::Passed,
            StageStatus::Degraded,
            StageStatus::Failed,
        ],
    ),
    // rerun
    (StageStatus::Failed, &[StageStatus::Running]),
    (StageStatus::Passed, &[StageStatus::Running]),
    (StageStatus::Degraded, &[StageStatus::Running]),
];

fn is_valid_transition(from: StageStatus, to: StageStatus) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

// ── Side effects ──

/// Optional side-effect data applied during a transition.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub failed_batches: Option<Vec<usize>>,
    pub error: Option<Option<String>>,
}

impl StageUpdate {
    pub fn apply(self, stage: &mut StageState) {
        if let Some(v) = self.started_at {
            stage.started_at = Some(v);
        }
        if let Some(v) = self.completed_at {
            stage.completed_at = Some(v);
        }
        if let Some(v) = self.failed_batches {
            stage.failed_batches = v;
        }
        if let Some(v) = self.error {
            stage.error = v;
        }
    }
}

/// Move `stage` to `to`, applying side effects. Errors on a transition the
/// table does not allow.
pub fn transition(
    state: &mut RunState,
    stage: Stage,
    to: StageStatus,
    side_effect: Option<StageUpdate>,
) -> Result<()> {
    let entry = state.stage_mut(stage)?;
    if !is_valid_transition(entry.status, to) {
        bail!("invalid transition: {stage} {:?} → {to:?}", entry.status);
    }
    entry.status = to;
    if let Some(update) = side_effect {
        update.apply(entry);
    }
    state.version += 1;
    Ok(())
}

// ── RunState methods ──

impl RunState {
    pub fn new(session: &str) -> Self {
        RunState {
            session: session.to_string(),
            status: "Pending".into(),
            run_status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            stages: Stage::ALL
                .iter()
                .map(|&stage| StageState {
                    stage,
                    status: StageStatus::Pending,
                    started_at: None,
                    completed_at: None,
                    failed_batches: Vec::new(),
                    error: None,
                })
                .collect(),
            breakpoints: None,
            version: 0,
        }
    }

    pub fn stage(&self, stage: Stage) -> Result<&StageState> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .ok_or_else(|| anyhow::anyhow!("stage not found: {stage}"))
    }

    pub fn stage_mut(&mut self, stage: Stage) -> Result<&mut StageState> {
        self.stages
            .iter_mut()
            .find(|s| s.stage == stage)
            .ok_or_else(|| anyhow::anyhow!("stage not found: {stage}"))
    }

    /// Send every stage after `stage` back to pending, forgetting its
    /// timestamps and errors. Their outputs no longer match what comes first.
    pub fn reset_after(&mut self, stage: Stage) {
        let later = stage.later();
        let mut touched = false;
        for entry in self.stages.iter_mut().filter(|s| later.contains(&s.stage)) {
            if entry.status != StageStatus::Pending {
                touched = true;
            }
            entry.status = StageStatus::Pending;
            entry.started_at = None;
            entry.completed_at = None;
            entry.failed_batches.clear();
            entry.error = None;
        }
        if touched {
            self.version += 1;
        }
    }

    pub fn degraded_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|s| s.status == StageStatus::Degraded)
            .map(|s| s.stage)
            .collect()
    }
}
