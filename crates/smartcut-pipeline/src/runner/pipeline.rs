use crate::config::PipelineConfig;
use crate::outcome::{StageError, StageOutcome};
use crate::runner::event_log::{now_rfc3339, Event, EventLogger};
use crate::runner::status::StatusSink;
use crate::stages::{self, audit};
use crate::state::machine::{transition, StageStatus, StageUpdate};
use crate::state::{load_state, save_state, RunState, RunStatus, Stage};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use smartcut_core::text::truncate_chars;
use smartcut_core::{
    assign_mini_ids, BigSegment, ConceptClip, MappedConceptClip, MiniUnit, RangeMap,
    RemovalRecord, TranscriptLine,
};
use smartcut_oracle::OracleClient;
use smartcut_store::{Artifact, SessionStore};
use std::future::Future;
use std::time::Instant;

/// Job status once every stage has run.
pub const STATUS_FINISHED: &str = "Finished";

/// Failure statuses are cut to this many characters to fit the job table.
const STATUS_MAX_CHARS: usize = 49;

/// Everything a run needs besides its input.
pub struct PipelineContext<'a> {
    pub session: &'a str,
    pub client: &'a OracleClient,
    pub store: &'a SessionStore,
    pub config: &'a PipelineConfig,
    pub status: &'a dyn StatusSink,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Reuse artifacts of stages that already finished in an earlier run.
    pub resume: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub session: String,
    pub clips: Vec<MappedConceptClip>,
    pub degraded_stages: Vec<Stage>,
    pub status: String,
}

/// A stage reported a fatal error. State and status are already persisted.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct RunFailure {
    pub stage: Stage,
    pub status: String,
    #[source]
    pub source: StageError,
}

/// Value produced by one stage, plus what goes into the event log.
struct Step<T> {
    value: T,
    items: usize,
    failed_batches: Vec<usize>,
}

impl<T> Step<T> {
    fn complete(value: T, items: usize) -> Self {
        Self {
            value,
            items,
            failed_batches: Vec::new(),
        }
    }

    fn from_outcome(outcome: StageOutcome<T>, items: impl Fn(&T) -> usize) -> Self {
        let failed_batches = outcome.failed_batches().to_vec();
        let value = outcome.into_value();
        Self {
            items: items(&value),
            value,
            failed_batches,
        }
    }
}

/// Run every stage in order: segment, merge, cleanse, cluster, finalize, remap.
///
/// Each stage persists its artifacts before the next begins. With
/// `resume`, stages that already finished are loaded from disk until the
/// first one that has to run again; everything after it reruns too.
pub async fn run_pipeline(
    ctx: &PipelineContext<'_>,
    lines: Vec<TranscriptLine>,
    options: RunOptions,
) -> Result<RunReport> {
    let _lock = ctx.store.lock()?;

    let state = if options.resume {
        load_state(ctx.store)?.unwrap_or_else(|| RunState::new(ctx.session))
    } else {
        RunState::new(ctx.session)
    };
    let mut run = Run {
        ctx,
        state,
        events: EventLogger::new(ctx.store.events_path()),
        resume: options.resume,
    };
    run.start(lines.len()).await?;
    let config = ctx.config;

    // 1. Segmenting
    let (units, breakpoints) = match run.resume_segmenting()? {
        Some(resumed) => resumed,
        None => {
            let units = assign_mini_ids(lines);
            let breakpoints = run
                .stage(Stage::Segmenting, async {
                    ctx.store.save(Artifact::MiniUnits, &units)?;
                    let outcome =
                        stages::plan_breakpoints(ctx.client, &units, &config.segmentation).await?;
                    Ok::<_, StageError>(Step::from_outcome(outcome, |b: &Vec<u32>| b.len()))
                })
                .await?;
            run.state.breakpoints = Some(breakpoints.clone());
            save_state(ctx.store, &run.state)?;
            (units, breakpoints)
        }
    };

    // 2. Merging
    let (segments, ranges): (Vec<BigSegment>, RangeMap) = if run.resumable(Stage::Merging) {
        run.note_resumed(Stage::Merging);
        (
            load_required(ctx.store, Artifact::BigSegments)?,
            load_required(ctx.store, Artifact::RangeMap)?,
        )
    } else {
        run.stage(Stage::Merging, async {
            let segments = stages::merge_segments(&units, &breakpoints);
            let ranges = stages::range_map(&segments);
            ctx.store.save(Artifact::BigSegments, &segments)?;
            ctx.store.save(Artifact::RangeMap, &ranges)?;
            let items = segments.len();
            Ok::<_, StageError>(Step::complete((segments, ranges), items))
        })
        .await?
    };

    // 3. Cleansing
    let cleansed: Vec<BigSegment> = if run.resumable(Stage::Cleansing) {
        run.note_resumed(Stage::Cleansing);
        load_required(ctx.store, Artifact::Cleansed)?
    } else {
        run.stage(Stage::Cleansing, async {
            let outcome =
                stages::plan_removals(ctx.client, &segments, config.cleansing.batches).await;
            let failed_batches = outcome.failed_batches().to_vec();
            let removals: Vec<RemovalRecord> = outcome.into_value();
            let cleansed = stages::apply_removals(&segments, &removals);
            ctx.store.save(Artifact::Removals, &removals)?;
            ctx.store.save(Artifact::Cleansed, &cleansed)?;
            tracing::info!(
                kept = cleansed.len(),
                removed = removals.len(),
                "segments cleansed"
            );
            Ok::<_, StageError>(Step {
                items: cleansed.len(),
                value: cleansed,
                failed_batches,
            })
        })
        .await?
    };

    // 4. Clustering (pass A)
    let clusters: Vec<ConceptClip> = if run.resumable(Stage::Clustering) {
        run.note_resumed(Stage::Clustering);
        load_required(ctx.store, Artifact::ConceptMerges)?
    } else {
        run.stage(Stage::Clustering, async {
            let clusters =
                stages::cluster_concepts(ctx.client, &cleansed, &config.concept).await?;
            ctx.store.save(Artifact::ConceptMerges, &clusters)?;
            audit::log_findings(&clusters, &cleansed, &config.concept);
            let items = clusters.len();
            Ok::<_, StageError>(Step::complete(clusters, items))
        })
        .await?
    };

    // 5. Finalizing (pass B)
    let finals: Vec<ConceptClip> = if run.resumable(Stage::Finalizing) {
        run.note_resumed(Stage::Finalizing);
        load_required(ctx.store, Artifact::FinalClips)?
    } else {
        run.stage(Stage::Finalizing, async {
            let finals = stages::finalize_concepts(ctx.client, &clusters).await?;
            ctx.store.save(Artifact::FinalClips, &finals)?;
            let items = finals.len();
            Ok::<_, StageError>(Step::complete(finals, items))
        })
        .await?
    };

    // 6. Remapping
    let clips: Vec<MappedConceptClip> = if run.resumable(Stage::Remapping) {
        run.note_resumed(Stage::Remapping);
        load_required(ctx.store, Artifact::MappedClips)?
    } else {
        run.stage(Stage::Remapping, async {
            let mapped = stages::remap_clips(&finals, &ranges, &segments);
            ctx.store.save(Artifact::MappedClips, &mapped)?;
            let items = mapped.len();
            Ok::<_, StageError>(Step::complete(mapped, items))
        })
        .await?
    };

    run.finish(clips).await
}

struct Run<'c, 'a> {
    ctx: &'c PipelineContext<'a>,
    state: RunState,
    events: EventLogger,
    resume: bool,
}

impl Run<'_, '_> {
    async fn start(&mut self, units: usize) -> Result<()> {
        if self.state.started_at.is_none() || !self.resume {
            self.state.started_at = Some(now_rfc3339());
        }
        // A stage left running by a crashed run starts over.
        for entry in &mut self.state.stages {
            if entry.status == StageStatus::Running {
                tracing::warn!(stage = %entry.stage, "stage was interrupted; resetting");
                entry.status = StageStatus::Pending;
            }
        }
        self.state.run_status = RunStatus::Running;
        self.state.completed_at = None;
        save_state(self.ctx.store, &self.state)?;
        self.events.record(Event::RunStart {
            session: self.ctx.session.to_string(),
            units,
        });
        tracing::info!(session = self.ctx.session, units, resume = self.resume, "pipeline started");
        Ok(())
    }

    /// Finished in an earlier run with every artifact still on disk. Turns
    /// false for good once any stage has to execute.
    fn resumable(&self, stage: Stage) -> bool {
        self.resume
            && self
                .state
                .stage(stage)
                .map(|s| s.status.is_done())
                .unwrap_or(false)
            && stage.artifacts().iter().all(|a| self.ctx.store.exists(*a))
    }

    fn resume_segmenting(&mut self) -> Result<Option<(Vec<MiniUnit>, Vec<u32>)>> {
        if !self.resumable(Stage::Segmenting) {
            return Ok(None);
        }
        let Some(breakpoints) = self.state.breakpoints.clone() else {
            self.resume = false;
            return Ok(None);
        };
        self.note_resumed(Stage::Segmenting);
        Ok(Some((load_required(self.ctx.store, Artifact::MiniUnits)?, breakpoints)))
    }

    fn note_resumed(&mut self, stage: Stage) {
        tracing::info!(%stage, "reusing artifacts from earlier run");
        self.events.record(Event::StageResumed {
            stage: stage.to_string(),
        });
    }

    async fn set_status(&mut self, status: String) -> Result<()> {
        self.ctx.status.update(self.ctx.session, &status).await;
        self.state.status = status;
        save_state(self.ctx.store, &self.state)
    }

    /// Run one stage body, recording its transitions, status, and events.
    async fn stage<T, F>(&mut self, stage: Stage, body: F) -> Result<T>
    where
        F: Future<Output = Result<Step<T>, StageError>>,
    {
        // Anything after a rerun stage depends on fresh output.
        self.resume = false;
        self.discard_outputs_from(stage)?;

        transition(
            &mut self.state,
            stage,
            StageStatus::Running,
            Some(StageUpdate {
                started_at: Some(now_rfc3339()),
                failed_batches: Some(Vec::new()),
                error: Some(None),
                ..Default::default()
            }),
        )?;
        self.set_status(stage.status_line()).await?;
        self.events.record(Event::StageStart {
            stage: stage.to_string(),
        });
        tracing::info!(%stage, "stage started");
        let started = Instant::now();

        match body.await {
            Ok(step) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let degraded = !step.failed_batches.is_empty();
                let to = if degraded {
                    StageStatus::Degraded
                } else {
                    StageStatus::Passed
                };
                transition(
                    &mut self.state,
                    stage,
                    to,
                    Some(StageUpdate {
                        completed_at: Some(now_rfc3339()),
                        failed_batches: Some(step.failed_batches.clone()),
                        ..Default::default()
                    }),
                )?;
                save_state(self.ctx.store, &self.state)?;
                if degraded {
                    tracing::warn!(%stage, failed_batches = ?step.failed_batches, "stage finished on partial signal");
                    self.events.record(Event::StageDegraded {
                        stage: stage.to_string(),
                        duration_ms,
                        items: step.items,
                        failed_batches: step.failed_batches,
                    });
                } else {
                    tracing::info!(%stage, items = step.items, duration_ms, "stage passed");
                    self.events.record(Event::StagePassed {
                        stage: stage.to_string(),
                        duration_ms,
                        items: step.items,
                    });
                }
                Ok(step.value)
            }
            Err(err) => Err(self.fail(stage, started, err).await),
        }
    }

    /// Drop what `stage` and every later stage produced before, on disk and
    /// in the run state, so a failure here cannot leave older clips behind.
    fn discard_outputs_from(&mut self, stage: Stage) -> Result<()> {
        for s in std::iter::once(stage).chain(stage.later().iter().copied()) {
            for artifact in s.artifacts() {
                self.ctx.store.remove(*artifact)?;
            }
        }
        self.state.reset_after(stage);
        if stage == Stage::Segmenting {
            self.state.breakpoints = None;
        }
        Ok(())
    }

    async fn fail(&mut self, stage: Stage, started: Instant, err: StageError) -> anyhow::Error {
        tracing::error!(%stage, error = %err, "stage failed");
        let mut raw_output = None;
        if let (Some(raw), Some(&artifact)) = (err.raw_output(), stage.artifacts().first()) {
            match self.ctx.store.save_error_text(artifact, raw) {
                Ok(path) => raw_output = Some(path.display().to_string()),
                Err(e) => tracing::error!(error = %e, "could not preserve raw oracle output"),
            }
        }

        let message = err.to_string();
        let status = truncate_chars(&format!("Failed: {message}"), STATUS_MAX_CHARS).to_string();
        let recorded = transition(
            &mut self.state,
            stage,
            StageStatus::Failed,
            Some(StageUpdate {
                completed_at: Some(now_rfc3339()),
                error: Some(Some(message.clone())),
                ..Default::default()
            }),
        );
        if let Err(e) = recorded {
            tracing::error!(error = %e, "could not record stage failure");
        }
        self.state.run_status = RunStatus::Failed;
        self.state.completed_at = Some(now_rfc3339());
        if let Err(e) = self.set_status(status.clone()).await {
            tracing::error!(error = %e, "could not persist failure status");
        }

        self.events.record(Event::StageFailed {
            stage: stage.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            error: message.clone(),
            raw_output,
        });
        self.events.record(Event::RunFailed {
            stage: stage.to_string(),
            error: message,
        });
        RunFailure {
            stage,
            status,
            source: err,
        }
        .into()
    }

    async fn finish(mut self, clips: Vec<MappedConceptClip>) -> Result<RunReport> {
        self.state.run_status = RunStatus::Finished;
        self.state.completed_at = Some(now_rfc3339());
        self.set_status(STATUS_FINISHED.to_string()).await?;

        let degraded_stages = self.state.degraded_stages();
        self.events.record(Event::RunFinished {
            clips: clips.len(),
            degraded_stages: degraded_stages.iter().map(|s| s.to_string()).collect(),
        });
        tracing::info!(clips = clips.len(), degraded = degraded_stages.len(), "pipeline finished");
        Ok(RunReport {
            session: self.ctx.session.to_string(),
            clips,
            degraded_stages,
            status: STATUS_FINISHED.to_string(),
        })
    }
}

/// Recompute the terminal artifact from the stored merge and final-clip
/// artifacts, without calling the oracle. Refused unless the last run got
/// through finalizing, so clips and segments come from the same run.
pub fn remap_session(store: &SessionStore) -> Result<Vec<MappedConceptClip>> {
    let state = load_state(store)?
        .with_context(|| format!("no run state in {}", store.dir().display()))?;
    let finalizing = state.stage(Stage::Finalizing)?;
    if !finalizing.status.is_done() {
        anyhow::bail!(
            "session {} has not finished {} (status: {:?})",
            state.session,
            Stage::Finalizing,
            finalizing.status
        );
    }
    let segments: Vec<BigSegment> = load_required(store, Artifact::BigSegments)?;
    let ranges: RangeMap = load_required(store, Artifact::RangeMap)?;
    let finals: Vec<ConceptClip> = load_required(store, Artifact::FinalClips)?;

    let mapped = stages::remap_clips(&finals, &ranges, &segments);
    store.save(Artifact::MappedClips, &mapped)?;
    Ok(mapped)
}

fn load_required<T: DeserializeOwned>(store: &SessionStore, artifact: Artifact) -> Result<T> {
    store
        .load(artifact)?
        .with_context(|| format!("missing {}", store.path(artifact).display()))
}
