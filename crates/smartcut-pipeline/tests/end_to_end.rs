use smartcut_core::{RangeEntry, SegmentSpan, TimestampEntry, TranscriptLine};
use smartcut_oracle::{OracleClient, OracleError, RetryPolicy, ScriptedOracle};
use smartcut_pipeline::runner::{
    remap_session, run_pipeline, CollectStatus, PipelineContext, RunFailure, RunOptions,
    STATUS_FINISHED,
};
use smartcut_pipeline::state::{load_state, RunStatus, Stage, StageStatus};
use smartcut_pipeline::{PipelineConfig, StageError};
use smartcut_store::{Artifact, SessionStore};
use std::sync::Arc;

const SEGMENTING: &str = "lines per segment";
const CLEANSING: &str = "CUT so the remaining";
const CLUSTERING: &str = "AT LEAST";
const FINALIZING: &str = "Final quality check";

const CLIP: &str = r#"[{
    "merged_text": "Pricing starts from value. Then we test it.",
    "start": 0,
    "end": 12,
    "big_segments_used": ["seg_1", "seg_2"],
    "vid_title": "Value based pricing",
    "reasoning": "both segments build one argument"
}]"#;

fn lecture(n: usize) -> Vec<TranscriptLine> {
    (0..n)
        .map(|i| TranscriptLine {
            text: format!("pricing sentence {i}"),
            start_second: i as f64,
            end_second: i as f64 + 1.0,
        })
        .collect()
}

fn config(batches: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.segmentation.batches = batches;
    config.cleansing.batches = 1;
    config
}

fn happy_oracle() -> ScriptedOracle {
    let oracle = ScriptedOracle::new();
    oracle.route_text(SEGMENTING, "[4, 11]");
    oracle.route_text(CLEANSING, "[]");
    oracle.route_text(CLUSTERING, CLIP);
    oracle.route_text(FINALIZING, CLIP);
    oracle
}

struct Harness {
    _dir: tempfile::TempDir,
    store: SessionStore,
    status: CollectStatus,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path(), "lecture-1");
        Self {
            _dir: dir,
            store,
            status: CollectStatus::new(),
        }
    }

    async fn run(
        &self,
        oracle: Arc<ScriptedOracle>,
        config: &PipelineConfig,
        resume: bool,
    ) -> anyhow::Result<smartcut_pipeline::runner::RunReport> {
        let client = OracleClient::new(oracle).with_retry(RetryPolicy::immediate(1));
        let ctx = PipelineContext {
            session: "lecture-1",
            client: &client,
            store: &self.store,
            config,
            status: &self.status,
        };
        run_pipeline(&ctx, lecture(12), RunOptions { resume }).await
    }
}

#[tokio::test]
async fn full_run_writes_every_artifact() {
    let harness = Harness::new();
    let report = harness
        .run(Arc::new(happy_oracle()), &config(1), false)
        .await
        .unwrap();

    assert_eq!(report.status, STATUS_FINISHED);
    assert!(report.degraded_stages.is_empty());
    assert_eq!(report.clips.len(), 1);

    let clip = &report.clips[0];
    assert_eq!(clip.clip.vid_title, "Value based pricing");
    assert_eq!(
        clip.mapped_mini_segment_ranges,
        vec![
            RangeEntry::Known("0-4".parse().unwrap()),
            RangeEntry::Known("5-11".parse().unwrap()),
        ]
    );
    assert_eq!(
        clip.source_segment_timestamps,
        vec![
            TimestampEntry::Known(SegmentSpan {
                start: 0.0,
                end: 5.0
            }),
            TimestampEntry::Known(SegmentSpan {
                start: 5.0,
                end: 12.0
            }),
        ]
    );

    for artifact in Artifact::ALL {
        assert!(harness.store.exists(artifact), "{artifact:?} missing");
    }

    let statuses = harness.status.statuses();
    assert_eq!(statuses.first().map(String::as_str), Some("Processing: Segmenting"));
    assert_eq!(statuses.last().map(String::as_str), Some(STATUS_FINISHED));
    assert_eq!(statuses.len(), 7);

    let state = load_state(&harness.store).unwrap().unwrap();
    assert_eq!(state.run_status, RunStatus::Finished);
    assert_eq!(state.breakpoints, Some(vec![4, 11]));
    assert!(state.stages.iter().all(|s| s.status == StageStatus::Passed));

    let events = std::fs::read_to_string(harness.store.events_path()).unwrap();
    let last: serde_json::Value = serde_json::from_str(events.lines().last().unwrap()).unwrap();
    assert_eq!(last["type"], "run_finished");
    assert_eq!(last["clips"], 1);
}

#[tokio::test]
async fn resume_reuses_finished_stages() {
    let harness = Harness::new();
    harness
        .run(Arc::new(happy_oracle()), &config(1), false)
        .await
        .unwrap();

    let silent = Arc::new(ScriptedOracle::new());
    let report = harness.run(silent.clone(), &config(1), true).await.unwrap();

    assert!(silent.prompts().is_empty());
    assert_eq!(report.clips.len(), 1);
    assert_eq!(harness.status.statuses().last().map(String::as_str), Some(STATUS_FINISHED));
}

#[tokio::test]
async fn failed_segmentation_batch_degrades_the_stage() {
    let harness = Harness::new();
    let oracle = ScriptedOracle::new();
    oracle.route_text("[0] ", "[4]");
    oracle.route_error("[6] ", OracleError::Transport("connection reset".into()));
    oracle.route_text(CLEANSING, "[]");
    oracle.route_text(CLUSTERING, CLIP);
    oracle.route_text(FINALIZING, CLIP);

    let report = harness.run(Arc::new(oracle), &config(2), false).await.unwrap();

    assert_eq!(report.degraded_stages, vec![Stage::Segmenting]);
    let state = load_state(&harness.store).unwrap().unwrap();
    let segmenting = state.stage(Stage::Segmenting).unwrap();
    assert_eq!(segmenting.status, StageStatus::Degraded);
    assert_eq!(segmenting.failed_batches, vec![1]);
    assert_eq!(state.breakpoints, Some(vec![4, 11]));
}

#[tokio::test]
async fn unparseable_clusters_fail_the_run_and_keep_raw_output() {
    let harness = Harness::new();
    let oracle = ScriptedOracle::new();
    oracle.route_text(SEGMENTING, "[4, 11]");
    oracle.route_text(CLEANSING, "[]");
    oracle.route_text(CLUSTERING, "Sorry, I cannot group these.");

    let err = harness
        .run(Arc::new(oracle), &config(1), false)
        .await
        .unwrap_err();
    let failure = err.downcast_ref::<RunFailure>().unwrap();
    assert_eq!(failure.stage, Stage::Clustering);
    assert!(matches!(failure.source, StageError::Unparseable { .. }));
    assert!(failure.status.starts_with("Failed: "));
    assert!(failure.status.chars().count() <= 49);

    let raw = harness
        .store
        .dir()
        .join("4-conceptual_merges.json.ERROR.txt");
    assert_eq!(
        std::fs::read_to_string(raw).unwrap(),
        "Sorry, I cannot group these."
    );
    assert!(!harness.store.exists(Artifact::ConceptMerges));
    assert!(harness.store.exists(Artifact::Cleansed));

    let state = load_state(&harness.store).unwrap().unwrap();
    assert_eq!(state.run_status, RunStatus::Failed);
    assert_eq!(
        state.stage(Stage::Clustering).unwrap().status,
        StageStatus::Failed
    );
    assert_eq!(harness.status.statuses().last(), Some(&failure.status));
}

#[tokio::test]
async fn failed_rerun_leaves_no_clips_from_the_previous_run() {
    let harness = Harness::new();
    harness
        .run(Arc::new(happy_oracle()), &config(1), false)
        .await
        .unwrap();
    assert!(harness.store.exists(Artifact::MappedClips));

    let oracle = ScriptedOracle::new();
    oracle.route_text(SEGMENTING, "[0, 1, 11]");
    oracle.route_text(CLEANSING, "[]");
    oracle.route_text(CLUSTERING, "no clips today");
    let err = harness
        .run(Arc::new(oracle), &config(1), false)
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<RunFailure>().unwrap().stage,
        Stage::Clustering
    );

    assert!(harness.store.exists(Artifact::BigSegments));
    assert!(!harness.store.exists(Artifact::ConceptMerges));
    assert!(!harness.store.exists(Artifact::FinalClips));
    assert!(!harness.store.exists(Artifact::MappedClips));

    let state = load_state(&harness.store).unwrap().unwrap();
    assert_eq!(state.breakpoints, Some(vec![0, 1, 11]));
    assert_eq!(
        state.stage(Stage::Finalizing).unwrap().status,
        StageStatus::Pending
    );
    assert_eq!(
        state.stage(Stage::Remapping).unwrap().status,
        StageStatus::Pending
    );

    let refused = remap_session(&harness.store).unwrap_err();
    assert!(refused.to_string().contains("has not finished Finalizing"));
}

#[tokio::test]
async fn remap_session_rebuilds_a_finished_run() {
    let harness = Harness::new();
    let report = harness
        .run(Arc::new(happy_oracle()), &config(1), false)
        .await
        .unwrap();

    std::fs::remove_file(harness.store.path(Artifact::MappedClips)).unwrap();
    let remapped = remap_session(&harness.store).unwrap();
    assert_eq!(remapped, report.clips);
    assert!(harness.store.exists(Artifact::MappedClips));
}
