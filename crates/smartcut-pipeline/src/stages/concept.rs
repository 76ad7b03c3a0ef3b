use crate::config::ConceptPolicy;
use crate::outcome::StageError;
use crate::stages::prompts;
use serde_json::Value;
use smartcut_core::extract;
use smartcut_core::{BigSegment, ConceptClip};
use smartcut_oracle::OracleClient;

const CLUSTER: &str = "concept clustering";
const FINALIZE: &str = "concept finalizing";

/// Both passes of the concept stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptResult {
    /// Pass A output.
    pub clusters: Vec<ConceptClip>,
    /// Pass B output: the clusters judged self-contained.
    pub finals: Vec<ConceptClip>,
}

/// Pass A: one call over the whole cleansed list, grouping segments into clips.
///
/// No cleansed segments means no clips and no oracle call. Any oracle or
/// extraction failure is fatal; the raw reply travels in
/// [`StageError::Unparseable`].
pub async fn cluster_concepts(
    client: &OracleClient,
    segments: &[BigSegment],
    policy: &ConceptPolicy,
) -> Result<Vec<ConceptClip>, StageError> {
    if segments.is_empty() {
        tracing::warn!("no cleansed segments; skipping concept clustering");
        return Ok(Vec::new());
    }
    let payload = serde_json::to_string_pretty(segments)?;
    let prompt = prompts::cluster(&payload, policy);
    tracing::info!(
        segments = segments.len(),
        min_group = policy.min_group,
        max_group = policy.max_group,
        "clustering concepts"
    );

    let clips = ask_for_clips(client, CLUSTER, &prompt).await?;
    tracing::info!(clips = clips.len(), "concept clusters formed");
    Ok(clips)
}

/// Pass B: drop clips that are not self-contained. Empty in, empty out.
pub async fn finalize_concepts(
    client: &OracleClient,
    clips: &[ConceptClip],
) -> Result<Vec<ConceptClip>, StageError> {
    if clips.is_empty() {
        return Ok(Vec::new());
    }
    let payload = serde_json::to_string_pretty(clips)?;
    let kept = ask_for_clips(client, FINALIZE, &prompts::finalize(&payload)).await?;
    tracing::info!(submitted = clips.len(), kept = kept.len(), "concept clips finalized");
    Ok(kept)
}

/// Pass A then pass B. An empty pass A result ends the stage successfully
/// with both lists empty.
pub async fn run_concept_stage(
    client: &OracleClient,
    segments: &[BigSegment],
    policy: &ConceptPolicy,
) -> Result<ConceptResult, StageError> {
    let clusters = cluster_concepts(client, segments, policy).await?;
    let finals = finalize_concepts(client, &clusters).await?;
    Ok(ConceptResult { clusters, finals })
}

async fn ask_for_clips(
    client: &OracleClient,
    stage: &'static str,
    prompt: &str,
) -> Result<Vec<ConceptClip>, StageError> {
    let raw = client
        .invoke(prompt)
        .await
        .map_err(|source| StageError::Oracle { stage, source })?;
    parse_clips(stage, &raw)
}

/// The array itself must decode; elements that are not clip objects are
/// dropped with a warning.
fn parse_clips(stage: &'static str, raw: &str) -> Result<Vec<ConceptClip>, StageError> {
    let items = extract::decode_outermost(raw).map_err(|e| StageError::Unparseable {
        stage,
        detail: e.to_string(),
        raw: raw.to_string(),
    })?;
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| clip_from_value(stage, index, item))
        .collect())
}

fn clip_from_value(stage: &str, index: usize, item: Value) -> Option<ConceptClip> {
    if !item.is_object() {
        tracing::warn!(stage, index, "dropping non-object clip");
        return None;
    }
    match serde_json::from_value(item) {
        Ok(clip) => Some(clip),
        Err(e) => {
            tracing::warn!(stage, index, error = %e, "dropping malformed clip");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcut_core::{SegmentId, SegmentRef};
    use smartcut_oracle::{OracleError, RetryPolicy, ScriptedOracle};
    use std::sync::Arc;

    fn seg(n: u32) -> BigSegment {
        BigSegment {
            id: SegmentId::new(n),
            text: format!("text of {n}"),
            start: n as f64 * 10.0,
            end: n as f64 * 10.0 + 9.0,
            mini_segments_used: vec![n],
        }
    }

    fn client(oracle: Arc<ScriptedOracle>) -> OracleClient {
        OracleClient::new(oracle).with_retry(RetryPolicy::immediate(1))
    }

    const ONE_CLIP: &str = r#"Here is the result:
```json
[{"merged_text": "text of 1 text of 3", "start": 10, "end": 39,
  "big_segments_used": ["seg_1", "seg_3"], "vid_title": "Pricing basics",
  "reasoning": "seg_2 is a tangent"}]
```"#;

    #[test]
    fn parse_drops_bad_elements_only() {
        let clips = parse_clips(
            CLUSTER,
            r#"[{"big_segments_used": ["seg_1"], "vid_title": "A"}, 42, {"start": "soon"}]"#,
        )
        .unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].vid_title, "A");
    }

    #[test]
    fn parse_without_array_keeps_raw() {
        let err = parse_clips(FINALIZE, "I could not find any concepts.").unwrap_err();
        assert_eq!(err.raw_output(), Some("I could not find any concepts."));
    }

    #[tokio::test]
    async fn both_passes_run_in_order() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_text(ONE_CLIP);
        oracle.push_text(ONE_CLIP);
        let segments = vec![seg(1), seg(2), seg(3)];

        let result = run_concept_stage(&client(oracle.clone()), &segments, &ConceptPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.finals, result.clusters);
        let clip = &result.finals[0];
        assert_eq!(
            clip.big_segments_used,
            vec![SegmentRef::new("seg_1"), SegmentRef::new("seg_3")]
        );
        assert_eq!(clip.start, 10.0);

        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("\"text of 2\""));
        assert!(prompts[0].contains("between 6 and 8 segments"));
        assert!(prompts[1].contains("Pricing basics"));
    }

    #[tokio::test]
    async fn empty_pass_a_skips_pass_b() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_text("[]");
        let result = run_concept_stage(&client(oracle.clone()), &[seg(1)], &ConceptPolicy::default())
            .await
            .unwrap();
        assert_eq!(result, ConceptResult::default());
        assert_eq!(oracle.prompts().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let oracle = Arc::new(ScriptedOracle::new());
        let result = run_concept_stage(&client(oracle.clone()), &[], &ConceptPolicy::default())
            .await
            .unwrap();
        assert!(result.clusters.is_empty() && result.finals.is_empty());
        assert!(oracle.prompts().is_empty());
    }

    #[tokio::test]
    async fn oracle_exhaustion_is_fatal() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_error(OracleError::Transport("down".into()));
        let err = cluster_concepts(&client(oracle), &[seg(1)], &ConceptPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Oracle { stage: CLUSTER, .. }));
    }
}
