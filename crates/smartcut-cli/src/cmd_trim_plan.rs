use anyhow::Context;
use smartcut_core::MappedConceptClip;
use smartcut_pipeline::trim_plan::{build_trim_plan, output_file_name, snippet_records};
use smartcut_store::{write_atomic, Artifact, SessionStore};
use std::path::Path;

/// Execute `smartcut trim-plan <session>`
pub fn execute(root: &Path, session: &str, out: Option<&Path>, snippets: bool) -> anyhow::Result<()> {
    let store = SessionStore::open(root, session);
    let clips: Vec<MappedConceptClip> = store.load(Artifact::MappedClips)?.with_context(|| {
        format!(
            "no mapped clips for session \"{session}\"; run `smartcut run` or `smartcut remap` first"
        )
    })?;

    let json = if snippets {
        serde_json::to_string_pretty(&snippet_records(&clips))?
    } else {
        let plan = build_trim_plan(&clips);
        for (i, video) in plan.video_outputs.iter().enumerate() {
            if video.source_segment_timestamps.is_empty() {
                tracing::warn!(title = %video.vid_title, "clip has no known timestamps; it will be skipped");
            } else {
                tracing::info!(file = %output_file_name(i, &video.vid_title), spans = video.source_segment_timestamps.len(), "planned output");
            }
        }
        serde_json::to_string_pretty(&plan)?
    };

    match out {
        Some(path) => {
            write_atomic(path, json.as_bytes())?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
