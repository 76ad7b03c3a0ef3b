use anyhow::Context;
use smartcut_pipeline::ingest::load_transcript;
use smartcut_pipeline::runner::{run_pipeline, PipelineContext, RunOptions, StdoutStatus};
use smartcut_store::SessionStore;
use std::path::Path;

pub struct RunParams<'a> {
    pub root: &'a Path,
    pub transcript: &'a Path,
    pub session: Option<&'a str>,
    pub config: Option<&'a Path>,
    pub resume: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Execute `smartcut run <transcript>`
pub fn execute(params: RunParams<'_>) -> anyhow::Result<()> {
    let mut config = crate::cmd_config::load(params.config)?;
    if let Some(model) = params.model {
        config.oracle.model = model;
    }
    if let Some(base_url) = params.base_url {
        config.oracle.base_url = base_url;
    }
    config.validate()?;

    let session = match params.session {
        Some(s) => s.to_string(),
        None => session_from_path(params.transcript)?,
    };
    let lines = load_transcript(params.transcript)?;
    let store = SessionStore::open(params.root, &session);
    let client = config.oracle.build_client()?;

    println!(
        "Session \"{session}\": {} lines -> {}",
        lines.len(),
        store.dir().display()
    );

    let status = StdoutStatus;
    let ctx = PipelineContext {
        session: &session,
        client: &client,
        store: &store,
        config: &config,
        status: &status,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(run_pipeline(
        &ctx,
        lines,
        RunOptions {
            resume: params.resume,
        },
    ))?;

    println!("\n{} clip(s):", report.clips.len());
    for (i, clip) in report.clips.iter().enumerate() {
        println!(
            "  {}. {} ({:.0}s-{:.0}s, {} segments)",
            i + 1,
            clip.clip.vid_title,
            clip.clip.start,
            clip.clip.end,
            clip.clip.big_segments_used.len()
        );
    }
    if !report.degraded_stages.is_empty() {
        let names: Vec<String> = report.degraded_stages.iter().map(|s| s.to_string()).collect();
        println!("Degraded stages: {}", names.join(", "));
    }
    Ok(())
}

fn session_from_path(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a session name from {}", path.display()))
}
