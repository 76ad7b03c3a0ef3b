use smartcut_pipeline::state::{load_state, StageStatus};
use smartcut_store::SessionStore;
use std::path::Path;

/// Execute `smartcut status <session>`
pub fn execute(root: &Path, session: &str, json: bool) -> anyhow::Result<()> {
    let store = SessionStore::open(root, session);
    let Some(state) = load_state(&store)? else {
        println!("No state found for session \"{session}\".");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("Session: {}", state.session);
    println!("Status:  {}", state.status);
    if let Some(started) = &state.started_at {
        println!("Started: {started}");
    }
    if let Some(completed) = &state.completed_at {
        println!("Ended:   {completed}");
    }
    println!();
    for s in &state.stages {
        let icon = match s.status {
            StageStatus::Passed => "✓",
            StageStatus::Degraded => "~",
            StageStatus::Failed => "✗",
            StageStatus::Running => "▶",
            StageStatus::Pending => "·",
        };
        let mut line = format!("  {icon} {:<11} {:?}", s.stage.name(), s.status);
        if !s.failed_batches.is_empty() {
            line.push_str(&format!(" (failed batches: {:?})", s.failed_batches));
        }
        println!("{line}");
        if let Some(err) = &s.error {
            println!("      {err}");
        }
    }
    Ok(())
}
