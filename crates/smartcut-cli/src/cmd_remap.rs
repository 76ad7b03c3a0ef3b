use smartcut_core::RangeEntry;
use smartcut_pipeline::runner::remap_session;
use smartcut_store::{Artifact, SessionStore};
use std::path::Path;

/// Execute `smartcut remap <session>`
pub fn execute(root: &Path, session: &str) -> anyhow::Result<()> {
    let store = SessionStore::open(root, session);
    let _lock = store.lock()?;
    let clips = remap_session(&store)?;

    let unknown = clips
        .iter()
        .flat_map(|c| &c.mapped_mini_segment_ranges)
        .filter(|r| matches!(r, RangeEntry::Unknown))
        .count();
    println!(
        "Remapped {} clip(s) -> {}",
        clips.len(),
        store.path(Artifact::MappedClips).display()
    );
    if unknown > 0 {
        println!("  {unknown} segment reference(s) could not be resolved");
    }
    Ok(())
}
