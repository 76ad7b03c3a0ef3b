use crate::state::machine::RunState;
use anyhow::{Context, Result};
use smartcut_store::SessionStore;

/// Load run state. Returns None if the session has never run.
pub fn load_state(store: &SessionStore) -> Result<Option<RunState>> {
    let path = store.state_path();
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading state: {}", path.display()))?;
    let state: RunState = serde_json::from_str(&content)
        .with_context(|| format!("parsing state: {}", path.display()))?;
    Ok(Some(state))
}

/// Save state atomically.
pub fn save_state(store: &SessionStore, state: &RunState) -> Result<()> {
    let path = store.state_path();
    let data = serde_json::to_string_pretty(state)?;
    smartcut_store::write_atomic(&path, data.as_bytes())
        .with_context(|| format!("saving state: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path(), "missing");
        assert!(load_state(&store).unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path(), "s1");
        let mut state = RunState::new("s1");
        state.breakpoints = Some(vec![4, 11]);

        save_state(&store, &state).unwrap();
        let loaded = load_state(&store).unwrap().unwrap();
        assert_eq!(loaded.session, "s1");
        assert_eq!(loaded.stages.len(), 6);
        assert_eq!(loaded.breakpoints, Some(vec![4, 11]));
    }

    #[test]
    fn save_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path(), "s1");
        let mut state = RunState::new("s1");

        save_state(&store, &state).unwrap();
        state.version = 42;
        save_state(&store, &state).unwrap();

        assert_eq!(load_state(&store).unwrap().unwrap().version, 42);
    }
}
