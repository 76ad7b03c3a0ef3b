use anyhow::Context;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Return the per-user store root: `<data dir>/smartcut/`
/// Falls back to `~/.smartcut/`, then to `./.smartcut-store/`.
pub fn store_root() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("smartcut")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".smartcut")
    } else {
        PathBuf::from(".smartcut-store")
    }
}

/// Directory holding every artifact of one processing session:
/// `root/sessions/<session>/`
pub fn session_dir(root: &Path, session: &str) -> PathBuf {
    root.join("sessions").join(session)
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// File-based exclusive lock guard. Released on drop.
pub struct LockGuard {
    _file: fs::File,
}

/// Try to take an exclusive lock without blocking. Creates the lock file if needed.
pub fn try_lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive()
        .with_context(|| format!("{} is held by another run", path.display()))?;
    Ok(LockGuard { _file: file })
}

// ── Artifacts ──

/// The numbered stage outputs of one session, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    MiniUnits,
    BigSegments,
    RangeMap,
    Removals,
    Cleansed,
    ConceptMerges,
    FinalClips,
    MappedClips,
}

impl Artifact {
    pub const ALL: [Artifact; 8] = [
        Artifact::MiniUnits,
        Artifact::BigSegments,
        Artifact::RangeMap,
        Artifact::Removals,
        Artifact::Cleansed,
        Artifact::ConceptMerges,
        Artifact::FinalClips,
        Artifact::MappedClips,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::MiniUnits => "1-mini_segments_with_ids.json",
            Artifact::BigSegments => "2-merged_input_segments.json",
            Artifact::RangeMap => "2a-merged_input_mapping.json",
            Artifact::Removals => "removed_segments.json",
            Artifact::Cleansed => "2b-merged_input_segments_cleared.json",
            Artifact::ConceptMerges => "4-conceptual_merges.json",
            Artifact::FinalClips => "5-final_results.json",
            Artifact::MappedClips => "6-final_results_mapped.json",
        }
    }
}

/// Artifact access rooted at one session directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store for `session` under `root/sessions/`.
    pub fn open(root: &Path, session: &str) -> Self {
        Self::new(session_dir(root, session))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    /// Run state: `{dir}/state.json`
    pub fn state_path(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    /// Append-only event log: `{dir}/events.jsonl`
    pub fn events_path(&self) -> PathBuf {
        self.dir.join("events.jsonl")
    }

    pub fn lock(&self) -> anyhow::Result<LockGuard> {
        try_lock_file(&self.dir.join(".run.lock"))
    }

    pub fn save<T: Serialize + ?Sized>(&self, artifact: Artifact, value: &T) -> anyhow::Result<()> {
        let path = self.path(artifact);
        write_json(&path, value)?;
        tracing::debug!(path = %path.display(), "artifact saved");
        Ok(())
    }

    /// Load an artifact. Returns None if the file doesn't exist.
    pub fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> anyhow::Result<Option<T>> {
        read_json(&self.path(artifact))
    }

    /// Delete an artifact and any raw output preserved next to it. Missing
    /// files are fine.
    pub fn remove(&self, artifact: Artifact) -> anyhow::Result<()> {
        for path in [self.path(artifact), self.error_text_path(artifact)] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "artifact removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("removing {}", path.display()));
                }
            }
        }
        Ok(())
    }

    fn error_text_path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(format!("{}.ERROR.txt", artifact.file_name()))
    }

    /// Preserve a raw oracle response that could not be parsed, next to the
    /// artifact it was meant to produce: `<artifact>.ERROR.txt`.
    pub fn save_error_text(&self, artifact: Artifact, raw: &str) -> anyhow::Result<PathBuf> {
        let path = self.error_text_path(artifact);
        write_atomic(&path, raw.as_bytes())
            .with_context(|| format!("saving raw oracle output: {}", path.display()))?;
        Ok(path)
    }
}

/// Serialize as pretty JSON and write atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    write_atomic(path, data.as_bytes()).with_context(|| format!("writing {}", path.display()))
}

/// Read and decode a JSON file. Returns None if the file doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_root_is_not_empty() {
        let root = store_root();
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn session_dir_layout() {
        let p = session_dir(Path::new("/data"), "42");
        assert!(p.ends_with("sessions/42"));
    }

    #[test]
    fn write_atomic_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("test.txt");
        write_atomic(&path, b"hello world").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
    }

    #[test]
    fn artifact_names_are_numbered_in_order() {
        let names: Vec<&str> = Artifact::ALL.iter().map(|a| a.file_name()).collect();
        assert_eq!(names[0], "1-mini_segments_with_ids.json");
        assert_eq!(names[7], "6-final_results_mapped.json");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::open(tmp.path(), "s1");
        assert!(!store.exists(Artifact::Removals));

        store.save(Artifact::Removals, &vec![1, 2, 3]).unwrap();
        assert!(store.exists(Artifact::Removals));
        let loaded: Vec<i32> = store.load(Artifact::Removals).unwrap().unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
    }

    #[test]
    fn load_missing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let loaded: Option<Vec<i32>> = store.load(Artifact::FinalClips).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_corrupt_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        fs::write(store.path(Artifact::FinalClips), "{not json").unwrap();
        let loaded: anyhow::Result<Option<Vec<i32>>> = store.load(Artifact::FinalClips);
        assert!(loaded.is_err());
    }

    #[test]
    fn error_text_lands_next_to_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let path = store
            .save_error_text(Artifact::ConceptMerges, "the model said no")
            .unwrap();
        assert!(path
            .to_string_lossy()
            .ends_with("4-conceptual_merges.json.ERROR.txt"));
        assert_eq!(fs::read_to_string(path).unwrap(), "the model said no");
    }

    #[test]
    fn remove_deletes_artifact_and_error_text() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        store.save(Artifact::FinalClips, &Vec::<i32>::new()).unwrap();
        let raw = store.save_error_text(Artifact::FinalClips, "oops").unwrap();

        store.remove(Artifact::FinalClips).unwrap();
        assert!(!store.exists(Artifact::FinalClips));
        assert!(!raw.exists());
        // already gone
        store.remove(Artifact::FinalClips).unwrap();
    }

    #[test]
    fn second_lock_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let guard = store.lock().unwrap();
        assert!(store.lock().is_err());
        drop(guard);
        assert!(store.lock().is_ok());
    }
}
