//! Snapshots of workflow state keyed by session id

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::state::WorkflowState;
use crate::{Error, Result};

/// Storage for state snapshots
pub trait CheckpointStore: Send + Sync {
    fn save(&self, state: &WorkflowState) -> Result<()>;

    fn load(&self, session_id: &str) -> Result<Option<WorkflowState>>;
}

/// In-process store; snapshots are lost on exit
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    states: Mutex<HashMap<String, WorkflowState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, state: &WorkflowState) -> Result<()> {
        self.states
            .lock()
            .map_err(|_| Error::Other("Checkpoint store lock poisoned".to_string()))?
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<WorkflowState>> {
        Ok(self
            .states
            .lock()
            .map_err(|_| Error::Other("Checkpoint store lock poisoned".to_string()))?
            .get(session_id)
            .cloned())
    }
}

/// One JSON file per session in a directory
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Config(format!("Invalid session id: {}", session_id)));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, state: &WorkflowState) -> Result<()> {
        let path = self.path_for(&state.session_id)?;
        std::fs::create_dir_all(&self.dir)?;

        // replace atomically
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), phase = %state.current_phase, "Saved checkpoint");
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<WorkflowState>> {
        let path = self.path_for(session_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::phase::{PhaseId, Status};
    use crate::workflow::state::WorkflowInputs;
    use tempfile::TempDir;

    fn state(id: &str) -> WorkflowState {
        WorkflowState::new(id, WorkflowInputs::new("owner/repo", "task", "/tmp"))
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("a").unwrap().is_none());

        let mut s = state("a");
        store.save(&s).unwrap();
        s.complete(PhaseId::Analysis, Status::PlanningComplete);
        store.save(&s).unwrap();

        let loaded = store.load("a").unwrap().unwrap();
        assert_eq!(loaded.completed_phases, vec![PhaseId::Analysis]);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoints"));

        let mut s = state("session-1");
        s.fail(PhaseId::Generation, "model down");
        store.save(&s).unwrap();

        assert!(dir.path().join("checkpoints/session-1.json").exists());
        let loaded = store.load("session-1").unwrap().unwrap();
        assert_eq!(loaded, s);
        assert!(store.load("other").unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        assert!(store.save(&state("../escape")).is_err());
        assert!(store.load("a/b").is_err());
    }
}
