// db/localdb.rs
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    db::{StorageBackend, StorageError, StorageMode},
    snapshot::{ChangeSet, Snapshot},
};

/// In-process store, optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct LocalStore {
    state: Mutex<Snapshot>,
    path: Option<PathBuf>,
    mode: StorageMode,
}

impl LocalStore {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(Snapshot::default()),
            path: None,
            mode: StorageMode::Local,
        }
    }

    pub async fn open(path: Option<PathBuf>, mode: StorageMode) -> Result<Self, StorageError> {
        let mut state = Snapshot::default();
        if let Some(path) = &path {
            if tokio::fs::try_exists(path).await? {
                let raw = tokio::fs::read(path).await?;
                state = serde_json::from_slice(&raw)?;
                tracing::info!(
                    "Loaded local store from {} ({} tickets)",
                    path.display(),
                    state.tickets.len()
                );
            }
        }

        Ok(Self {
            state: Mutex::new(state),
            path,
            mode,
        })
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let raw = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStore {
    async fn load_snapshot(&self) -> Result<Snapshot, StorageError> {
        Ok(self.state.lock().await.clone())
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.check_revisions(changes)?;

        let mut next = state.clone();
        next.apply(changes);
        self.persist(&next).await?;
        *state = next;

        tracing::debug!(
            "Local commit: {} tickets, {} jobs, {} contractors, {} connections, {} applications",
            changes.tickets.len(),
            changes.jobs.len(),
            changes.contractors.len(),
            changes.connections.len(),
            changes.applications.len()
        );
        Ok(())
    }

    fn mode(&self) -> StorageMode {
        self.mode
    }
}
