//! JSON persistence for session run state.
//!
//! One file per session under the repository directory. Writes go through a
//! [`WriteQueue`] so at most one save is in flight; each save writes a temp
//! file and renames it over the previous snapshot.

use std::path::{Path, PathBuf};

use omni_io::{IoError, WriteQueue};
use serde::{Deserialize, Serialize};

use crate::evaluator::EvaluatorMemory;
use crate::observability::SessionEvent;

use super::SessionRunState;

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRunState {
    pub version: u32,
    pub state: SessionRunState,
    #[serde(default)]
    pub evaluator: EvaluatorMemory,
}

/// Explicitly injected store for [`SessionRunState`] snapshots.
#[derive(Clone)]
pub struct RunStateRepository {
    dir: PathBuf,
    queue: WriteQueue,
}

impl RunStateRepository {
    /// Must be called inside a tokio runtime (spawns the write queue).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_queue(dir, WriteQueue::spawn())
    }

    pub fn with_queue(dir: impl Into<PathBuf>, queue: WriteQueue) -> Self {
        Self {
            dir: dir.into(),
            queue,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot file for `session_id`. Characters outside `[A-Za-z0-9_-]`
    /// become `_`.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(session_id)))
    }

    pub async fn save(
        &self,
        session_id: &str,
        state: &SessionRunState,
        evaluator: &EvaluatorMemory,
    ) -> Result<PathBuf, IoError> {
        let snapshot = PersistedRunState {
            version: SNAPSHOT_VERSION,
            state: state.clone(),
            evaluator: evaluator.clone(),
        };
        let body = serde_json::to_vec_pretty(&snapshot)
            .map_err(|error| IoError::Encoding(error.to_string()))?;
        let dir = self.dir.clone();
        let target = self.path_for(session_id);
        let written = target.clone();
        self.queue
            .run(async move {
                tokio::fs::create_dir_all(&dir).await?;
                let tmp = target.with_extension("json.tmp");
                tokio::fs::write(&tmp, &body).await?;
                tokio::fs::rename(&tmp, &target).await?;
                Ok::<(), IoError>(())
            })
            .await??;
        tracing::debug!(
            event = SessionEvent::RunStatePersisted.as_str(),
            session_id,
            path = %written.display(),
            turns = state.turns,
            "session run state persisted"
        );
        Ok(written)
    }

    /// `Ok(None)` when the session has no snapshot yet.
    pub async fn load(&self, session_id: &str) -> Result<Option<PersistedRunState>, IoError> {
        let path = self.path_for(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let snapshot: PersistedRunState = serde_json::from_slice(&bytes)
            .map_err(|error| IoError::Encoding(format!("{}: {error}", path.display())))?;
        tracing::debug!(
            event = SessionEvent::RunStateLoaded.as_str(),
            session_id,
            path = %path.display(),
            turns = snapshot.state.turns,
            "session run state loaded"
        );
        Ok(Some(snapshot))
    }
}

fn sanitize(session_id: &str) -> String {
    let cleaned: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session_persistence.rs"]
mod tests;
