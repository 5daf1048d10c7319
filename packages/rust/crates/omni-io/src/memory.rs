//! In-memory store for tests and editor-buffer style backends.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::IoError;
use crate::store::{BackupLedger, FileStore, ProgressFn, ensure_live, report};

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, String>,
    ledger: BackupLedger,
}

/// File store holding every file in a map.
///
/// All bookkeeping sits behind one mutex and no operation awaits while
/// holding it, so each call is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryFileStore {
    state: Mutex<MemoryState>,
}

impl MemoryFileStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(path, content)` pairs.
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let store = Self::new();
        {
            let mut state = store.state();
            for (path, content) in files {
                state.files.insert(path.into(), content.into());
            }
        }
        store
    }

    /// Copy of every file, sorted by path.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state().files.clone()
    }

    /// Content of one file.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn restore_into(files: &mut BTreeMap<String, String>, path: String, original: Option<Vec<u8>>) {
    match original {
        Some(bytes) => {
            files.insert(path, String::from_utf8_lossy(&bytes).into_owned());
        }
        None => {
            files.remove(&path);
        }
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<String, IoError> {
        ensure_live(cancel, path)?;
        let content = self
            .get(path)
            .ok_or_else(|| IoError::NotFound(path.to_string()))?;
        let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
        report(progress, path, len, Some(len));
        Ok(content)
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError> {
        ensure_live(cancel, path)?;
        self.state()
            .files
            .insert(path.to_string(), content.to_string());
        let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
        report(progress, path, len, Some(len));
        Ok(())
    }

    async fn append_file(
        &self,
        path: &str,
        content: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError> {
        ensure_live(cancel, path)?;
        self.state()
            .files
            .entry(path.to_string())
            .or_default()
            .push_str(content);
        let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
        report(progress, path, len, Some(len));
        Ok(())
    }

    async fn delete_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError> {
        ensure_live(cancel, path)?;
        if self.state().files.remove(path).is_none() {
            return Err(IoError::NotFound(path.to_string()));
        }
        report(progress, path, 0, Some(0));
        Ok(())
    }

    async fn backup_file(&self, path: &str) -> Result<bool, IoError> {
        let mut state = self.state();
        if state.ledger.contains(path) {
            return Ok(false);
        }
        let original = state.files.get(path).map(|c| c.as_bytes().to_vec());
        Ok(state.ledger.record(path, original))
    }

    async fn restore_file(&self, path: &str) -> Result<bool, IoError> {
        let mut state = self.state();
        let Some(original) = state.ledger.take(path) else {
            return Ok(false);
        };
        restore_into(&mut state.files, path.to_string(), original);
        Ok(true)
    }

    async fn rollback_all(&self) -> Result<Vec<String>, IoError> {
        let mut state = self.state();
        let records = state.ledger.drain();
        let mut restored = Vec::with_capacity(records.len());
        for (path, original) in records {
            restore_into(&mut state.files, path.clone(), original);
            restored.push(path);
        }
        Ok(restored)
    }

    async fn clear_backups(&self) {
        self.state().ledger.clear();
    }

    fn backed_up_paths(&self) -> Vec<String> {
        self.state().ledger.paths()
    }
}
