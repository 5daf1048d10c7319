//! `tokio::fs` backed store rooted at a workspace directory.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::detect::decode_text;
use crate::error::IoError;
use crate::queue::WriteQueue;
use crate::store::{BackupLedger, FileStore, ProgressFn, ensure_live, report};

/// Default read limit (10 MiB).
pub const DEFAULT_MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

struct LocalInner {
    root: PathBuf,
    ledger: Mutex<BackupLedger>,
    /// Ancestors missing when an absent path was backed up, deepest first.
    missing_dirs: Mutex<HashMap<String, Vec<PathBuf>>>,
}

impl LocalInner {
    fn ledger(&self) -> MutexGuard<'_, BackupLedger> {
        self.ledger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn missing_dirs(&self) -> MutexGuard<'_, HashMap<String, Vec<PathBuf>>> {
        self.missing_dirs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// File store over the local file system.
///
/// Writes, deletes, backups and restores all run through one [`WriteQueue`],
/// so the backup ledger never races a concurrent mutation.
#[derive(Clone)]
pub struct LocalFileStore {
    inner: Arc<LocalInner>,
    queue: WriteQueue,
    max_read_bytes: u64,
}

impl LocalFileStore {
    /// Store rooted at `root`. Spawns the write queue on the current runtime.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_queue(root, WriteQueue::spawn())
    }

    /// Store rooted at `root` sharing an existing queue.
    pub fn with_queue(root: impl Into<PathBuf>, queue: WriteQueue) -> Self {
        Self {
            inner: Arc::new(LocalInner {
                root: root.into(),
                ledger: Mutex::new(BackupLedger::new()),
                missing_dirs: Mutex::new(HashMap::new()),
            }),
            queue,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }

    /// Override the read size limit.
    #[must_use]
    pub fn with_max_read_bytes(mut self, max_read_bytes: u64) -> Self {
        self.max_read_bytes = max_read_bytes;
        self
    }

    /// Workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Map a store path onto the file system.
    ///
    /// # Errors
    /// `IoError::OutsideRoot` for `..` components or absolute paths outside
    /// the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, IoError> {
        let candidate = Path::new(path);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(IoError::OutsideRoot(path.to_string()));
        }
        if candidate.is_absolute() {
            if candidate.starts_with(&self.inner.root) {
                return Ok(candidate.to_path_buf());
            }
            return Err(IoError::OutsideRoot(path.to_string()));
        }
        Ok(self.inner.root.join(candidate))
    }
}

async fn read_original(target: &Path) -> Result<Option<Vec<u8>>, IoError> {
    match tokio::fs::read(target).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Ancestors of `target` below `root` that do not exist yet, deepest first.
async fn missing_ancestors(root: &Path, target: &Path) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    let mut current = target.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if tokio::fs::try_exists(dir).await.unwrap_or(true) {
            break;
        }
        missing.push(dir.to_path_buf());
        current = dir.parent();
    }
    missing
}

/// Remove directories created since the backup, deepest first, stopping at
/// the first one that is not empty.
async fn remove_created_dirs(dirs: Vec<PathBuf>) {
    for dir in dirs {
        if tokio::fs::remove_dir(&dir).await.is_err() {
            break;
        }
    }
}

async fn restore_to(target: &Path, original: Option<Vec<u8>>) -> Result<(), IoError> {
    match original {
        Some(bytes) => {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(target, bytes).await?;
        }
        None => match tokio::fs::remove_file(target).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        },
    }
    Ok(())
}

fn byte_len(content: &str) -> u64 {
    u64::try_from(content.len()).unwrap_or(u64::MAX)
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<String, IoError> {
        ensure_live(cancel, path)?;
        let target = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|_| IoError::NotFound(path.to_string()))?;
        if metadata.len() > self.max_read_bytes {
            return Err(IoError::TooLarge(metadata.len(), self.max_read_bytes));
        }
        report(progress, path, 0, Some(metadata.len()));
        let buffer = tokio::select! {
            () = cancel.cancelled() => return Err(IoError::Cancelled(path.to_string())),
            read = tokio::fs::read(&target) => read?,
        };
        let len = u64::try_from(buffer.len()).unwrap_or(u64::MAX);
        let text = decode_text(path, buffer)?;
        report(progress, path, len, Some(len));
        Ok(text)
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError> {
        ensure_live(cancel, path)?;
        let target = self.resolve(path)?;
        let total = byte_len(content);
        report(progress, path, 0, Some(total));
        let body = content.to_string();
        let token = cancel.clone();
        let owned_path = path.to_string();
        self.queue
            .run(async move {
                ensure_live(&token, &owned_path)?;
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, body).await?;
                Ok::<(), IoError>(())
            })
            .await??;
        tracing::debug!(path, bytes = total, "file written");
        report(progress, path, total, Some(total));
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
        let target = self.resolve(path)?;
        let total = byte_len(content);
        report(progress, path, 0, Some(total));
        let body = content.to_string();
        let token = cancel.clone();
        let owned_path = path.to_string();
        self.queue
            .run(async move {
                ensure_live(&token, &owned_path)?;
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&target)
                    .await?;
                file.write_all(body.as_bytes()).await?;
                file.flush().await?;
                Ok::<(), IoError>(())
            })
            .await??;
        tracing::debug!(path, bytes = total, "file appended");
        report(progress, path, total, Some(total));
        Ok(())
    }

    async fn delete_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError> {
        ensure_live(cancel, path)?;
        let target = self.resolve(path)?;
        report(progress, path, 0, None);
        let token = cancel.clone();
        let owned_path = path.to_string();
        self.queue
            .run(async move {
                ensure_live(&token, &owned_path)?;
                match tokio::fs::remove_file(&target).await {
                    Ok(()) => Ok(()),
                    Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                        Err(IoError::NotFound(owned_path))
                    }
                    Err(error) => Err(error.into()),
                }
            })
            .await??;
        tracing::debug!(path, "file deleted");
        report(progress, path, 0, Some(0));
        Ok(())
    }

    async fn backup_file(&self, path: &str) -> Result<bool, IoError> {
        let target = self.resolve(path)?;
        let inner = Arc::clone(&self.inner);
        let owned_path = path.to_string();
        let created = self
            .queue
            .run(async move {
                let already = inner.ledger().contains(&owned_path);
                if already {
                    return Ok::<bool, IoError>(false);
                }
                let original = read_original(&target).await?;
                if original.is_none() {
                    let missing = missing_ancestors(&inner.root, &target).await;
                    if !missing.is_empty() {
                        inner.missing_dirs().insert(owned_path.clone(), missing);
                    }
                }
                Ok(inner.ledger().record(&owned_path, original))
            })
            .await??;
        if created {
            tracing::debug!(path, "backup recorded");
        }
        Ok(created)
    }

    async fn restore_file(&self, path: &str) -> Result<bool, IoError> {
        let target = self.resolve(path)?;
        let inner = Arc::clone(&self.inner);
        let owned_path = path.to_string();
        self.queue
            .run(async move {
                let taken = inner.ledger().take(&owned_path);
                let Some(original) = taken else {
                    return Ok::<bool, IoError>(false);
                };
                restore_to(&target, original).await?;
                let created = inner.missing_dirs().remove(&owned_path);
                if let Some(dirs) = created {
                    remove_created_dirs(dirs).await;
                }
                Ok(true)
            })
            .await?
    }

    async fn rollback_all(&self) -> Result<Vec<String>, IoError> {
        let store = self.clone();
        self.queue
            .run(async move {
                let records = store.inner.ledger().drain();
                let mut restored = Vec::with_capacity(records.len());
                let mut first_error = None;
                for (path, original) in records {
                    let outcome = match store.resolve(&path) {
                        Ok(target) => restore_to(&target, original).await,
                        Err(error) => Err(error),
                    };
                    match outcome {
                        Ok(()) => {
                            let created = store.inner.missing_dirs().remove(&path);
                            if let Some(dirs) = created {
                                remove_created_dirs(dirs).await;
                            }
                            restored.push(path);
                        }
                        Err(error) => {
                            tracing::warn!(path = %path, error = %error, "rollback restore failed");
                            first_error.get_or_insert(error);
                        }
                    }
                }
                store.inner.missing_dirs().clear();
                tracing::info!(restored = restored.len(), "file store rolled back");
                match first_error {
                    Some(error) => Err(error),
                    None => Ok(restored),
                }
            })
            .await?
    }

    async fn clear_backups(&self) {
        let inner = Arc::clone(&self.inner);
        if self
            .queue
            .run(async move {
                inner.ledger().clear();
                inner.missing_dirs().clear();
            })
            .await
            .is_err()
        {
            self.inner.ledger().clear();
            self.inner.missing_dirs().clear();
        }
    }

    fn backed_up_paths(&self) -> Vec<String> {
        self.inner.ledger().paths()
    }
}
