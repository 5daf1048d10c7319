//! The `FileStore` port and its backup bookkeeping.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::IoError;

/// Progress report for one file operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileProgress<'a> {
    /// Store-relative path.
    pub path: &'a str,
    /// Bytes processed so far.
    pub bytes_done: u64,
    /// Bytes the operation will process, when known.
    pub bytes_total: Option<u64>,
}

/// Optional per-operation progress callback.
pub type ProgressFn = dyn for<'a> Fn(FileProgress<'a>) + Send + Sync;

/// File system capability with first-touch backups and turn rollback.
///
/// Backups are keyed by path and live for one rollback epoch: from creation
/// or the last [`clear_backups`](FileStore::clear_backups) until the next
/// [`rollback_all`](FileStore::rollback_all) or clear. Callers back up a path
/// before the first mutation in an epoch; the store does not check this.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Read a whole file as UTF-8 text.
    async fn read_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<String, IoError>;

    /// Create or replace a file.
    async fn write_file(
        &self,
        path: &str,
        content: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError>;

    /// Append to a file, creating it if absent.
    async fn append_file(
        &self,
        path: &str,
        content: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError>;

    /// Remove a file.
    async fn delete_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(), IoError>;

    /// Record the current content of `path` (or its absence).
    ///
    /// A second call for a path already backed up in this epoch is a no-op.
    /// Returns `true` when a new record was created.
    async fn backup_file(&self, path: &str) -> Result<bool, IoError>;

    /// Revert one path to its backup and discard the record.
    ///
    /// Returns `false` when no record existed.
    async fn restore_file(&self, path: &str) -> Result<bool, IoError>;

    /// Restore every backed-up path, then clear all records.
    ///
    /// Every record is attempted even when one restore fails; the first
    /// failure is returned after the ledger has been emptied.
    async fn rollback_all(&self) -> Result<Vec<String>, IoError>;

    /// Discard every record without restoring.
    async fn clear_backups(&self);

    /// Paths currently backed up, in first-touch order.
    fn backed_up_paths(&self) -> Vec<String>;
}

/// Ordered path → original content records for one epoch.
///
/// `None` content means the path did not exist when it was backed up, so
/// restoring it deletes whatever is there now.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupLedger {
    records: Vec<(String, Option<Vec<u8>>)>,
}

impl BackupLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` already has a record.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.records.iter().any(|(p, _)| p == path)
    }

    /// Insert a record unless one exists. Returns `true` on insert.
    pub fn record(&mut self, path: &str, original: Option<Vec<u8>>) -> bool {
        if self.contains(path) {
            return false;
        }
        self.records.push((path.to_string(), original));
        true
    }

    /// Remove and return the record for `path`.
    pub fn take(&mut self, path: &str) -> Option<Option<Vec<u8>>> {
        let index = self.records.iter().position(|(p, _)| p == path)?;
        Some(self.records.remove(index).1)
    }

    /// Remove every record, most recent first.
    pub fn drain(&mut self) -> Vec<(String, Option<Vec<u8>>)> {
        let mut drained: Vec<_> = self.records.drain(..).collect();
        drained.reverse();
        drained
    }

    /// Discard every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Recorded paths in insertion order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.records.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub(crate) fn report(progress: Option<&ProgressFn>, path: &str, done: u64, total: Option<u64>) {
    if let Some(callback) = progress {
        callback(FileProgress {
            path,
            bytes_done: done,
            bytes_total: total,
        });
    }
}

pub(crate) fn ensure_live(cancel: &CancellationToken, path: &str) -> Result<(), IoError> {
    if cancel.is_cancelled() {
        return Err(IoError::Cancelled(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_record_is_ignored() {
        let mut ledger = BackupLedger::new();
        assert!(ledger.record("a.txt", Some(b"one".to_vec())));
        assert!(!ledger.record("a.txt", Some(b"two".to_vec())));
        assert_eq!(ledger.take("a.txt"), Some(Some(b"one".to_vec())));
        assert!(ledger.is_empty());
    }

    #[test]
    fn drain_returns_newest_first() {
        let mut ledger = BackupLedger::new();
        ledger.record("a", None);
        ledger.record("b", Some(Vec::new()));
        assert_eq!(ledger.paths(), vec!["a".to_string(), "b".to_string()]);
        let drained: Vec<String> = ledger.drain().into_iter().map(|(p, _)| p).collect();
        assert_eq!(drained, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(ledger.len(), 0);
    }
}
