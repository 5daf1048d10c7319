#![allow(clippy::doc_markdown)]

//! omni-io - Transactional file store for agent turns
//!
//! Every file a tool mutates is backed up on first touch, so a failed or
//! cancelled turn can be undone as a unit.
//!
//! # Features
//!
//! - **FileStore port**: read/write/append/delete with cancellation and progress
//! - **First-touch backups**: per-path restore and whole-epoch rollback
//! - **Serialized writes**: one in-flight persistence operation via `WriteQueue`
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-io/src/
//! ├── lib.rs      # Re-exports (this file)
//! ├── error.rs    # IoError enum
//! ├── detect.rs   # Binary detection & strict decoding
//! ├── store.rs    # FileStore trait, BackupLedger
//! ├── queue.rs    # WriteQueue (serialize-don't-lock)
//! ├── local.rs    # tokio::fs backend
//! └── memory.rs   # in-memory backend
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_io::{FileStore, LocalFileStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = LocalFileStore::new("/workspace");
//! let cancel = CancellationToken::new();
//! store.backup_file("src/main.rs").await?;
//! store.write_file("src/main.rs", "fn main() {}\n", &cancel, None).await?;
//! store.rollback_all().await?;
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod detect;
mod error;
mod local;
mod memory;
mod queue;
mod store;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use error::IoError;
pub use local::{DEFAULT_MAX_READ_BYTES, LocalFileStore};
pub use memory::MemoryFileStore;
pub use queue::WriteQueue;
pub use store::{BackupLedger, FileProgress, FileStore, ProgressFn};

// Re-export detection utilities for advanced use
pub use detect::{BINARY_SNIFF_BYTES, decode_text, is_binary};
