//! Tests for `MemoryFileStore`.
#![allow(missing_docs)]

use omni_io::{FileStore, IoError, MemoryFileStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_rollback_restores_every_touched_path() -> Result<(), IoError> {
    let store = MemoryFileStore::with_files([("a.txt", "A"), ("b.txt", "B")]);
    let before = store.snapshot();
    let cancel = CancellationToken::new();

    store.backup_file("a.txt").await?;
    store.write_file("a.txt", "A2", &cancel, None).await?;
    store.backup_file("a.txt").await?;
    store.write_file("a.txt", "A3", &cancel, None).await?;
    store.backup_file("b.txt").await?;
    store.delete_file("b.txt", &cancel, None).await?;
    store.backup_file("c.txt").await?;
    store.append_file("c.txt", "C", &cancel, None).await?;

    assert_eq!(store.backed_up_paths(), vec!["a.txt", "b.txt", "c.txt"]);
    store.rollback_all().await?;
    store.clear_backups().await;

    assert_eq!(store.snapshot(), before);
    assert!(store.backed_up_paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_restore_single_path() -> Result<(), IoError> {
    let store = MemoryFileStore::with_files([("a.txt", "A"), ("b.txt", "B")]);
    let cancel = CancellationToken::new();

    store.backup_file("a.txt").await?;
    store.backup_file("b.txt").await?;
    store.write_file("a.txt", "x", &cancel, None).await?;
    store.write_file("b.txt", "y", &cancel, None).await?;

    assert!(store.restore_file("a.txt").await?);
    assert_eq!(store.get("a.txt").as_deref(), Some("A"));
    assert_eq!(store.get("b.txt").as_deref(), Some("y"));
    assert_eq!(store.backed_up_paths(), vec!["b.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_read_fails() {
    let store = MemoryFileStore::with_files([("a.txt", "A")]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        store.read_file("a.txt", &cancel, None).await,
        Err(IoError::Cancelled(_))
    ));
}

#[tokio::test]
async fn test_randomized_mutations_roll_back_to_start() -> Result<(), IoError> {
    let paths = ["a", "b", "c", "d"];
    let cancel = CancellationToken::new();

    for seed in 0u64..32 {
        let store = MemoryFileStore::with_files([("a", "1"), ("c", "3")]);
        let before = store.snapshot();
        let mut rng = StdRng::seed_from_u64(seed);
        for step in 0..12 {
            let path = paths[rng.gen_range(0..paths.len())];
            store.backup_file(path).await?;
            match rng.gen_range(0..3) {
                0 => store.write_file(path, &format!("w{step}"), &cancel, None).await?,
                1 => store.append_file(path, "+", &cancel, None).await?,
                _ => {
                    let _ = store.delete_file(path, &cancel, None).await;
                }
            }
        }
        store.rollback_all().await?;
        store.clear_backups().await;
        assert_eq!(store.snapshot(), before, "seed {seed}");
    }
    Ok(())
}
