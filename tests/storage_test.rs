//! Tests for the key-value stores backing the chart windows.
//!
//! Run with: cargo test --test storage_test

use std::sync::Arc;

use meteo_dash::channels::ChannelCatalog;
use meteo_dash::storage::{FileStore, KvStore, MemoryStore, StorageError, WriteBehindStore};
use meteo_dash::window::{Sample, WindowConfig, WindowStore};

#[test]
fn memory_store_overwrites_values() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    assert_eq!(store.get("tempChart").unwrap(), None);

    store.set("tempChart", "[1]".to_string()).unwrap();
    store.set("tempChart", "[2]".to_string()).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("tempChart").unwrap().as_deref(), Some("[2]"));
}

#[test]
fn file_store_creates_root_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("windows");

    let store = FileStore::open(&root).unwrap();
    assert!(root.is_dir());
    assert_eq!(store.get("presChart").unwrap(), None);

    store.set("presChart", r#"[{"x":1,"y":1013.2}]"#.to_string()).unwrap();

    assert!(root.join("presChart.json").is_file());
    assert!(!root.join(".presChart.json.tmp").exists());
    assert_eq!(
        store.get("presChart").unwrap().as_deref(),
        Some(r#"[{"x":1,"y":1013.2}]"#)
    );
}

#[test]
fn file_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    for key in ["", "../escape", "a/b", "with space", "dot.json"] {
        assert!(matches!(
            store.set(key, "[]".to_string()),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(store.get(key), Err(StorageError::InvalidKey(_))));
    }
}

#[test]
fn windows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut windows =
            WindowStore::new(ChannelCatalog::reference(), WindowConfig::default(), store);
        windows.append("tempChart", 1_000, 19.5);
        windows.append("tempChart", 2_000, 19.75);
        windows.append("vibrChart", 2_000, 0.25);
    }

    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut windows = WindowStore::new(ChannelCatalog::reference(), WindowConfig::default(), store);

    assert_eq!(windows.restore(), 2);
    assert_eq!(
        windows.samples("tempChart"),
        &[Sample::new(1_000, 19.5), Sample::new(2_000, 19.75)]
    );
    assert_eq!(windows.samples("vibrChart"), &[Sample::new(2_000, 0.25)]);
    assert!(windows.samples("humChart").is_empty());
}

#[test]
fn corrupt_file_reads_as_empty_window() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("humChart.json"), "[{\"x\":1,").unwrap();

    let store = FileStore::open(dir.path()).unwrap();
    let windows = WindowStore::new(ChannelCatalog::reference(), WindowConfig::default(), store);

    assert!(windows.load("humChart").is_empty());
}

#[tokio::test]
async fn write_behind_serves_staged_values_and_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let store = WriteBehindStore::spawn(FileStore::open(dir.path()).unwrap());

    store.set("vibrChart", "[1]".to_string()).unwrap();
    store.set("vibrChart", "[1,2]".to_string()).unwrap();
    assert_eq!(store.get("vibrChart").unwrap().as_deref(), Some("[1,2]"));

    store.flush().unwrap();
    assert_eq!(store.pending(), 0);
    assert_eq!(store.inner().get("vibrChart").unwrap().as_deref(), Some("[1,2]"));
}

#[tokio::test]
async fn write_behind_writer_reaches_disk_without_flush() {
    let dir = tempfile::tempdir().unwrap();
    let store = WriteBehindStore::spawn(FileStore::open(dir.path()).unwrap());

    store.set("presChart", r#"[{"x":1,"y":1000.0}]"#.to_string()).unwrap();

    let mut on_disk = None;
    for _ in 0..200 {
        on_disk = store.inner().get("presChart").unwrap();
        if on_disk.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(on_disk.as_deref(), Some(r#"[{"x":1,"y":1000.0}]"#));
}

#[tokio::test]
async fn windows_append_through_write_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> =
        Arc::new(WriteBehindStore::spawn(FileStore::open(dir.path()).unwrap()));
    let mut windows =
        WindowStore::new(ChannelCatalog::reference(), WindowConfig::default(), store);

    for ts in 0..100 {
        windows.append("vibrChart", ts, 0.5);
    }

    assert_eq!(windows.samples("vibrChart").len(), 100);
    assert_eq!(windows.load("vibrChart").len(), 100);
}
