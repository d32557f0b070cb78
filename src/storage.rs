//! Durable key-value storage backing the chart windows.
//!
//! The window store only needs two operations: read a string by key and
//! overwrite a string by key. One key is used per channel and the value is the
//! full serialized sample sequence, so every write is a whole-value overwrite.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`]: process-local map, used by tests and when no storage
//!   directory is configured.
//! - [`FileStore`]: one `<key>.json` file per key under a directory. Writes go
//!   to a temporary sibling file which is then renamed over the target, so a
//!   crash mid-write leaves either the old or the new value on disk.
//!
//! [`WriteBehindStore`] wraps a slow store so `set` only records the value and
//! returns; a background writer flushes the latest value per key.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Background writer has stopped")]
    WriterClosed,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String key-value storage with whole-value overwrite semantics.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn set(&self, key: &str, value: String) -> StorageResult<()>;
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a file store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "File store opened");
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        // Keys become file names, so anything that could escape the root is refused
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Asynchronous write-through to another store.
///
/// `set` stages the value and queues its key; a blocking writer task drains
/// the queue and writes the newest staged value for each key, so bursts of
/// writes to one key collapse into a single disk write. `get` sees staged
/// values before they reach the inner store. Write failures are logged.
pub struct WriteBehindStore<S: KvStore + 'static> {
    inner: Arc<S>,
    staged: Arc<Mutex<HashMap<String, String>>>,
    // Serialises writes between the writer task and `flush`
    io: Arc<Mutex<()>>,
    queue: mpsc::UnboundedSender<String>,
}

impl<S: KvStore + 'static> WriteBehindStore<S> {
    /// Wrap `inner` and start its writer on the blocking pool.
    ///
    /// Must be called inside a tokio runtime. The writer exits once the
    /// store is dropped.
    pub fn spawn(inner: S) -> Self {
        let inner = Arc::new(inner);
        let staged: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let io: Arc<Mutex<()>> = Arc::default();
        let (queue, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_inner = inner.clone();
        let writer_staged = staged.clone();
        let writer_io = io.clone();
        tokio::task::spawn_blocking(move || {
            while let Some(key) = rx.blocking_recv() {
                let _io = writer_io.lock();
                write_staged(writer_inner.as_ref(), &writer_staged, &key);
            }
            tracing::debug!("Write-behind writer stopped");
        });

        Self {
            inner,
            staged,
            io,
            queue,
        }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of keys waiting to be written.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.staged.lock().len()
    }

    /// Write every staged value on the calling thread.
    ///
    /// Used at shutdown so the last samples are not lost.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError`; the remaining keys are still written.
    pub fn flush(&self) -> StorageResult<()> {
        let _io = self.io.lock();
        let staged: Vec<(String, String)> = self
            .staged
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut first_error = None;
        for (key, value) in staged {
            if let Err(e) = self.inner.set(&key, value.clone()) {
                tracing::warn!(key = %key, error = %e, "Flush write failed");
                first_error.get_or_insert(e);
            }
            unstage_if_current(&self.staged, &key, &value);
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Write the staged value of `key` until the store holds the newest one.
///
/// The value stays staged while it is written so `get` never falls back to an
/// older value on disk. Failed writes are logged and the value is dropped
/// unless a newer one arrived meanwhile.
fn write_staged<S: KvStore + ?Sized>(
    inner: &S,
    staged: &Mutex<HashMap<String, String>>,
    key: &str,
) {
    loop {
        let Some(value) = staged.lock().get(key).cloned() else {
            return;
        };
        if let Err(e) = inner.set(key, value.clone()) {
            tracing::warn!(key = %key, error = %e, "Background write failed");
        }
        if unstage_if_current(staged, key, &value) {
            return;
        }
    }
}

fn unstage_if_current(staged: &Mutex<HashMap<String, String>>, key: &str, written: &str) -> bool {
    let mut staged = staged.lock();
    match staged.get(key) {
        Some(current) if current != written => false,
        _ => {
            staged.remove(key);
            true
        }
    }
}

impl<S: KvStore + 'static> KvStore for WriteBehindStore<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if let Some(value) = self.staged.lock().get(key) {
            return Ok(Some(value.clone()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let newly_staged = self
            .staged
            .lock()
            .insert(key.to_string(), value)
            .is_none();

        // A key already staged is queued or being written; the writer picks up the newer value
        if newly_staged && self.queue.send(key.to_string()).is_err() {
            return Err(StorageError::WriterClosed);
        }
        Ok(())
    }
}
