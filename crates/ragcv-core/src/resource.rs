//! Ownership of the rendered document.
//!
//! The compiled PDF lives in a locally allocated blob (a temp file by default).
//! [`ResourceManager`] is the only holder of release authority: callers get
//! `&RenderedHandle`, never the handle itself. A replacement is allocated
//! before its predecessor is released, so at most one handle is outstanding
//! between calls and there is never a gap where nothing is displayable.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::NamedTempFile;

/// Opaque reference to a locally held rendered document
#[derive(Debug, PartialEq, Eq)]
pub struct RenderedHandle {
    id: u64,
    path: PathBuf,
    len: usize,
}

impl RenderedHandle {
    pub fn new(id: u64, path: PathBuf, len: usize) -> Self {
        Self { id, path, len }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Where rendered bytes are kept while they are displayed
pub trait BlobStore: Send {
    fn allocate(&mut self, bytes: &[u8]) -> Result<RenderedHandle>;

    fn release(&mut self, handle: RenderedHandle);
}

/// Keeps each rendered document in its own `ragcv-*.pdf` temp file.
///
/// Releasing a handle deletes its file; anything still held when the store is
/// dropped is deleted with it.
pub struct TempFileStore {
    dir: Option<PathBuf>,
    next_id: u64,
    files: HashMap<u64, NamedTempFile>,
}

impl TempFileStore {
    pub fn new() -> Self {
        Self {
            dir: None,
            next_id: 0,
            files: HashMap::new(),
        }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::new()
        }
    }
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for TempFileStore {
    fn allocate(&mut self, bytes: &[u8]) -> Result<RenderedHandle> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ragcv-").suffix(".pdf");

        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        self.next_id += 1;
        let handle = RenderedHandle::new(self.next_id, file.path().to_path_buf(), bytes.len());
        self.files.insert(handle.id, file);
        Ok(handle)
    }

    fn release(&mut self, handle: RenderedHandle) {
        if let Some(file) = self.files.remove(&handle.id) {
            if let Err(e) = file.close() {
                tracing::warn!(path = %handle.path.display(), error = %e, "failed to remove rendered document");
            }
        }
    }
}

pub struct ResourceManager {
    store: Box<dyn BlobStore>,
    current: Option<RenderedHandle>,
    allocated: u64,
    released: u64,
}

impl ResourceManager {
    pub fn new(store: Box<dyn BlobStore>) -> Self {
        Self {
            store,
            current: None,
            allocated: 0,
            released: 0,
        }
    }

    /// Allocates `bytes` as the new current handle, then releases the old one.
    ///
    /// On allocation failure the previous handle stays current.
    pub fn replace(&mut self, bytes: &[u8]) -> Result<&RenderedHandle> {
        let handle = self.store.allocate(bytes)?;
        self.allocated += 1;
        tracing::debug!(id = handle.id, len = handle.len, "rendered handle allocated");

        if let Some(previous) = self.current.take() {
            self.release(previous);
        }

        Ok(self.current.insert(handle))
    }

    /// Releases the current handle, if any. Idempotent.
    pub fn release_all(&mut self) {
        if let Some(handle) = self.current.take() {
            self.release(handle);
        }
    }

    fn release(&mut self, handle: RenderedHandle) {
        tracing::debug!(id = handle.id, "rendered handle released");
        self.store.release(handle);
        self.released += 1;
    }

    pub fn current(&self) -> Option<&RenderedHandle> {
        self.current.as_ref()
    }

    /// Allocations minus releases; always 0 or 1
    pub fn outstanding(&self) -> u64 {
        self.allocated - self.released
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Allocate(u64),
        Release(u64),
    }

    #[derive(Default)]
    struct RecordingStore {
        ops: Arc<Mutex<Vec<Op>>>,
        fail: Arc<AtomicBool>,
        next_id: u64,
    }

    impl BlobStore for RecordingStore {
        fn allocate(&mut self, bytes: &[u8]) -> Result<RenderedHandle> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("disk full"));
            }
            self.next_id += 1;
            self.ops.lock().unwrap().push(Op::Allocate(self.next_id));
            Ok(RenderedHandle::new(self.next_id, PathBuf::from("mem"), bytes.len()))
        }

        fn release(&mut self, handle: RenderedHandle) {
            self.ops.lock().unwrap().push(Op::Release(handle.id()));
        }
    }

    #[test]
    fn test_replace_allocates_before_releasing() {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let store = RecordingStore { ops: Arc::clone(&ops), ..Default::default() };
        let mut manager = ResourceManager::new(Box::new(store));

        assert_eq!(manager.replace(b"a").unwrap().id(), 1);
        assert_eq!(manager.outstanding(), 1);
        assert_eq!(manager.replace(b"bb").unwrap().len(), 2);
        assert_eq!(manager.outstanding(), 1);

        manager.release_all();
        manager.release_all();
        assert_eq!(manager.outstanding(), 0);
        assert!(manager.current().is_none());

        assert_eq!(
            *ops.lock().unwrap(),
            vec![Op::Allocate(1), Op::Allocate(2), Op::Release(1), Op::Release(2)]
        );
    }

    #[test]
    fn test_failed_allocation_keeps_previous_handle() {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let fail = Arc::new(AtomicBool::new(false));
        let store = RecordingStore {
            ops: Arc::clone(&ops),
            fail: Arc::clone(&fail),
            next_id: 0,
        };
        let mut manager = ResourceManager::new(Box::new(store));
        manager.replace(b"a").unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(manager.replace(b"b").is_err());
        assert_eq!(manager.current().map(|h| h.id()), Some(1));
        assert_eq!(manager.outstanding(), 1);
        assert_eq!(*ops.lock().unwrap(), vec![Op::Allocate(1)]);
    }

    #[test]
    fn test_drop_releases_current() {
        let ops = Arc::new(Mutex::new(Vec::new()));
        {
            let store = RecordingStore { ops: Arc::clone(&ops), ..Default::default() };
            let mut manager = ResourceManager::new(Box::new(store));
            manager.replace(b"a").unwrap();
        }
        assert_eq!(*ops.lock().unwrap(), vec![Op::Allocate(1), Op::Release(1)]);
    }

    #[test]
    fn test_temp_file_store_writes_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TempFileStore::in_dir(dir.path());

        let handle = store.allocate(b"%PDF-1.5").unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");

        store.release(handle);
        assert!(!path.exists());
    }
}
