//! Read-only virtual filesystems as table sources.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

/// A read-only hierarchical byte store that is not backed by the OS
/// filesystem, e.g. an embedded resource bundle. Entry order must be stable
/// across calls within one process.
pub trait VirtualFs: Send + Sync {
    /// Every file path in the store, using `/` separators.
    fn list(&self) -> Vec<String>;

    /// Open one entry for reading.
    fn open(&self, path: &str) -> std::io::Result<Box<dyn Read + Send>>;
}

/// In-memory [`VirtualFs`] backed by a sorted map. Ships for tests and for
/// embedders that assemble inputs at runtime.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into().into());
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VirtualFs for MemoryFs {
    fn list(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn open(&self, path: &str) -> std::io::Result<Box<dyn Read + Send>> {
        match self.files.get(path) {
            Some(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such entry: {path}"),
            )),
        }
    }
}
