#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{BoardError, Result};
use crate::store::EntityKind;

/// Raw byte storage for one serialized document per entity kind.
///
/// `write` must replace the previous document atomically: a concurrent or
/// subsequent `read` sees either the old bytes or the new bytes in full.
pub trait Medium: Send + Sync + std::fmt::Debug {
    /// Returns `None` when the collection has never been written.
    fn read(&self, kind: EntityKind) -> Result<Option<Vec<u8>>>;
    fn write(&self, kind: EntityKind, data: &[u8]) -> Result<()>;
}

/// One `<kind>.json` file per collection inside a data directory.
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
}

impl FileMedium {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| BoardError::Io {
            path: self.dir.clone(),
            source,
        })
    }
}

impl Medium for FileMedium {
    fn read(&self, kind: EntityKind) -> Result<Option<Vec<u8>>> {
        let path = self.path(kind);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BoardError::Io { path, source }),
        }
    }

    /// Each write goes to its own temp file in the data directory, which is
    /// synced and then renamed over the collection. Writers in other
    /// processes never share a temp file.
    fn write(&self, kind: EntityKind, data: &[u8]) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path(kind);
        let io_err = |source| BoardError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(kind.file_name())
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(io_err)?;
        tmp.write_all(data).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| BoardError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

/// Process-local medium, used by tests and throwaway boards.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    docs: Mutex<BTreeMap<EntityKind, Vec<u8>>>,
}

impl MemoryMedium {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection with raw bytes, bypassing the store.
    #[must_use]
    pub fn with_document(self, kind: EntityKind, data: impl Into<Vec<u8>>) -> Self {
        self.docs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, data.into());
        self
    }
}

impl Medium for MemoryMedium {
    fn read(&self, kind: EntityKind) -> Result<Option<Vec<u8>>> {
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(docs.get(&kind).cloned())
    }

    fn write(&self, kind: EntityKind, data: &[u8]) -> Result<()> {
        self.docs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, data.to_vec());
        Ok(())
    }
}
