//! Durable mirror of the session list.
//!
//! The cache behaves like a single key in a key/value store: it holds one
//! serialized snapshot that is read once at startup and overwritten after
//! every session mutation.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use crate::core::config::data::path_display;

/// Errors raised while reading or writing the session cache.
#[derive(Debug)]
pub enum CacheError {
    /// The cache file could not be read.
    Read { path: PathBuf, source: io::Error },
    /// The cache file could not be written.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Read { path, source } => write!(
                f,
                "Failed to read session cache at {}: {}",
                path_display(path),
                source
            ),
            CacheError::Write { path, source } => write!(
                f,
                "Failed to write session cache at {}: {}",
                path_display(path),
                source
            ),
        }
    }
}

impl StdError for CacheError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CacheError::Read { source, .. } | CacheError::Write { source, .. } => Some(source),
        }
    }
}

/// Storage for the serialized session list.
pub trait SessionCache: Send {
    /// The stored snapshot, or `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>, CacheError>;

    /// Replace the stored snapshot.
    fn write(&mut self, snapshot: &str) -> Result<(), CacheError>;
}

/// Snapshot kept in a JSON file, replaced by rename on every write.
///
/// Writes are not fsynced: the cache is rewritten once per streamed delta.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionCache for FileSessionCache {
    fn read(&self) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&mut self, snapshot: &str) -> Result<(), CacheError> {
        let write_error = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_error)?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_error)?;

        temp_file
            .write_all(snapshot.as_bytes())
            .map_err(write_error)?;
        temp_file
            .persist(&self.path)
            .map_err(|err| write_error(err.error))?;
        Ok(())
    }
}

/// In-process cache; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionCache {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }

    /// The snapshot currently stored.
    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionCache for MemorySessionCache {
    fn read(&self) -> Result<Option<String>, CacheError> {
        Ok(self.contents())
    }

    fn write(&mut self, snapshot: &str) -> Result<(), CacheError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.to_string());
        Ok(())
    }
}
