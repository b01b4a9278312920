//! Scratch space and persisted artifacts
//!
//! [`Workspace`] is a per-request temporary directory removed when dropped.
//! [`ArtifactStore`] keeps outputs that are fetched later through
//! `/download/{id}`. Artifact ids are `<uuid>.<ext>` and nothing else is
//! accepted, so an id can never name a path outside the store.
//! [`DirectoryStore`] can expire artifacts after a time to live.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Uniquely named temporary directory for one operation
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `parent`, or the system temp dir
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docsuite-");

        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fresh file path inside the workspace with the given extension
    pub fn unique_path(&self, extension: &str) -> PathBuf {
        self.dir.path().join(format!("{}.{}", Uuid::new_v4(), extension))
    }

    /// Write `bytes` to a fresh file and return its path
    pub fn write(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        let path = self.unique_path(extension);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Storage for outputs that outlive the request creating them
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes`, returning the new artifact id
    fn put(&self, bytes: &[u8], extension: &str) -> Result<String>;

    /// Fetch a previously stored artifact
    fn get(&self, id: &str) -> Result<Vec<u8>>;
}

/// New artifact id with the given extension
fn new_id(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension)
}

/// Check that `id` has the `<uuid>.<ext>` shape
pub fn validate_id(id: &str) -> Result<()> {
    let not_found = || Error::ArtifactNotFound(id.to_string());

    let (stem, extension) = id.split_once('.').ok_or_else(not_found)?;
    Uuid::parse_str(stem).map_err(|_| not_found())?;

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(not_found());
    }

    Ok(())
}

/// Artifacts as files in one directory
///
/// With a time to live, artifacts older than it are treated as missing and
/// swept from the directory whenever a new one is stored.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    ttl: Option<Duration>,
}

impl DirectoryStore {
    /// Use `root`, creating it if needed. Artifacts never expire.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, ttl: None })
    }

    /// Expire artifacts `ttl` after they were written
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_expired(&self, path: &Path) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let age = fs::metadata(path)
            .and_then(|m| m.modified())
            .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default());

        match age {
            Ok(age) => age >= ttl,
            Err(_) => false,
        }
    }

    /// Delete expired artifacts, returning how many were removed
    pub fn sweep(&self) -> Result<usize> {
        if self.ttl.is_none() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_artifact = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| validate_id(name).is_ok());

            if is_artifact && path.is_file() && self.is_expired(&path) {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to remove expired artifact"),
                }
            }
        }

        if removed > 0 {
            debug!(removed, "swept expired artifacts");
        }
        Ok(removed)
    }
}

impl ArtifactStore for DirectoryStore {
    fn put(&self, bytes: &[u8], extension: &str) -> Result<String> {
        self.sweep()?;

        let id = new_id(extension);
        fs::write(self.root.join(&id), bytes)?;
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>> {
        validate_id(id)?;
        let path = self.root.join(id);
        if !path.is_file() || self.is_expired(&path) {
            return Err(Error::ArtifactNotFound(id.to_string()));
        }
        Ok(fs::read(path)?)
    }
}

/// In-process store, used by tests and embedded setups
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&self, bytes: &[u8], extension: &str) -> Result<String> {
        let id = new_id(extension);
        self.artifacts
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("artifact store lock poisoned")))?
            .insert(id.clone(), bytes.to_vec());
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>> {
        validate_id(id)?;
        self.artifacts
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("artifact store lock poisoned")))?
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound(id.to_string()))
    }
}
