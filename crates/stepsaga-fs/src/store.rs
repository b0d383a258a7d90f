use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use stepsaga::{StepStateStore, StoreError};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::FileStoreError;

/// On-disk layout. TOML keys are strings, so indices are stored as such.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    steps: BTreeMap<String, bool>,
}

/// Step state store persisted to a single TOML file.
///
/// Every write replaces the whole file atomically, so a crash leaves either
/// the old or the new contents. Records are cached in memory and the cache
/// only changes once the file write succeeded.
///
/// The store assumes it is the only writer of its file.
#[derive(Debug)]
pub struct FileStepStateStore {
    path: PathBuf,
    states: RwLock<BTreeMap<usize, bool>>,
}

impl FileStepStateStore {
    /// Load records from `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// holds a key that is not a step index.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let path = path.into();
        let states = load_states(&path)?;
        debug!(path = %path.display(), records = states.len(), "opened step state file");
        Ok(Self {
            path,
            states: RwLock::new(states),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of every recorded outcome, ordered by step index.
    ///
    /// # Errors
    ///
    /// Returns [`FileStoreError::Poisoned`] if a writer panicked while holding the lock.
    pub fn snapshot(&self) -> Result<BTreeMap<usize, bool>, FileStoreError> {
        let states = self.states.read().map_err(|_| FileStoreError::Poisoned)?;
        Ok(states.clone())
    }

    /// Delete the file and forget every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be removed.
    pub fn reset(&self) -> Result<(), FileStoreError> {
        let mut states = self.states.write().map_err(|_| FileStoreError::Poisoned)?;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(FileStoreError::Write {
                    path: self.path.clone(),
                    source,
                });
            }
        }
        states.clear();
        debug!(path = %self.path.display(), "reset step state file");
        Ok(())
    }

    fn record(&self, index: usize, success: bool) -> Result<(), FileStoreError> {
        let mut states = self.states.write().map_err(|_| FileStoreError::Poisoned)?;
        let mut updated = states.clone();
        updated.insert(index, success);
        save_states(&self.path, &updated)?;
        *states = updated;
        debug!(path = %self.path.display(), index, success, "recorded step outcome");
        Ok(())
    }
}

impl StepStateStore for FileStepStateStore {
    fn set_step_state(&self, index: usize, success: bool) -> Result<(), StoreError> {
        Ok(self.record(index, success)?)
    }

    fn step_state(&self, index: usize) -> Result<bool, StoreError> {
        let states = self.states.read().map_err(|_| FileStoreError::Poisoned)?;
        Ok(states.get(&index).copied().unwrap_or(false))
    }
}

fn load_states(path: &Path) -> Result<BTreeMap<usize, bool>, FileStoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|source| FileStoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file: StateFile = toml::from_str(&content).map_err(|source| FileStoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    file.steps
        .into_iter()
        .map(|(key, success)| match key.parse::<usize>() {
            Ok(index) => Ok((index, success)),
            Err(source) => Err(FileStoreError::InvalidIndex {
                path: path.to_path_buf(),
                key,
                source,
            }),
        })
        .collect()
}

fn save_states(path: &Path, states: &BTreeMap<usize, bool>) -> Result<(), FileStoreError> {
    let write_error = |source| FileStoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = StateFile {
        steps: states
            .iter()
            .map(|(index, success)| (index.to_string(), *success))
            .collect(),
    };
    let content =
        toml::to_string_pretty(&file).map_err(|source| FileStoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(write_error)?;
    temp_file.as_file().sync_all().map_err(write_error)?;
    temp_file
        .persist(path)
        .map_err(|e| write_error(e.error))?;

    Ok(())
}
