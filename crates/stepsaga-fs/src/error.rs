use std::num::ParseIntError;
use std::path::PathBuf;

use stepsaga::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileStoreError {
    #[error("failed to read step state file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write step state file '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse step state file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize step state for '{path}'")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("invalid step index '{key}' in '{path}'")]
    InvalidIndex {
        path: PathBuf,
        key: String,
        #[source]
        source: ParseIntError,
    },

    #[error("step state cache lock poisoned")]
    Poisoned,
}

impl From<FileStoreError> for StoreError {
    fn from(error: FileStoreError) -> Self {
        match error {
            FileStoreError::Poisoned => StoreError::Poisoned,
            other => StoreError::backend(other),
        }
    }
}
