use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::StoreError;

/// Records whether each step of a saga has completed.
///
/// Steps are identified by their position in the saga. A store may be shared
/// between saga instances and outlive them, which is what lets a later run
/// skip the steps an earlier run already finished.
pub trait StepStateStore: Send + Sync {
    /// Record the outcome of step `index`, replacing any earlier record.
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome could not be persisted.
    fn set_step_state(&self, index: usize, success: bool) -> Result<(), StoreError>;

    /// Whether step `index` is recorded as completed.
    ///
    /// A missing record reads as `false`, the same as a recorded failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be read.
    fn step_state(&self, index: usize) -> Result<bool, StoreError>;
}

/// Process-local store backed by a map.
///
/// Readers proceed concurrently; writers are exclusive.
#[derive(Debug, Default)]
pub struct InMemoryStepStateStore {
    states: RwLock<HashMap<usize, bool>>,
}

impl InMemoryStepStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded outcome, ordered by step index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked while holding the lock.
    pub fn snapshot(&self) -> Result<BTreeMap<usize, bool>, StoreError> {
        let states = self.states.read().map_err(|_| StoreError::Poisoned)?;
        Ok(states.iter().map(|(index, success)| (*index, *success)).collect())
    }

    /// Forget every recorded outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked while holding the lock.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.states
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }
}

impl StepStateStore for InMemoryStepStateStore {
    fn set_step_state(&self, index: usize, success: bool) -> Result<(), StoreError> {
        self.states
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(index, success);
        Ok(())
    }

    fn step_state(&self, index: usize) -> Result<bool, StoreError> {
        let states = self.states.read().map_err(|_| StoreError::Poisoned)?;
        Ok(states.get(&index).copied().unwrap_or(false))
    }
}
