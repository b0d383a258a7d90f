use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use thiserror::Error;

/// Error reported by a [`StepStateStore`](crate::StepStateStore).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing storage could not answer or persist the request.
    #[error("{message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
    },

    /// A lock guarding the records was poisoned by a panicking writer.
    #[error("state store lock poisoned")]
    Poisoned,

    /// Error raised by a custom store implementation.
    #[error(transparent)]
    Backend(Box<dyn StdError + Send + Sync>),
}

impl StoreError {
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn backend<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }
}

/// Error from a single failed compensating action.
#[derive(Debug, Error)]
#[error("compensation failed for step '{step}': {error}")]
pub struct CompensationError<E> {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Position of the step in the saga.
    pub index: usize,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The underlying error.
    #[source]
    pub error: E,
}

/// Every failure collected during one compensation pass.
///
/// Entries are ordered the way compensation visits steps: highest index
/// first.
#[derive(Debug)]
pub struct CompensationErrors<E>(Vec<CompensationError<E>>);

impl<E> CompensationErrors<E> {
    pub(crate) fn new(errors: Vec<CompensationError<E>>) -> Self {
        Self(errors)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompensationError<E>> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<CompensationError<E>> {
        self.0
    }
}

impl<E> std::ops::Index<usize> for CompensationErrors<E> {
    type Output = CompensationError<E>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<'a, E> IntoIterator for &'a CompensationErrors<E> {
    type Item = &'a CompensationError<E>;
    type IntoIter = std::slice::Iter<'a, CompensationError<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<E: Display> Display for CompensationErrors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("compensation failed with errors: [")?;
        for (position, entry) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", entry.error)?;
        }
        f.write_str("]")
    }
}

impl<E> StdError for CompensationErrors<E>
where
    E: StdError + 'static,
{
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0
            .first()
            .map(|entry| entry as &(dyn StdError + 'static))
    }
}

/// Category of a [`SagaError`], for callers that branch on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SagaErrorKind {
    /// The state store could not report a step's completion.
    StateRead,
    /// The state store could not persist a step's outcome.
    StateWrite,
    /// A forward action failed and every compensation succeeded.
    StepExecution,
    /// A forward action failed and at least one compensation failed too.
    Compensation,
}

/// Error from saga execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// Reading a step's completion record failed. Nothing was compensated.
    #[error("retrieving state for step {step}: {source}")]
    StateRead {
        /// Name of the step being looked up.
        step: String,
        /// Position of the step in the saga.
        index: usize,
        #[source]
        source: StoreError,
    },

    /// Persisting a step's outcome failed. Nothing was compensated, even when
    /// the step itself succeeded.
    #[error("setting state for step {step}: {source}")]
    StateWrite {
        /// Name of the step whose outcome could not be recorded.
        step: String,
        /// Position of the step in the saga.
        index: usize,
        /// Outcome that was being recorded.
        success: bool,
        #[source]
        source: StoreError,
    },

    /// A step failed and all compensations succeeded.
    #[error("executing step {step}: {source}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// Position of the step in the saga.
        index: usize,
        /// The error that caused the step to fail.
        #[source]
        source: E,
    },

    /// A step failed and some compensations also failed.
    #[error("compensating after failure in step {failed_step}: {step_error}: {compensation_errors}")]
    CompensationFailed {
        /// Name of the step that originally failed.
        failed_step: String,
        /// Position of the failed step in the saga.
        index: usize,
        /// The error from the failed step.
        step_error: E,
        /// Errors from failed compensations.
        #[source]
        compensation_errors: CompensationErrors<E>,
    },
}

impl<E: Debug> SagaError<E> {
    #[must_use]
    pub fn kind(&self) -> SagaErrorKind {
        match self {
            Self::StateRead { .. } => SagaErrorKind::StateRead,
            Self::StateWrite { .. } => SagaErrorKind::StateWrite,
            Self::StepFailed { .. } => SagaErrorKind::StepExecution,
            Self::CompensationFailed { .. } => SagaErrorKind::Compensation,
        }
    }

    /// Name of the step the error is attributed to.
    #[must_use]
    pub fn step(&self) -> &str {
        match self {
            Self::StateRead { step, .. }
            | Self::StateWrite { step, .. }
            | Self::StepFailed { step, .. } => step,
            Self::CompensationFailed { failed_step, .. } => failed_step,
        }
    }

    /// Position of the step the error is attributed to.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::StateRead { index, .. }
            | Self::StateWrite { index, .. }
            | Self::StepFailed { index, .. }
            | Self::CompensationFailed { index, .. } => *index,
        }
    }

    /// The forward action's error, when a step failed.
    #[must_use]
    pub fn step_error(&self) -> Option<&E> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            Self::CompensationFailed { step_error, .. } => Some(step_error),
            Self::StateRead { .. } | Self::StateWrite { .. } => None,
        }
    }

    /// Compensation failures, when the rollback was incomplete.
    #[must_use]
    pub fn compensation_errors(&self) -> Option<&CompensationErrors<E>> {
        match self {
            Self::CompensationFailed {
                compensation_errors,
                ..
            } => Some(compensation_errors),
            _ => None,
        }
    }
}
