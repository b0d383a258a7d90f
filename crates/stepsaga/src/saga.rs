use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::audit::SagaAuditLog;
use crate::builder::SagaBuilder;
use crate::error::{CompensationError, CompensationErrors, SagaError};
use crate::state::{InMemoryStepStateStore, StepStateStore};
use crate::step::SagaStep;

type BoxedStep<Ctx, Err> = Box<dyn SagaStep<Context = Ctx, Error = Err>>;

/// An ordered sequence of steps with compensating rollback.
///
/// Steps run one after another. Each outcome is written to the state store
/// before the next step starts. When a forward action fails, every step from
/// the failing one back to the first is compensated, in reverse order.
///
/// Runs are exclusive per instance: a second concurrent [`execute`](Self::execute)
/// blocks until the first returns. Appending steps needs `&mut self`, so the
/// step list cannot change while a run is in flight.
pub struct Saga<Ctx, Err> {
    steps: Vec<BoxedStep<Ctx, Err>>,
    state_store: Arc<dyn StepStateStore>,
    // Index of the step last attempted. `None` until the first run.
    cursor: Mutex<Option<usize>>,
}

impl<Ctx, Err> Saga<Ctx, Err>
where
    Err: Debug,
{
    /// Create an empty saga backed by a fresh [`InMemoryStepStateStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), Arc::new(InMemoryStepStateStore::new()))
    }

    /// Start configuring a saga with a custom store.
    #[must_use]
    pub fn builder() -> SagaBuilder<Ctx, Err> {
        SagaBuilder::new()
    }

    pub(crate) fn from_parts(
        steps: Vec<BoxedStep<Ctx, Err>>,
        state_store: Arc<dyn StepStateStore>,
    ) -> Self {
        Self {
            steps,
            state_store,
            cursor: Mutex::new(None),
        }
    }

    /// Append a step. Steps run in the order they were added.
    pub fn add_step<S>(&mut self, step: S)
    where
        S: SagaStep<Context = Ctx, Error = Err> + 'static,
    {
        self.steps.push(Box::new(step));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Index of the step the last run attempted, `None` before any run.
    ///
    /// Blocks while a run is in progress.
    #[must_use]
    pub fn current_step(&self) -> Option<usize> {
        *self.lock_cursor()
    }

    /// The store recording step completion.
    #[must_use]
    pub fn state_store(&self) -> Arc<dyn StepStateStore> {
        Arc::clone(&self.state_store)
    }

    /// Run every step not yet recorded as completed.
    ///
    /// Calling this again after a failure retries the saga: steps the store
    /// reports as completed are skipped and their forward action is not
    /// invoked again.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::StateRead` or `SagaError::StateWrite` if the state
    /// store fails; no compensation runs in either case.
    /// Returns `SagaError::StepFailed` if a step fails and all compensations succeed.
    /// Returns `SagaError::CompensationFailed` if a step fails and some compensations also fail.
    pub fn execute(&self, ctx: &Ctx) -> Result<(), SagaError<Err>> {
        let mut audit_log = SagaAuditLog::new();
        self.execute_internal(ctx, &mut audit_log)
    }

    /// Execute the saga and return both the result and an audit log.
    ///
    /// The audit log tracks skipped and executed steps and compensations.
    pub fn execute_with_audit(&self, ctx: &Ctx) -> (Result<(), SagaError<Err>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        let result = self.execute_internal(ctx, &mut audit_log);
        (result, audit_log)
    }

    /// Compensate from the last attempted step back to the first.
    ///
    /// Every step's compensation runs even if a later one failed. The state
    /// store is neither read nor updated. Before any run this does nothing;
    /// after a run that completed every step, all steps are compensated.
    ///
    /// Blocks while a run is in progress.
    ///
    /// # Errors
    ///
    /// Returns every compensation failure, highest step index first.
    pub fn compensate(&self, ctx: &Ctx) -> Result<(), CompensationErrors<Err>> {
        let cursor = self.lock_cursor();
        match *cursor {
            Some(from) => self.compensate_from(ctx, from, &mut SagaAuditLog::new()),
            None => Ok(()),
        }
    }

    fn execute_internal(
        &self,
        ctx: &Ctx,
        audit_log: &mut SagaAuditLog,
    ) -> Result<(), SagaError<Err>> {
        let mut cursor = self.lock_cursor();

        for (index, step) in self.steps.iter().enumerate() {
            *cursor = Some(index);
            let name = step.name();

            let completed = self
                .state_store
                .step_state(index)
                .map_err(|source| SagaError::StateRead {
                    step: name.to_string(),
                    index,
                    source,
                })?;
            if completed {
                debug!(step = name, index, "skipping step completed by an earlier run");
                audit_log.record_skipped(index, name);
                continue;
            }

            audit_log.record_start(index, name);

            if let Err(error) = step.execute(ctx) {
                audit_log.record_failure();
                debug!(step = name, index, "step failed, compensating");
                self.record_outcome(index, name, false)?;

                return Err(match self.compensate_from(ctx, index, audit_log) {
                    Ok(()) => SagaError::StepFailed {
                        step: name.to_string(),
                        index,
                        source: error,
                    },
                    Err(compensation_errors) => SagaError::CompensationFailed {
                        failed_step: name.to_string(),
                        index,
                        step_error: error,
                        compensation_errors,
                    },
                });
            }

            audit_log.record_success(step.compensation_description());
            debug!(step = name, index, "step executed");
            self.record_outcome(index, name, true)?;
        }

        Ok(())
    }

    fn record_outcome(
        &self,
        index: usize,
        name: &str,
        success: bool,
    ) -> Result<(), SagaError<Err>> {
        self.state_store
            .set_step_state(index, success)
            .map_err(|source| SagaError::StateWrite {
                step: name.to_string(),
                index,
                success,
                source,
            })
    }

    fn compensate_from(
        &self,
        ctx: &Ctx,
        from: usize,
        audit_log: &mut SagaAuditLog,
    ) -> Result<(), CompensationErrors<Err>> {
        let mut compensation_errors = Vec::new();

        for index in (0..=from).rev() {
            let step = &self.steps[index];
            let name = step.name();

            match step.compensate(ctx) {
                Ok(()) => {
                    debug!(step = name, index, "step compensated");
                    audit_log.record_compensated(index);
                }
                Err(error) => {
                    warn!(step = name, index, ?error, "step compensation failed");
                    audit_log.record_compensation_failed(index);
                    compensation_errors.push(CompensationError {
                        step: name.to_string(),
                        index,
                        description: step.compensation_description(),
                        error,
                    });
                }
            }
        }

        if compensation_errors.is_empty() {
            Ok(())
        } else {
            Err(CompensationErrors::new(compensation_errors))
        }
    }

    fn lock_cursor(&self) -> MutexGuard<'_, Option<usize>> {
        // A step that panicked mid-run leaves the cursor at a valid index.
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Ctx, Err> Default for Saga<Ctx, Err>
where
    Err: Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx, Err> Debug for Saga<Ctx, Err> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|step| step.name()).collect();
        f.debug_struct("Saga")
            .field("steps", &names)
            .finish_non_exhaustive()
    }
}
