use std::fmt::Debug;
use std::sync::Arc;

use crate::saga::Saga;
use crate::state::{InMemoryStepStateStore, StepStateStore};
use crate::step::SagaStep;

/// Builder for configuring a [`Saga`].
///
/// Without [`with_state_store`](Self::with_state_store) the saga records
/// completion in a fresh [`InMemoryStepStateStore`], which means a retry is
/// only possible through the same `Saga` value. Supply a shared or persistent
/// store to resume from another instance or another process.
///
/// ```
/// use std::sync::Arc;
///
/// use stepsaga::{FnStep, InMemoryStepStateStore, SagaBuilder, StepStateStore};
///
/// let store = Arc::new(InMemoryStepStateStore::new());
/// let saga = SagaBuilder::<(), std::io::Error>::new()
///     .with_state_store(store.clone())
///     .step(FnStep::new("reserve", |_: &()| Ok(()), |_: &()| Ok(())))
///     .build();
///
/// saga.execute(&()).expect("saga should succeed");
/// assert!(store.step_state(0).expect("store readable"));
/// ```
pub struct SagaBuilder<Ctx, Err> {
    steps: Vec<Box<dyn SagaStep<Context = Ctx, Error = Err>>>,
    state_store: Option<Arc<dyn StepStateStore>>,
}

impl<Ctx, Err> SagaBuilder<Ctx, Err>
where
    Err: Debug,
{
    /// Create a builder with no steps and the default store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            state_store: None,
        }
    }

    /// Record step completion in `store` instead of a private in-memory map.
    #[must_use]
    pub fn with_state_store(mut self, store: Arc<dyn StepStateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    /// Append a step.
    #[must_use]
    pub fn step<S>(mut self, step: S) -> Self
    where
        S: SagaStep<Context = Ctx, Error = Err> + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    #[must_use]
    pub fn build(self) -> Saga<Ctx, Err> {
        let state_store = self
            .state_store
            .unwrap_or_else(|| Arc::new(InMemoryStepStateStore::new()));
        Saga::from_parts(self.steps, state_store)
    }
}

impl<Ctx, Err> Default for SagaBuilder<Ctx, Err>
where
    Err: Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
