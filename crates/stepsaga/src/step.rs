use std::fmt;

/// A step in a saga that can be executed and compensated.
///
/// Steps carry no data between each other. Anything a step needs, including
/// shared state it mutates, comes from the context or from the step itself.
///
/// # Type Parameters
///
/// - `Context`: Passed to both actions, unchanged, from [`Saga::execute`](crate::Saga::execute)
/// - `Error`: The error type for step failures
pub trait SagaStep: Send + Sync {
    /// Context passed to both actions.
    type Context;

    /// Error type for step failures.
    type Error;

    /// Human-readable name for logging and error messages.
    ///
    /// Names do not have to be unique; the saga identifies a step by its
    /// position.
    fn name(&self) -> &str;

    /// Execute the forward action.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete.
    fn execute(&self, ctx: &Self::Context) -> Result<(), Self::Error>;

    /// Compensate (undo) the step's effects.
    ///
    /// Called during rollback for every step from the failing one back to
    /// the first, including the failing step itself, so implementations must
    /// cope with a forward action that never finished.
    ///
    /// The default implementation is a no-op, suitable for read-only steps.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    fn compensate(&self, ctx: &Self::Context) -> Result<(), Self::Error> {
        let _ = ctx;
        Ok(())
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}

type Action<Ctx, Err> = Box<dyn Fn(&Ctx) -> Result<(), Err> + Send + Sync>;

/// A step built from a name and two closures.
pub struct FnStep<Ctx, Err> {
    name: String,
    forward: Action<Ctx, Err>,
    compensate: Action<Ctx, Err>,
}

impl<Ctx, Err> FnStep<Ctx, Err> {
    /// Bind `name` to a forward and a compensating action.
    pub fn new<F, C>(name: impl Into<String>, forward: F, compensate: C) -> Self
    where
        F: Fn(&Ctx) -> Result<(), Err> + Send + Sync + 'static,
        C: Fn(&Ctx) -> Result<(), Err> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            forward: Box::new(forward),
            compensate: Box::new(compensate),
        }
    }
}

impl<Ctx, Err> SagaStep for FnStep<Ctx, Err> {
    type Context = Ctx;
    type Error = Err;

    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &Ctx) -> Result<(), Err> {
        (self.forward)(ctx)
    }

    fn compensate(&self, ctx: &Ctx) -> Result<(), Err> {
        (self.compensate)(ctx)
    }
}

impl<Ctx, Err> fmt::Debug for FnStep<Ctx, Err> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
