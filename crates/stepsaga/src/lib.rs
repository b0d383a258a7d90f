//! Saga orchestration with resumable, compensating steps.
//!
//! A [`Saga`] runs an ordered list of [`SagaStep`]s. Every step has a forward
//! action and a compensating action. When a forward action fails, the saga
//! compensates every step from the failing one back to the first, in reverse
//! order, and reports the failure.
//!
//! Completion of each step is recorded in a [`StepStateStore`]. Calling
//! [`Saga::execute`] again after a failure skips the steps the store already
//! knows succeeded, so a retry only re-runs the unfinished tail.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use stepsaga::{ExecutionContext, FnStep, Saga};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("{0}")]
//! struct OrderError(String);
//!
//! let balance = Arc::new(Mutex::new(100_i64));
//! let debit = Arc::clone(&balance);
//! let refund = Arc::clone(&balance);
//!
//! let mut saga: Saga<ExecutionContext, OrderError> = Saga::new();
//! saga.add_step(FnStep::new(
//!     "charge",
//!     move |_ctx: &ExecutionContext| -> Result<(), OrderError> {
//!         *debit.lock().map_err(|e| OrderError(e.to_string()))? -= 30;
//!         Ok(())
//!     },
//!     move |_ctx: &ExecutionContext| -> Result<(), OrderError> {
//!         *refund.lock().map_err(|e| OrderError(e.to_string()))? += 30;
//!         Ok(())
//!     },
//! ));
//! saga.add_step(FnStep::new(
//!     "ship",
//!     |_ctx: &ExecutionContext| Err(OrderError("carrier offline".to_string())),
//!     |_ctx: &ExecutionContext| Ok(()),
//! ));
//!
//! let err = saga
//!     .execute(&ExecutionContext::new())
//!     .expect_err("shipping fails");
//! assert_eq!(err.to_string(), "executing step ship: carrier offline");
//! assert_eq!(*balance.lock().expect("balance lock"), 100);
//! ```

mod audit;
mod builder;
mod context;
mod error;
mod saga;
mod state;
mod step;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use builder::SagaBuilder;
pub use context::{CancellationToken, ExecutionContext, Interrupted};
pub use error::{CompensationError, CompensationErrors, SagaError, SagaErrorKind, StoreError};
pub use saga::Saga;
pub use state::{InMemoryStepStateStore, StepStateStore};
pub use step::{FnStep, SagaStep};
