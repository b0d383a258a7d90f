//! Persistent [`StepStateStore`](stepsaga::StepStateStore) for `stepsaga`.
//!
//! [`FileStepStateStore`] keeps completion records in a TOML file so a saga
//! that failed in one process can be retried from another:
//!
//! ```toml
//! [steps]
//! 0 = true
//! 1 = false
//! ```
//!
//! ```
//! use std::sync::Arc;
//!
//! use stepsaga::{FnStep, Saga};
//! use stepsaga_fs::FileStepStateStore;
//!
//! let dir = tempfile::tempdir().expect("temp dir");
//! let store = Arc::new(FileStepStateStore::open(dir.path().join("saga.toml")).expect("open"));
//!
//! let saga = Saga::<(), std::io::Error>::builder()
//!     .with_state_store(store.clone())
//!     .step(FnStep::new("reserve", |_: &()| Ok(()), |_: &()| Ok(())))
//!     .build();
//! saga.execute(&()).expect("saga should succeed");
//!
//! let reopened = FileStepStateStore::open(store.path()).expect("reopen");
//! assert_eq!(reopened.snapshot().expect("snapshot").get(&0), Some(&true));
//! ```

mod error;
mod store;

pub use error::FileStoreError;
pub use store::FileStepStateStore;
