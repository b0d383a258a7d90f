//! Integration tests for resuming a saga from recorded step state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stepsaga::{
    ExecutionContext, FnStep, InMemoryStepStateStore, Saga, SagaBuilder, StepStateStore,
    StoreError,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

struct Counters {
    forward: Vec<AtomicUsize>,
    compensate: Vec<AtomicUsize>,
}

impl Counters {
    fn new(steps: usize) -> Arc<Self> {
        Arc::new(Self {
            forward: (0..steps).map(|_| AtomicUsize::new(0)).collect(),
            compensate: (0..steps).map(|_| AtomicUsize::new(0)).collect(),
        })
    }

    fn forward(&self, index: usize) -> usize {
        self.forward[index].load(Ordering::SeqCst)
    }

    fn compensate(&self, index: usize) -> usize {
        self.compensate[index].load(Ordering::SeqCst)
    }
}

fn counted_step(
    counters: &Arc<Counters>,
    index: usize,
    fail_until: usize,
) -> FnStep<ExecutionContext, TestError> {
    let forward = Arc::clone(counters);
    let compensate = Arc::clone(counters);
    FnStep::new(
        format!("step{}", index + 1),
        move |_ctx: &ExecutionContext| {
            let call = forward.forward[index].fetch_add(1, Ordering::SeqCst) + 1;
            if call <= fail_until {
                Err(TestError(format!("step{} error", index + 1)))
            } else {
                Ok(())
            }
        },
        move |_ctx: &ExecutionContext| {
            compensate.compensate[index].fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    )
}

fn build_saga(
    store: &Arc<InMemoryStepStateStore>,
    counters: &Arc<Counters>,
    failures: &[usize],
) -> Saga<ExecutionContext, TestError> {
    let mut builder = SagaBuilder::new().with_state_store(store.clone());
    for (index, fail_until) in failures.iter().enumerate() {
        builder = builder.step(counted_step(counters, index, *fail_until));
    }
    builder.build()
}

#[test]
fn all_steps_succeeding_marks_every_index_completed() {
    let store = Arc::new(InMemoryStepStateStore::new());
    let counters = Counters::new(4);
    let saga = build_saga(&store, &counters, &[0, 0, 0, 0]);

    saga.execute(&ExecutionContext::new())
        .expect("saga should succeed");

    for index in 0..4 {
        assert!(store.step_state(index).expect("store readable"));
        assert_eq!(counters.forward(index), 1);
        assert_eq!(counters.compensate(index), 0);
    }
}

#[test]
fn second_run_does_not_repeat_completed_forward_actions() {
    let store = Arc::new(InMemoryStepStateStore::new());
    let counters = Counters::new(4);
    let saga = build_saga(&store, &counters, &[0, 0, 1, 0]);
    let ctx = ExecutionContext::new();

    let err = saga.execute(&ctx).expect_err("step3 fails first");
    assert_eq!(err.to_string(), "executing step step3: step3 error");
    assert_eq!(err.index(), 2);

    saga.execute(&ctx).expect("retry succeeds");

    assert_eq!(counters.forward(0), 1);
    assert_eq!(counters.forward(1), 1);
    assert_eq!(counters.forward(2), 2);
    assert_eq!(counters.forward(3), 1);
    assert_eq!(counters.compensate(2), 1);
    assert_eq!(counters.compensate(1), 1);
    assert_eq!(counters.compensate(0), 1);
    assert_eq!(counters.compensate(3), 0);
}

#[test]
fn new_saga_instance_resumes_from_shared_store() {
    let store = Arc::new(InMemoryStepStateStore::new());
    let counters = Counters::new(3);
    let ctx = ExecutionContext::new();

    let first = build_saga(&store, &counters, &[0, 1, 0]);
    first.execute(&ctx).expect_err("step2 fails");
    drop(first);

    let second = build_saga(&store, &counters, &[0, 1, 0]);
    second.execute(&ctx).expect("resumed run succeeds");

    assert_eq!(counters.forward(0), 1);
    assert_eq!(counters.forward(1), 2);
    assert_eq!(counters.forward(2), 1);
    assert_eq!(
        store
            .snapshot()
            .expect("snapshot should succeed")
            .values()
            .filter(|completed| **completed)
            .count(),
        3
    );
}

#[test]
fn prior_success_record_skips_a_failing_step() {
    let store = Arc::new(InMemoryStepStateStore::new());
    store.set_step_state(0, true).expect("seed record");
    let counters = Counters::new(2);
    let saga = build_saga(&store, &counters, &[usize::MAX, 0]);

    saga.execute(&ExecutionContext::new())
        .expect("step1 is skipped");

    assert_eq!(counters.forward(0), 0);
    assert_eq!(counters.forward(1), 1);
}

#[test]
fn failure_record_does_not_count_as_completed() {
    let store = Arc::new(InMemoryStepStateStore::new());
    store.set_step_state(0, false).expect("seed record");
    let counters = Counters::new(1);
    let saga = build_saga(&store, &counters, &[0]);

    saga.execute(&ExecutionContext::new())
        .expect("step1 runs again");

    assert_eq!(counters.forward(0), 1);
    assert!(store.step_state(0).expect("store readable"));
}

/// Store that only reports success for indices written in this process.
#[derive(Default)]
struct JournalStore {
    writes: Mutex<Vec<(usize, bool)>>,
}

impl StepStateStore for JournalStore {
    fn set_step_state(&self, index: usize, success: bool) -> Result<(), StoreError> {
        self.writes
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push((index, success));
        Ok(())
    }

    fn step_state(&self, index: usize) -> Result<bool, StoreError> {
        let writes = self.writes.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(writes
            .iter()
            .rev()
            .find(|(written, _)| *written == index)
            .is_some_and(|(_, success)| *success))
    }
}

#[test]
fn custom_store_sees_every_outcome_in_order() {
    let store = Arc::new(JournalStore::default());
    let counters = Counters::new(3);
    let mut saga = Saga::builder().with_state_store(store.clone()).build();
    for (index, fail_until) in [0, 0, 1].into_iter().enumerate() {
        saga.add_step(counted_step(&counters, index, fail_until));
    }
    let ctx = ExecutionContext::new();

    saga.execute(&ctx).expect_err("step3 fails first");
    saga.execute(&ctx).expect("retry succeeds");

    let writes = store.writes.lock().expect("journal lock");
    assert_eq!(
        *writes,
        vec![(0, true), (1, true), (2, false), (2, true)]
    );
}
