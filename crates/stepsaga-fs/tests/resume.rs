//! A saga that failed with one store instance resumes from a fresh one
//! opened on the same file, as a restarted process would.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use stepsaga::{FnStep, Saga, SagaError};
use stepsaga_fs::FileStepStateStore;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

#[derive(Default)]
struct World {
    reserved: AtomicUsize,
    charged: AtomicUsize,
    shipped: AtomicUsize,
    carrier_online: AtomicBool,
}

fn order_saga(world: &Arc<World>, store: Arc<FileStepStateStore>) -> Saga<(), TestError> {
    let reserve = Arc::clone(world);
    let charge = Arc::clone(world);
    let ship = Arc::clone(world);
    let carrier = Arc::clone(world);

    Saga::builder()
        .with_state_store(store)
        .step(FnStep::new(
            "reserve",
            move |_: &()| {
                reserve.reserved.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            |_: &()| Ok(()),
        ))
        .step(FnStep::new(
            "charge",
            move |_: &()| {
                charge.charged.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            |_: &()| Ok(()),
        ))
        .step(FnStep::new(
            "ship",
            move |_: &()| {
                if carrier.carrier_online.load(Ordering::SeqCst) {
                    carrier.shipped.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                } else {
                    Err(TestError("carrier offline".to_string()))
                }
            },
            move |_: &()| {
                ship.shipped.store(0, Ordering::SeqCst);
                Ok(())
            },
        ))
        .build()
}

fn open(path: &Path) -> anyhow::Result<Arc<FileStepStateStore>> {
    Ok(Arc::new(FileStepStateStore::open(path)?))
}

#[test]
fn retry_in_new_process_skips_completed_steps() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("order-42.toml");
    let world = Arc::new(World::default());

    let first = order_saga(&world, open(&path)?);
    let err = first.execute(&()).expect_err("ship should fail");
    assert!(matches!(err, SagaError::StepFailed { index: 2, .. }));
    drop(first);

    let recorded = FileStepStateStore::open(&path)?.snapshot()?;
    assert_eq!(
        recorded.into_iter().collect::<Vec<_>>(),
        vec![(0, true), (1, true), (2, false)]
    );

    world.carrier_online.store(true, Ordering::SeqCst);
    let second = order_saga(&world, open(&path)?);
    second.execute(&())?;

    assert_eq!(world.reserved.load(Ordering::SeqCst), 1);
    assert_eq!(world.charged.load(Ordering::SeqCst), 1);
    assert_eq!(world.shipped.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn reset_store_runs_every_step_again() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("order-7.toml");
    let world = Arc::new(World::default());
    world.carrier_online.store(true, Ordering::SeqCst);

    order_saga(&world, open(&path)?).execute(&())?;

    let store = open(&path)?;
    store.reset()?;
    order_saga(&world, store).execute(&())?;

    assert_eq!(world.reserved.load(Ordering::SeqCst), 2);
    assert_eq!(world.charged.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn corrupt_file_is_reported_on_open() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("order.toml");
    std::fs::write(&path, "[steps]\n0 = \"yes\"\n")?;

    let err = FileStepStateStore::open(&path).expect_err("value is not a bool");

    assert!(err.to_string().contains("failed to parse step state file"));
    Ok(())
}
