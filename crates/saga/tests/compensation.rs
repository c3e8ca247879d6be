//! Integration tests for unwinding, including compensations that fail.

use std::cell::RefCell;

use tenancy_saga::{Compensation, SagaBuilder, SagaError, SagaState, SagaStep, StepStatus};

#[derive(Default)]
struct TestContext {
    log: RefCell<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

#[derive(Default)]
struct Ids {
    created: Vec<u32>,
}

impl SagaState for Ids {}

enum Undo {
    Remove(u32),
    Broken(u32),
}

impl Compensation<TestContext, TestError> for Undo {
    fn description(&self) -> String {
        match self {
            Undo::Remove(id) | Undo::Broken(id) => format!("remove {id}"),
        }
    }

    fn compensate(&self, ctx: &TestContext) -> Result<(), TestError> {
        match self {
            Undo::Remove(id) => {
                ctx.log.borrow_mut().push(format!("removed {id}"));
                Ok(())
            }
            Undo::Broken(id) => {
                ctx.log.borrow_mut().push(format!("failed to remove {id}"));
                Err(TestError(format!("store down while removing {id}")))
            }
        }
    }
}

struct Create {
    name: &'static str,
    id: u32,
    broken_undo: bool,
}

impl SagaStep<TestContext, Ids, Undo, TestError> for Create {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&self, _ctx: &TestContext, state: &mut Ids) -> Result<Option<Undo>, TestError> {
        state.created.push(self.id);
        Ok(Some(if self.broken_undo {
            Undo::Broken(self.id)
        } else {
            Undo::Remove(self.id)
        }))
    }
}

struct ReadOnly;

impl SagaStep<TestContext, Ids, Undo, TestError> for ReadOnly {
    fn name(&self) -> &'static str {
        "read_only"
    }

    fn execute(&self, ctx: &TestContext, _state: &mut Ids) -> Result<Option<Undo>, TestError> {
        ctx.log.borrow_mut().push("read".to_string());
        Ok(None)
    }
}

struct Trigger;

impl SagaStep<TestContext, Ids, Undo, TestError> for Trigger {
    fn name(&self) -> &'static str {
        "trigger"
    }

    fn execute(&self, _ctx: &TestContext, _state: &mut Ids) -> Result<Option<Undo>, TestError> {
        Err(TestError("role not found".to_string()))
    }
}

fn create(name: &'static str, id: u32) -> Create {
    Create {
        name,
        id,
        broken_undo: false,
    }
}

#[test]
fn steps_without_compensation_are_skipped_on_unwind() {
    let saga = SagaBuilder::new()
        .step(ReadOnly)
        .step(create("tenant", 1))
        .step(Trigger)
        .build();
    let ctx = TestContext::default();

    let err = saga.execute(&ctx, &mut Ids::default()).unwrap_err();

    assert!(matches!(err, SagaError::StepFailed { .. }));
    assert_eq!(*ctx.log.borrow(), vec!["read", "removed 1"]);
}

#[test]
fn failing_compensation_does_not_stop_older_ones() {
    let saga = SagaBuilder::new()
        .step(create("tenant", 1))
        .step(Create {
            name: "admin",
            id: 2,
            broken_undo: true,
        })
        .step(Trigger)
        .build();
    let ctx = TestContext::default();

    let (result, audit) = saga.execute_with_audit(&ctx, &mut Ids::default());

    assert_eq!(*ctx.log.borrow(), vec!["failed to remove 2", "removed 1"]);
    assert_eq!(audit.steps_with_status(StepStatus::CompensationFailed), vec!["admin"]);
    assert_eq!(audit.steps_with_status(StepStatus::Compensated), vec!["tenant"]);

    let (step_error, compensation_errors) = match result {
        Err(err @ SagaError::CompensationFailed { .. }) => {
            assert_eq!(err.failed_step(), "trigger");
            err.into_parts()
        }
        other => panic!("expected CompensationFailed, got {other:?}"),
    };
    assert_eq!(step_error.0, "role not found");
    assert_eq!(compensation_errors.len(), 1);
    assert_eq!(compensation_errors[0].step, "admin");
    assert_eq!(compensation_errors[0].description, "remove 2");
}

#[test]
fn every_compensation_fails_and_all_are_reported() {
    let saga = SagaBuilder::new()
        .step(Create {
            name: "tenant",
            id: 1,
            broken_undo: true,
        })
        .step(Create {
            name: "admin",
            id: 2,
            broken_undo: true,
        })
        .step(Trigger)
        .build();
    let ctx = TestContext::default();

    let err = saga.execute(&ctx, &mut Ids::default()).unwrap_err();
    let (_, compensation_errors) = err.into_parts();

    let steps: Vec<_> = compensation_errors.iter().map(|e| e.step.as_str()).collect();
    assert_eq!(steps, vec!["admin", "tenant"]);
}

#[test]
fn best_effort_compensations_are_never_run() {
    struct Flaky;

    impl SagaStep<TestContext, Ids, Undo, TestError> for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn execute(&self, _ctx: &TestContext, _state: &mut Ids) -> Result<Option<Undo>, TestError> {
            Err(TestError("grant store unavailable".to_string()))
        }
    }

    let saga = SagaBuilder::new()
        .step(create("tenant", 1))
        .best_effort(create("employee", 3))
        .best_effort(Flaky)
        .build();
    let ctx = TestContext::default();
    let mut ids = Ids::default();

    let report = saga.execute(&ctx, &mut ids).unwrap();

    assert!(ctx.log.borrow().is_empty());
    assert_eq!(ids.created, vec![1, 3]);
    assert_eq!(report.best_effort_failures.len(), 1);
    assert_eq!(report.best_effort_failures[0].error.0, "grant store unavailable");
}
