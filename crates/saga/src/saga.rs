use std::fmt::Debug;

use crate::audit::{SagaAuditLog, StepKind};
use crate::compensation::{Compensation, CompensationRegistry};
use crate::error::{BestEffortFailure, CompensationError, SagaError};
use crate::step::{SagaState, SagaStep};

/// Outcome of a committed saga run.
#[derive(Debug)]
pub struct SagaReport<E> {
    /// Best-effort steps that failed after commit, in execution order.
    pub best_effort_failures: Vec<BestEffortFailure<E>>,
}

impl<E> SagaReport<E> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.best_effort_failures.is_empty()
    }
}

/// A compiled saga ready for execution.
///
/// Mandatory steps run in order. If one fails, every compensation registered
/// so far is attempted most-recent-first, even when an earlier attempt fails.
/// Once all mandatory steps succeed the run is committed and best-effort steps
/// run; their failures are collected, never unwound.
pub struct Saga<Ctx, S, C, E> {
    mandatory: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
    best_effort: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
}

impl<Ctx, S, C, E> Saga<Ctx, S, C, E> {
    pub(crate) fn from_steps(
        mandatory: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
        best_effort: Vec<Box<dyn SagaStep<Ctx, S, C, E>>>,
    ) -> Self {
        Self {
            mandatory,
            best_effort,
        }
    }

    /// Names of the mandatory steps, in execution order.
    pub fn mandatory_steps(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mandatory.iter().map(|s| s.name())
    }

    /// Names of the best-effort steps, in execution order.
    pub fn best_effort_steps(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.best_effort.iter().map(|s| s.name())
    }
}

impl<Ctx, S, C, E> Saga<Ctx, S, C, E>
where
    S: SagaState,
    C: Compensation<Ctx, E>,
    E: Debug,
{
    /// Execute the saga.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::StepFailed` if a mandatory step fails and all
    /// compensations succeed, `SagaError::CompensationFailed` if some
    /// compensations also fail.
    pub fn execute(&self, ctx: &Ctx, state: &mut S) -> Result<SagaReport<E>, SagaError<E>> {
        let (result, _audit_log) = self.execute_internal(ctx, state);
        result
    }

    /// Execute the saga and return both the result and an audit log.
    pub fn execute_with_audit(
        &self,
        ctx: &Ctx,
        state: &mut S,
    ) -> (Result<SagaReport<E>, SagaError<E>>, SagaAuditLog) {
        self.execute_internal(ctx, state)
    }

    fn execute_internal(
        &self,
        ctx: &Ctx,
        state: &mut S,
    ) -> (Result<SagaReport<E>, SagaError<E>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        let mut registry = CompensationRegistry::new();

        for step in &self.mandatory {
            let index = audit_log.record_start(step.name(), StepKind::Mandatory);
            match step.execute(ctx, state) {
                Ok(Some(compensation)) => {
                    audit_log.record_success(index, Some(compensation.description()));
                    registry.push(step.name(), index, compensation);
                }
                Ok(None) => audit_log.record_success(index, None),
                Err(error) => {
                    audit_log.record_failure(index);
                    tracing::warn!(
                        step = step.name(),
                        error = ?error,
                        pending = registry.len(),
                        "mandatory step failed; unwinding"
                    );
                    state.on_unwind();
                    let saga_error =
                        Self::compensate(ctx, &mut audit_log, registry, step.name(), error);
                    return (Err(saga_error), audit_log);
                }
            }
        }

        state.on_commit();

        let mut best_effort_failures = Vec::new();
        for step in &self.best_effort {
            let index = audit_log.record_start(step.name(), StepKind::BestEffort);
            match step.execute(ctx, state) {
                // Nothing is unwound after commit, so a returned compensation is dropped.
                Ok(_) => audit_log.record_success(index, None),
                Err(error) => {
                    audit_log.record_best_effort_failure(index);
                    tracing::warn!(step = step.name(), error = ?error, "best-effort step failed");
                    best_effort_failures.push(BestEffortFailure {
                        step: step.name().to_string(),
                        error,
                    });
                }
            }
        }

        (
            Ok(SagaReport {
                best_effort_failures,
            }),
            audit_log,
        )
    }

    fn compensate(
        ctx: &Ctx,
        audit_log: &mut SagaAuditLog,
        registry: CompensationRegistry<C>,
        failed_step: &str,
        step_error: E,
    ) -> SagaError<E> {
        let mut compensation_errors = Vec::new();

        for entry in registry.drain_lifo() {
            let description = entry.action().description();
            match entry.action().compensate(ctx) {
                Ok(()) => {
                    audit_log.record_compensated(entry.step_index());
                    tracing::info!(step = entry.step(), %description, "compensated");
                }
                Err(error) => {
                    audit_log.record_compensation_failed(entry.step_index());
                    tracing::error!(
                        step = entry.step(),
                        %description,
                        error = ?error,
                        "compensation failed"
                    );
                    compensation_errors.push(CompensationError {
                        step: entry.step().to_string(),
                        description,
                        error,
                    });
                }
            }
        }

        if compensation_errors.is_empty() {
            SagaError::StepFailed {
                step: failed_step.to_string(),
                source: step_error,
            }
        } else {
            SagaError::CompensationFailed {
                failed_step: failed_step.to_string(),
                step_error,
                compensation_errors,
            }
        }
    }
}
