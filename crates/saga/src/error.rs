use std::fmt::Debug;

use thiserror::Error;

/// Error from a failed compensation operation.
#[derive(Debug, thiserror::Error)]
#[error("compensation failed for step '{step}': {description}")]
pub struct CompensationError<E> {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The underlying error.
    #[source]
    pub error: E,
}

/// A best-effort step that failed after commit.
///
/// Never turns the run into a failure; reported alongside the success.
#[derive(Debug)]
pub struct BestEffortFailure<E> {
    pub step: String,
    pub error: E,
}

/// Error from saga execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// A mandatory step failed and all compensations succeeded.
    #[error("step '{step}' failed")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// The error that caused the step to fail.
        #[source]
        source: E,
    },

    /// A mandatory step failed and some compensations also failed.
    #[error("step '{failed_step}' failed, and {} compensation(s) also failed", compensation_errors.len())]
    CompensationFailed {
        /// Name of the step that originally failed.
        failed_step: String,
        /// The error from the failed step.
        step_error: E,
        /// Errors from failed compensations.
        compensation_errors: Vec<CompensationError<E>>,
    },
}

impl<E: Debug> SagaError<E> {
    /// Name of the mandatory step that failed.
    pub fn failed_step(&self) -> &str {
        match self {
            SagaError::StepFailed { step, .. } => step,
            SagaError::CompensationFailed { failed_step, .. } => failed_step,
        }
    }

    /// The originating step error (never a compensation error).
    pub fn step_error(&self) -> &E {
        match self {
            SagaError::StepFailed { source, .. } => source,
            SagaError::CompensationFailed { step_error, .. } => step_error,
        }
    }

    /// Split into the originating error and any compensation failures.
    pub fn into_parts(self) -> (E, Vec<CompensationError<E>>) {
        match self {
            SagaError::StepFailed { source, .. } => (source, Vec::new()),
            SagaError::CompensationFailed {
                step_error,
                compensation_errors,
                ..
            } => (step_error, compensation_errors),
        }
    }
}
