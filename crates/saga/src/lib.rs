//! Saga runner for multi-step operations spanning independently-failable stores.
//!
//! A saga is an ordered list of **mandatory** steps followed by **best-effort**
//! steps. A mandatory step may hand back a compensation; compensations are kept
//! on a [`CompensationRegistry`] and, if a later mandatory step fails, executed
//! most-recent-first. Once every mandatory step has succeeded the saga is
//! committed and best-effort steps run without ever triggering an unwind.

mod audit;
mod builder;
mod compensation;
mod error;
mod saga;
mod step;

pub use audit::{SagaAuditLog, StepKind, StepRecord, StepStatus};
pub use builder::{BestEffortBuilder, SagaBuilder};
pub use compensation::{Compensation, CompensationRegistry, RegisteredCompensation};
pub use error::{BestEffortFailure, CompensationError, SagaError};
pub use saga::{Saga, SagaReport};
pub use step::{SagaState, SagaStep};
