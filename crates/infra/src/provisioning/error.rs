use thiserror::Error;

use tenancy_auth::HashError;
use tenancy_core::{DomainError, SagaId, TemplateId};
use tenancy_saga::CompensationError;

use crate::store::StoreError;

/// Classification every provisioning failure maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input; nothing was written.
    Validation,
    /// Duplicate tenant code or admin email (pre-check or constraint).
    Conflict,
    /// Referenced template or required catalog role is missing.
    NotFound,
    /// A store or hasher failed for infrastructural reasons.
    DependencyFailure,
    /// An unwind action failed; rows may be orphaned.
    CompensationFailure,
    /// A post-commit step failed; the tenant exists regardless.
    BestEffortFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DependencyFailure => "dependency_failure",
            ErrorKind::CompensationFailure => "compensation_failure",
            ErrorKind::BestEffortFailure => "best_effort_failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("{0}")]
    Validation(String),

    #[error("{field} already exists")]
    Conflict { field: String },

    #[error("subscription template {0} not found")]
    TemplateNotFound(TemplateId),

    #[error("role '{0}' not found in role catalog")]
    RoleNotFound(String),

    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Domain(DomainError),

    /// A step ran before the step that produces its input.
    #[error("saga state has no {0}")]
    MissingState(&'static str),
}

impl ProvisioningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisioningError::Validation(_) => ErrorKind::Validation,
            ProvisioningError::Conflict { .. } => ErrorKind::Conflict,
            ProvisioningError::TemplateNotFound(_) | ProvisioningError::RoleNotFound(_) => {
                ErrorKind::NotFound
            }
            ProvisioningError::Store { .. }
            | ProvisioningError::Hash(_)
            | ProvisioningError::Domain(_)
            | ProvisioningError::MissingState(_) => ErrorKind::DependencyFailure,
        }
    }

    /// Wrap a store failure; unique violations become conflicts.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::UniqueViolation { field } => ProvisioningError::Conflict { field },
            source => ProvisioningError::Store { operation, source },
        }
    }
}

impl From<DomainError> for ProvisioningError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ProvisioningError::Validation(msg),
            other => ProvisioningError::Domain(other),
        }
    }
}

/// A provisioning run that did not commit.
///
/// `error` is always the fault that stopped the run. Failed unwind actions
/// are attached, never substituted for it.
#[derive(Debug, Error)]
#[error("provisioning failed at '{failed_step}': {error}")]
pub struct ProvisioningFailure {
    pub saga_id: SagaId,
    pub failed_step: String,
    #[source]
    pub error: ProvisioningError,
    pub compensation_failures: Vec<CompensationError<ProvisioningError>>,
}

impl ProvisioningFailure {
    pub(crate) fn before_saga(saga_id: SagaId, step: &str, error: ProvisioningError) -> Self {
        Self {
            saga_id,
            failed_step: step.to_string(),
            error,
            compensation_failures: Vec::new(),
        }
    }

    /// Kind of the originating fault.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// True when the run may have left rows behind.
    pub fn left_orphans(&self) -> bool {
        !self.compensation_failures.is_empty()
    }

    /// `CompensationFailure` when the unwind was incomplete. Reported next to
    /// the originating kind, never in place of it.
    pub fn compensation_kind(&self) -> Option<ErrorKind> {
        self.left_orphans().then_some(ErrorKind::CompensationFailure)
    }
}

/// A post-commit step that failed. Logged, never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningWarning {
    pub step: String,
    pub message: String,
}

impl ProvisioningWarning {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::BestEffortFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = ProvisioningError::store("insert_tenant")(StoreError::unique("code"));
        assert!(matches!(&err, ProvisioningError::Conflict { field } if field == "code"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn outage_is_dependency_failure() {
        let err = ProvisioningError::store("insert_tenant")(StoreError::Unavailable("down".into()));
        assert_eq!(err.kind(), ErrorKind::DependencyFailure);
        assert_eq!(err.to_string(), "insert_tenant failed: store unavailable: down");
    }

    #[test]
    fn missing_references_are_not_found() {
        assert_eq!(
            ProvisioningError::RoleNotFound("TENANT_ADMIN".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ProvisioningError::TemplateNotFound(TemplateId::new()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn domain_validation_maps_to_validation_kind() {
        let err: ProvisioningError = DomainError::validation("tenant.code is required").into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "tenant.code is required");
    }
}
