//! Tenant provisioning orchestrator.
//!
//! Runs the provisioning saga over the store traits:
//!
//! - mandatory: `check_duplicates` → `resolve_plan` → `create_tenant` →
//!   `create_admin_identity` → `bind_tenant_admin_role`
//! - best-effort (after commit): `create_employee_record` → `derive_grants` →
//!   `save_branding` → `emit_audit`
//!
//! A mandatory failure deletes the admin identity and the tenant (in that
//! order) and returns the original error. Best-effort failures are logged and
//! reported as warnings on the successful outcome.

mod clock;
mod compensation;
mod error;
mod grant_deriver;
mod plan_resolver;
mod preconditions;
mod state;
mod steps;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use tenancy_auth::{Argon2SecretHasher, SecretHasher};
use tenancy_core::SagaId;
use tenancy_provisioning::{AdminIdentity, ProvisioningRequest, Tenant};
use tenancy_saga::{Saga, SagaBuilder};

use crate::config::ProvisioningConfig;
use crate::store::{
    AuditSink, BrandingStore, EmployeeStore, GrantCatalogStore, GrantStore, IdentityStore,
    OrphanLedger, RoleStore, TemplateStore, TenantStore,
};

pub use clock::{Clock, FixedClock, SystemClock};
pub use compensation::ProvisioningCompensation;
pub use error::{ErrorKind, ProvisioningError, ProvisioningFailure, ProvisioningWarning};
pub use grant_deriver::{DeriveGrants, apply_plan_grants};
pub use plan_resolver::{ResolvePlan, resolve_plan};
pub use preconditions::CheckDuplicates;
pub use state::{ProvisioningPhase, ProvisioningState};
pub use steps::{
    BindTenantAdminRole, CreateAdminIdentity, CreateEmployeeRecord, CreateTenant, EmitAudit,
    SaveBranding,
};

/// Every collaborator the saga writes through.
#[derive(Clone)]
pub struct ProvisioningStores {
    pub tenants: Arc<dyn TenantStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub roles: Arc<dyn RoleStore>,
    pub employees: Arc<dyn EmployeeStore>,
    pub grants: Arc<dyn GrantStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub grant_catalog: Arc<dyn GrantCatalogStore>,
    pub branding: Arc<dyn BrandingStore>,
    pub audit: Arc<dyn AuditSink>,
    pub orphans: Arc<dyn OrphanLedger>,
}

impl ProvisioningStores {
    /// All stores served by one backend (e.g. a single Postgres pool).
    pub fn shared<S>(backend: Arc<S>) -> Self
    where
        S: TenantStore
            + IdentityStore
            + RoleStore
            + EmployeeStore
            + GrantStore
            + TemplateStore
            + GrantCatalogStore
            + BrandingStore
            + AuditSink
            + OrphanLedger
            + 'static,
    {
        Self {
            tenants: backend.clone(),
            identities: backend.clone(),
            roles: backend.clone(),
            employees: backend.clone(),
            grants: backend.clone(),
            templates: backend.clone(),
            grant_catalog: backend.clone(),
            branding: backend.clone(),
            audit: backend.clone(),
            orphans: backend,
        }
    }
}

/// Shared inputs for one saga run.
pub struct StepContext<'a> {
    pub saga_id: SagaId,
    pub stores: &'a ProvisioningStores,
    pub hasher: &'a dyn SecretHasher,
    pub config: &'a ProvisioningConfig,
    pub request: &'a ProvisioningRequest,
    /// Principal that invoked the operation.
    pub actor: &'a str,
    pub now: DateTime<Utc>,
}

/// A committed provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisioningOutcome {
    pub saga_id: SagaId,
    pub tenant: Tenant,
    pub admin: AdminIdentity,
    /// `None` when the employee record could not be written.
    pub employee_code: Option<String>,
    pub warnings: Vec<ProvisioningWarning>,
}

pub type ProvisioningSaga<'a> =
    Saga<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>;

/// The provisioning steps in order.
pub fn provisioning_saga<'a>() -> ProvisioningSaga<'a> {
    SagaBuilder::new()
        .step(CheckDuplicates)
        .step(ResolvePlan)
        .step(CreateTenant)
        .step(CreateAdminIdentity)
        .step(BindTenantAdminRole)
        .best_effort(CreateEmployeeRecord)
        .best_effort(DeriveGrants)
        .best_effort(SaveBranding)
        .best_effort(EmitAudit)
        .build()
}

/// Creates a tenant together with its first administrator.
#[derive(Clone)]
pub struct TenantProvisioner {
    stores: ProvisioningStores,
    hasher: Arc<dyn SecretHasher>,
    clock: Arc<dyn Clock>,
    config: ProvisioningConfig,
}

impl TenantProvisioner {
    /// Argon2id hashing (peppered per `config`) and the system clock.
    pub fn new(stores: ProvisioningStores, config: ProvisioningConfig) -> Self {
        let hasher = Arc::new(Argon2SecretHasher::new(config.password_pepper.clone()));
        Self {
            stores,
            hasher,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn SecretHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stores(&self) -> &ProvisioningStores {
        &self.stores
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Run the provisioning saga for `request` on behalf of `actor`.
    ///
    /// Blocking: store calls are synchronous. Call from a blocking thread
    /// when the stores need an async runtime.
    #[instrument(
        skip(self, request),
        fields(tenant_code = %request.tenant.code, saga_id = tracing::field::Empty)
    )]
    pub fn provision(
        &self,
        actor: &str,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningOutcome, ProvisioningFailure> {
        let saga_id = SagaId::new();
        tracing::Span::current().record("saga_id", tracing::field::display(saga_id));

        request
            .validate()
            .map_err(|e| ProvisioningFailure::before_saga(saga_id, "validate_request", e.into()))?;

        let ctx = StepContext {
            saga_id,
            stores: &self.stores,
            hasher: self.hasher.as_ref(),
            config: &self.config,
            request,
            actor,
            now: self.clock.now(),
        };
        let mut state = ProvisioningState::default();

        let (result, audit_log) = provisioning_saga().execute_with_audit(&ctx, &mut state);
        tracing::debug!(steps = %audit_log.summary(), "saga finished");

        match result {
            Ok(report) => {
                state.advance(ProvisioningPhase::Done);
                let warnings: Vec<ProvisioningWarning> = report
                    .best_effort_failures
                    .into_iter()
                    .map(|f| ProvisioningWarning {
                        step: f.step,
                        message: f.error.to_string(),
                    })
                    .collect();

                let (Some(tenant), Some(admin)) = (state.tenant, state.admin) else {
                    return Err(ProvisioningFailure::before_saga(
                        saga_id,
                        "commit",
                        ProvisioningError::MissingState("tenant or admin identity"),
                    ));
                };

                tracing::info!(
                    tenant_id = %tenant.id,
                    code = %tenant.code,
                    plan = %tenant.plan_name,
                    warnings = warnings.len(),
                    "tenant provisioned"
                );
                Ok(ProvisioningOutcome {
                    saga_id,
                    tenant,
                    admin,
                    employee_code: state.employee_code,
                    warnings,
                })
            }
            Err(saga_error) => {
                state.advance(ProvisioningPhase::Failed);
                let failed_step = saga_error.failed_step().to_string();
                let (error, compensation_failures) = saga_error.into_parts();

                if compensation_failures.is_empty() {
                    tracing::warn!(step = %failed_step, kind = error.kind().as_str(), error = %error, "provisioning failed");
                } else {
                    tracing::error!(
                        step = %failed_step,
                        kind = error.kind().as_str(),
                        error = %error,
                        compensation_failures = compensation_failures.len(),
                        "provisioning failed and unwind was incomplete"
                    );
                }

                Err(ProvisioningFailure {
                    saga_id,
                    failed_step,
                    error,
                    compensation_failures,
                })
            }
        }
    }
}
