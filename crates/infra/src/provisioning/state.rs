use tenancy_provisioning::{AdminIdentity, PlanConfiguration, RoleBinding, Tenant};
use tenancy_saga::SagaState;

use super::error::ProvisioningError;

/// Where a provisioning run is.
///
/// `Compensating` and `Failed` can follow any mandatory phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisioningPhase {
    #[default]
    Init,
    DuplicatesChecked,
    PlanResolved,
    TenantCreated,
    AdminCreated,
    RoleBound,
    Committed,
    EmployeeAttempted,
    GrantsAttempted,
    Done,
    Compensating,
    Failed,
}

/// Values produced by earlier steps for later ones.
#[derive(Debug, Default)]
pub struct ProvisioningState {
    pub phase: ProvisioningPhase,
    pub plan: Option<PlanConfiguration>,
    pub tenant: Option<Tenant>,
    pub admin: Option<AdminIdentity>,
    pub binding: Option<RoleBinding>,
    pub employee_code: Option<String>,
}

impl ProvisioningState {
    pub(crate) fn advance(&mut self, phase: ProvisioningPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "provisioning phase");
        self.phase = phase;
    }

    pub(crate) fn plan(&self) -> Result<&PlanConfiguration, ProvisioningError> {
        self.plan
            .as_ref()
            .ok_or(ProvisioningError::MissingState("plan"))
    }

    pub(crate) fn tenant(&self) -> Result<&Tenant, ProvisioningError> {
        self.tenant
            .as_ref()
            .ok_or(ProvisioningError::MissingState("tenant"))
    }

    pub(crate) fn admin(&self) -> Result<&AdminIdentity, ProvisioningError> {
        self.admin
            .as_ref()
            .ok_or(ProvisioningError::MissingState("admin identity"))
    }
}

impl SagaState for ProvisioningState {
    fn on_commit(&mut self) {
        self.advance(ProvisioningPhase::Committed);
    }

    fn on_unwind(&mut self) {
        self.advance(ProvisioningPhase::Compensating);
    }
}
