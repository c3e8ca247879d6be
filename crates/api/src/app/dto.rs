use serde::Serialize;

use tenancy_core::UserId;
use tenancy_infra::{ProvisioningOutcome, ProvisioningWarning};
use tenancy_provisioning::Tenant;

/// Body of a successful `POST /admin/tenants`.
#[derive(Debug, Serialize)]
pub struct ProvisionTenantResponse {
    pub tenant: Tenant,
    pub admin: AdminSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningDto>,
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    /// Null when the employee record could not be written.
    pub employee_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WarningDto {
    pub step: String,
    pub kind: &'static str,
    pub message: String,
}

impl From<ProvisioningWarning> for WarningDto {
    fn from(w: ProvisioningWarning) -> Self {
        Self {
            kind: w.kind().as_str(),
            step: w.step,
            message: w.message,
        }
    }
}

impl From<ProvisioningOutcome> for ProvisionTenantResponse {
    fn from(outcome: ProvisioningOutcome) -> Self {
        Self {
            tenant: outcome.tenant,
            admin: AdminSummary {
                id: outcome.admin.id,
                email: outcome.admin.email,
                display_name: outcome.admin.display_name,
                employee_code: outcome.employee_code,
            },
            warnings: outcome.warnings.into_iter().map(WarningDto::from).collect(),
        }
    }
}
