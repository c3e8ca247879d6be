use tenancy_core::{TenantId, UserId};
use tenancy_provisioning::{OrphanEntityKind, OrphanRecord};
use tenancy_saga::Compensation;

use super::error::ProvisioningError;
use super::StepContext;

/// Undo actions for the mandatory writes.
///
/// A failed undo is escalated: logged at error level and written to the
/// orphan ledger for manual cleanup, then reported to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningCompensation {
    DeleteTenant(TenantId),
    DeleteAdminIdentity(UserId),
}

impl ProvisioningCompensation {
    pub fn describe(&self) -> String {
        match self {
            ProvisioningCompensation::DeleteTenant(id) => format!("delete tenant {id}"),
            ProvisioningCompensation::DeleteAdminIdentity(id) => {
                format!("delete admin identity {id}")
            }
        }
    }

    fn orphan_kind(&self) -> OrphanEntityKind {
        match self {
            ProvisioningCompensation::DeleteTenant(_) => OrphanEntityKind::Tenant,
            ProvisioningCompensation::DeleteAdminIdentity(_) => OrphanEntityKind::AdminIdentity,
        }
    }

    fn entity_id(&self) -> uuid::Uuid {
        match self {
            ProvisioningCompensation::DeleteTenant(id) => *id.as_uuid(),
            ProvisioningCompensation::DeleteAdminIdentity(id) => *id.as_uuid(),
        }
    }

    fn escalate(&self, ctx: &StepContext<'_>, error: &ProvisioningError) {
        tracing::error!(
            saga_id = %ctx.saga_id,
            entity = self.orphan_kind().as_str(),
            entity_id = %self.entity_id(),
            error = %error,
            "compensation failed; row needs manual cleanup"
        );
        let orphan = OrphanRecord {
            saga_id: ctx.saga_id,
            entity_kind: self.orphan_kind(),
            entity_id: self.entity_id(),
            description: self.describe(),
            error: error.to_string(),
            recorded_at: ctx.now,
        };
        if let Err(e) = ctx.stores.orphans.record(&orphan) {
            tracing::error!(
                saga_id = %ctx.saga_id,
                entity_id = %orphan.entity_id,
                error = %e,
                "failed to record orphan"
            );
        }
    }
}

impl<'a> Compensation<StepContext<'a>, ProvisioningError> for ProvisioningCompensation {
    fn description(&self) -> String {
        self.describe()
    }

    fn compensate(&self, ctx: &StepContext<'a>) -> Result<(), ProvisioningError> {
        let result = match self {
            ProvisioningCompensation::DeleteTenant(id) => ctx
                .stores
                .tenants
                .delete(*id)
                .map_err(ProvisioningError::store("delete_tenant")),
            ProvisioningCompensation::DeleteAdminIdentity(id) => ctx
                .stores
                .identities
                .delete(*id)
                .map_err(ProvisioningError::store("delete_admin_identity")),
        };
        if let Err(error) = &result {
            self.escalate(ctx, error);
        }
        result
    }
}
