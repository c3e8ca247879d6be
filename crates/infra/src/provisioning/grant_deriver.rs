use tenancy_core::{GrantId, TenantId};
use tenancy_provisioning::{GrantAssignment, PlanConfiguration, normalize_grant_ids, select_grants};
use tenancy_saga::SagaStep;

use super::compensation::ProvisioningCompensation;
use super::error::ProvisioningError;
use super::state::{ProvisioningPhase, ProvisioningState};
use super::{ProvisioningStores, StepContext};

/// Assign the plan's grants to a tenant and refresh its cached grant list.
///
/// The cache is re-read from the tenant's active assignments, not taken from
/// the selection, so running this again for the same tenant and plan leaves
/// the same cache and no duplicate assignments.
pub fn apply_plan_grants(
    stores: &ProvisioningStores,
    tenant_id: TenantId,
    plan: &PlanConfiguration,
) -> Result<Vec<GrantId>, ProvisioningError> {
    let catalog = if plan.explicit_grants().is_some() {
        Vec::new()
    } else {
        stores
            .grant_catalog
            .list_active()
            .map_err(ProvisioningError::store("list_grant_catalog"))?
    };

    for grant_id in select_grants(plan, &catalog) {
        stores
            .grants
            .assign(&GrantAssignment::full_access(tenant_id, grant_id))
            .map_err(ProvisioningError::store("assign_grant"))?;
    }

    let assigned = stores
        .grants
        .list_by_tenant(tenant_id)
        .map_err(ProvisioningError::store("list_tenant_grants"))?;
    let cached = normalize_grant_ids(assigned.into_iter().map(|a| a.grant_id));

    stores
        .tenants
        .update_grant_cache(tenant_id, &cached, plan.template_id)
        .map_err(ProvisioningError::store("update_grant_cache"))?;
    Ok(cached)
}

/// Best-effort.
pub struct DeriveGrants;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for DeriveGrants
{
    fn name(&self) -> &'static str {
        "derive_grants"
    }

    fn execute(
        &self,
        ctx: &StepContext<'a>,
        state: &mut ProvisioningState,
    ) -> Result<Option<ProvisioningCompensation>, ProvisioningError> {
        state.advance(ProvisioningPhase::GrantsAttempted);
        let tenant_id = state.tenant()?.id;
        let plan = state.plan()?;
        let cached = apply_plan_grants(ctx.stores, tenant_id, plan)?;
        let template_id = plan.template_id;

        tracing::info!(tenant_id = %tenant_id, grants = cached.len(), "grants applied");
        if let Some(tenant) = state.tenant.as_mut() {
            tenant.allowed_grant_ids = cached;
            if template_id.is_some() {
                tenant.template_id = template_id;
            }
        }
        Ok(None)
    }
}
