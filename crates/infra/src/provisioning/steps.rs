//! Saga steps that write the tenant, its admin and their satellites.

use serde_json::json;

use tenancy_core::{AuditEventId, EmployeeId, RoleBindingId, TenantId, UserId};
use tenancy_provisioning::{
    AdminIdentity, AuditEvent, BrandingRecord, EmployeeRecord, RoleBinding, Tenant,
    EMPLOYEE_DESIGNATION, TENANT_PROVISIONED_ACTION, employee_code,
};
use tenancy_saga::SagaStep;

use super::compensation::ProvisioningCompensation;
use super::error::ProvisioningError;
use super::state::{ProvisioningPhase, ProvisioningState};
use super::StepContext;

type StepResult = Result<Option<ProvisioningCompensation>, ProvisioningError>;

/// Mandatory. Undone by deleting the tenant.
pub struct CreateTenant;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for CreateTenant
{
    fn name(&self) -> &'static str {
        "create_tenant"
    }

    fn execute(&self, ctx: &StepContext<'a>, state: &mut ProvisioningState) -> StepResult {
        let tenant = Tenant::from_request(TenantId::new(), ctx.request, state.plan()?, ctx.now);
        ctx.stores
            .tenants
            .insert(&tenant)
            .map_err(ProvisioningError::store("insert_tenant"))?;

        tracing::info!(tenant_id = %tenant.id, code = %tenant.code, plan = %tenant.plan_name, "tenant created");
        let undo = ProvisioningCompensation::DeleteTenant(tenant.id);
        state.tenant = Some(tenant);
        state.advance(ProvisioningPhase::TenantCreated);
        Ok(Some(undo))
    }
}

/// Mandatory. Undone by deleting the identity.
pub struct CreateAdminIdentity;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for CreateAdminIdentity
{
    fn name(&self) -> &'static str {
        "create_admin_identity"
    }

    fn execute(&self, ctx: &StepContext<'a>, state: &mut ProvisioningState) -> StepResult {
        let password_hash = ctx.hasher.hash(&ctx.request.admin.password)?;
        let admin = AdminIdentity::new(
            UserId::new(),
            ctx.request.admin_email(),
            &ctx.request.admin,
            password_hash,
            ctx.now,
        );
        ctx.stores
            .identities
            .insert(&admin)
            .map_err(ProvisioningError::store("insert_admin_identity"))?;

        tracing::info!(user_id = %admin.id, "admin identity created");
        let undo = ProvisioningCompensation::DeleteAdminIdentity(admin.id);
        state.admin = Some(admin);
        state.advance(ProvisioningPhase::AdminCreated);
        Ok(Some(undo))
    }
}

/// Mandatory, last before commit. Pushes no undo; its failure still unwinds
/// the tenant and identity.
pub struct BindTenantAdminRole;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for BindTenantAdminRole
{
    fn name(&self) -> &'static str {
        "bind_tenant_admin_role"
    }

    fn execute(&self, ctx: &StepContext<'a>, state: &mut ProvisioningState) -> StepResult {
        let role_name = ctx.config.tenant_admin_role.as_str();
        let role = ctx
            .stores
            .roles
            .find_role_by_name(role_name)
            .map_err(ProvisioningError::store("find_role_by_name"))?
            .ok_or_else(|| {
                tracing::error!(
                    role = role_name,
                    "configuration defect: tenant admin role missing from role catalog"
                );
                ProvisioningError::RoleNotFound(role_name.to_string())
            })?;

        let binding = RoleBinding {
            id: RoleBindingId::new(),
            user_id: state.admin()?.id,
            role_id: role.id,
            tenant_id: state.tenant()?.id,
        };
        ctx.stores
            .roles
            .insert_binding(&binding)
            .map_err(ProvisioningError::store("insert_role_binding"))?;

        state.binding = Some(binding);
        state.advance(ProvisioningPhase::RoleBound);
        Ok(None)
    }
}

/// Best-effort. Sets the employee code on success.
pub struct CreateEmployeeRecord;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for CreateEmployeeRecord
{
    fn name(&self) -> &'static str {
        "create_employee_record"
    }

    fn execute(&self, ctx: &StepContext<'a>, state: &mut ProvisioningState) -> StepResult {
        state.advance(ProvisioningPhase::EmployeeAttempted);
        let tenant = state.tenant()?;
        let admin = state.admin()?;
        let code = employee_code(&tenant.code, state.plan()?.prefix, 1);

        let employee = EmployeeRecord {
            id: EmployeeId::new(),
            tenant_id: tenant.id,
            user_id: admin.id,
            code: code.clone(),
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            email: admin.email.clone(),
            designation: EMPLOYEE_DESIGNATION.to_string(),
        };
        ctx.stores
            .employees
            .insert(&employee)
            .map_err(ProvisioningError::store("insert_employee"))?;

        state.employee_code = Some(code);
        Ok(None)
    }
}

/// Best-effort. Skipped when the request carries no branding.
pub struct SaveBranding;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for SaveBranding
{
    fn name(&self) -> &'static str {
        "save_branding"
    }

    fn execute(&self, ctx: &StepContext<'a>, state: &mut ProvisioningState) -> StepResult {
        let Some(input) = ctx.request.branding() else {
            return Ok(None);
        };
        let record = BrandingRecord::from_input(state.tenant()?.id, input);
        ctx.stores
            .branding
            .upsert(&record)
            .map_err(ProvisioningError::store("upsert_branding"))?;
        Ok(None)
    }
}

/// Best-effort. Records who provisioned what.
pub struct EmitAudit;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for EmitAudit
{
    fn name(&self) -> &'static str {
        "emit_audit"
    }

    fn execute(&self, ctx: &StepContext<'a>, state: &mut ProvisioningState) -> StepResult {
        let tenant = state.tenant()?;
        let admin = state.admin()?;
        let event = AuditEvent {
            id: AuditEventId::new(),
            actor: ctx.actor.to_string(),
            action: TENANT_PROVISIONED_ACTION.to_string(),
            tenant_id: tenant.id,
            target_user_id: Some(admin.id),
            details: json!({
                "saga_id": ctx.saga_id,
                "tenant_code": tenant.code,
                "tenant_name": tenant.name,
                "plan": tenant.plan_name,
                "subscription_status": tenant.subscription_status,
                "template_id": tenant.template_id,
                "admin_email": admin.email,
                "employee_code": state.employee_code,
                "grant_count": tenant.allowed_grant_ids.len(),
            }),
            occurred_at: ctx.now,
        };
        ctx.stores
            .audit
            .append(&event)
            .map_err(ProvisioningError::store("append_audit"))?;
        Ok(None)
    }
}
