use std::sync::Arc;

use thiserror::Error;

use tenancy_core::{GrantId, TemplateId, TenantId, UserId};
use tenancy_provisioning::{
    AdminIdentity, AuditEvent, BrandingRecord, CatalogRole, EmployeeRecord, GrantAssignment,
    MenuGrant, OrphanRecord, RoleBinding, SubscriptionTemplate, Tenant,
};

/// Store-level failure.
///
/// Stores only report what happened; the orchestrator decides whether a
/// failure is a conflict, a missing reference or an outage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key already exists (`field` names the key, e.g. `code`, `email`).
    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: String },

    /// The row to update or delete does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connectivity, pool, runtime or serialization failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unique(field: impl Into<String>) -> Self {
        Self::UniqueViolation {
            field: field.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait TenantStore: Send + Sync {
    /// Look up by upper-cased tenant code.
    fn find_by_code(&self, code: &str) -> StoreResult<Option<Tenant>>;
    fn get(&self, id: TenantId) -> StoreResult<Option<Tenant>>;
    /// Insert; a taken code is `UniqueViolation { field: "code" }`.
    fn insert(&self, tenant: &Tenant) -> StoreResult<()>;
    fn delete(&self, id: TenantId) -> StoreResult<()>;
    /// Overwrite the cached grant list (and template reference).
    fn update_grant_cache(
        &self,
        id: TenantId,
        grant_ids: &[GrantId],
        template_id: Option<TemplateId>,
    ) -> StoreResult<()>;
}

pub trait IdentityStore: Send + Sync {
    /// Look up by lower-cased email.
    fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>>;
    fn get(&self, id: UserId) -> StoreResult<Option<AdminIdentity>>;
    /// Insert; a taken email is `UniqueViolation { field: "email" }`.
    fn insert(&self, identity: &AdminIdentity) -> StoreResult<()>;
    fn delete(&self, id: UserId) -> StoreResult<()>;
}

pub trait RoleStore: Send + Sync {
    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<CatalogRole>>;
    fn insert_binding(&self, binding: &RoleBinding) -> StoreResult<()>;
    fn bindings_for_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleBinding>>;
}

pub trait EmployeeStore: Send + Sync {
    fn insert(&self, employee: &EmployeeRecord) -> StoreResult<()>;
    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<EmployeeRecord>>;
}

pub trait GrantStore: Send + Sync {
    /// Insert if absent. Assigning an existing (tenant, grant) pair is a no-op.
    fn assign(&self, assignment: &GrantAssignment) -> StoreResult<()>;
    /// Active assignments for the tenant.
    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<GrantAssignment>>;
}

pub trait TemplateStore: Send + Sync {
    fn get(&self, id: TemplateId) -> StoreResult<Option<SubscriptionTemplate>>;
}

pub trait GrantCatalogStore: Send + Sync {
    fn list_active(&self) -> StoreResult<Vec<MenuGrant>>;
}

pub trait BrandingStore: Send + Sync {
    fn upsert(&self, branding: &BrandingRecord) -> StoreResult<()>;
    fn get(&self, tenant_id: TenantId) -> StoreResult<Option<BrandingRecord>>;
}

/// Append-only audit trail.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> StoreResult<()>;
}

/// Rows left behind by failed compensations, awaiting manual cleanup.
pub trait OrphanLedger: Send + Sync {
    fn record(&self, orphan: &OrphanRecord) -> StoreResult<()>;
    fn list(&self) -> StoreResult<Vec<OrphanRecord>>;
}

impl<S> TenantStore for Arc<S>
where
    S: TenantStore + ?Sized,
{
    fn find_by_code(&self, code: &str) -> StoreResult<Option<Tenant>> {
        (**self).find_by_code(code)
    }

    fn get(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        (**self).get(id)
    }

    fn insert(&self, tenant: &Tenant) -> StoreResult<()> {
        (**self).insert(tenant)
    }

    fn delete(&self, id: TenantId) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn update_grant_cache(
        &self,
        id: TenantId,
        grant_ids: &[GrantId],
        template_id: Option<TemplateId>,
    ) -> StoreResult<()> {
        (**self).update_grant_cache(id, grant_ids, template_id)
    }
}

impl<S> IdentityStore for Arc<S>
where
    S: IdentityStore + ?Sized,
{
    fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>> {
        (**self).find_by_email(email)
    }

    fn get(&self, id: UserId) -> StoreResult<Option<AdminIdentity>> {
        (**self).get(id)
    }

    fn insert(&self, identity: &AdminIdentity) -> StoreResult<()> {
        (**self).insert(identity)
    }

    fn delete(&self, id: UserId) -> StoreResult<()> {
        (**self).delete(id)
    }
}

impl<S> RoleStore for Arc<S>
where
    S: RoleStore + ?Sized,
{
    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<CatalogRole>> {
        (**self).find_role_by_name(name)
    }

    fn insert_binding(&self, binding: &RoleBinding) -> StoreResult<()> {
        (**self).insert_binding(binding)
    }

    fn bindings_for_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleBinding>> {
        (**self).bindings_for_tenant(tenant_id)
    }
}

impl<S> EmployeeStore for Arc<S>
where
    S: EmployeeStore + ?Sized,
{
    fn insert(&self, employee: &EmployeeRecord) -> StoreResult<()> {
        (**self).insert(employee)
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<EmployeeRecord>> {
        (**self).list_by_tenant(tenant_id)
    }
}

impl<S> GrantStore for Arc<S>
where
    S: GrantStore + ?Sized,
{
    fn assign(&self, assignment: &GrantAssignment) -> StoreResult<()> {
        (**self).assign(assignment)
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<GrantAssignment>> {
        (**self).list_by_tenant(tenant_id)
    }
}

impl<S> TemplateStore for Arc<S>
where
    S: TemplateStore + ?Sized,
{
    fn get(&self, id: TemplateId) -> StoreResult<Option<SubscriptionTemplate>> {
        (**self).get(id)
    }
}

impl<S> GrantCatalogStore for Arc<S>
where
    S: GrantCatalogStore + ?Sized,
{
    fn list_active(&self) -> StoreResult<Vec<MenuGrant>> {
        (**self).list_active()
    }
}

impl<S> BrandingStore for Arc<S>
where
    S: BrandingStore + ?Sized,
{
    fn upsert(&self, branding: &BrandingRecord) -> StoreResult<()> {
        (**self).upsert(branding)
    }

    fn get(&self, tenant_id: TenantId) -> StoreResult<Option<BrandingRecord>> {
        (**self).get(tenant_id)
    }
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn append(&self, event: &AuditEvent) -> StoreResult<()> {
        (**self).append(event)
    }
}

impl<S> OrphanLedger for Arc<S>
where
    S: OrphanLedger + ?Sized,
{
    fn record(&self, orphan: &OrphanRecord) -> StoreResult<()> {
        (**self).record(orphan)
    }

    fn list(&self) -> StoreResult<Vec<OrphanRecord>> {
        (**self).list()
    }
}
