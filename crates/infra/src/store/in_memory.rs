//! In-memory stores for tests/dev.
//!
//! Each store enforces the same unique keys as the Postgres schema and can be
//! told to fail specific operations (see [`Faults`]).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use tenancy_core::{GrantId, RoleId, TemplateId, TenantId, UserId};
use tenancy_provisioning::{
    AdminIdentity, AuditEvent, BrandingRecord, CatalogRole, EmployeeRecord, GrantAssignment,
    MenuGrant, OrphanRecord, RoleBinding, SubscriptionTemplate, Tenant,
};

use super::r#trait::{
    AuditSink, BrandingStore, EmployeeStore, GrantCatalogStore, GrantStore, IdentityStore,
    OrphanLedger, RoleStore, StoreError, StoreResult, TemplateStore, TenantStore,
};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// Operations an in-memory store has been told to fail.
#[derive(Debug, Default)]
pub struct Faults {
    failing: RwLock<HashSet<&'static str>>,
}

impl Faults {
    /// Make every later call of `operation` return `StoreError::Unavailable`.
    pub fn fail(&self, operation: &'static str) {
        if let Ok(mut set) = self.failing.write() {
            set.insert(operation);
        }
    }

    pub fn heal(&self, operation: &'static str) {
        if let Ok(mut set) = self.failing.write() {
            set.remove(operation);
        }
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        let set = self.failing.read().map_err(|_| poisoned())?;
        if set.contains(operation) {
            return Err(StoreError::Unavailable(format!("injected failure: {operation}")));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    inner: RwLock<HashMap<TenantId, Tenant>>,
    faults: Faults,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TenantStore for InMemoryTenantStore {
    fn find_by_code(&self, code: &str) -> StoreResult<Option<Tenant>> {
        self.faults.check("find")?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|t| t.code == code).cloned())
    }

    fn get(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        self.faults.check("get")?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn insert(&self, tenant: &Tenant) -> StoreResult<()> {
        self.faults.check("insert")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.values().any(|t| t.code == tenant.code) {
            return Err(StoreError::unique("code"));
        }
        map.insert(tenant.id, tenant.clone());
        Ok(())
    }

    fn delete(&self, id: TenantId) -> StoreResult<()> {
        self.faults.check("delete")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tenant {id}")))
    }

    fn update_grant_cache(
        &self,
        id: TenantId,
        grant_ids: &[GrantId],
        template_id: Option<TemplateId>,
    ) -> StoreResult<()> {
        self.faults.check("update_grant_cache")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let tenant = map
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {id}")))?;
        tenant.allowed_grant_ids = grant_ids.to_vec();
        if template_id.is_some() {
            tenant.template_id = template_id;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<HashMap<UserId, AdminIdentity>>,
    faults: Faults,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>> {
        self.faults.check("find")?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    fn get(&self, id: UserId) -> StoreResult<Option<AdminIdentity>> {
        self.faults.check("get")?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn insert(&self, identity: &AdminIdentity) -> StoreResult<()> {
        self.faults.check("insert")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.values().any(|u| u.email == identity.email) {
            return Err(StoreError::unique("email"));
        }
        map.insert(identity.id, identity.clone());
        Ok(())
    }

    fn delete(&self, id: UserId) -> StoreResult<()> {
        self.faults.check("delete")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("admin identity {id}")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<RoleId, CatalogRole>>,
    bindings: RwLock<Vec<RoleBinding>>,
    faults: Faults,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role to the catalog.
    pub fn with_role(self, name: &str) -> Self {
        if let Ok(mut roles) = self.roles.write() {
            let role = CatalogRole {
                id: RoleId::new(),
                name: name.to_string(),
            };
            roles.insert(role.id, role);
        }
        self
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

impl RoleStore for InMemoryRoleStore {
    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<CatalogRole>> {
        self.faults.check("find_role")?;
        let roles = self.roles.read().map_err(|_| poisoned())?;
        Ok(roles.values().find(|r| r.name == name).cloned())
    }

    fn insert_binding(&self, binding: &RoleBinding) -> StoreResult<()> {
        self.faults.check("insert_binding")?;
        let mut bindings = self.bindings.write().map_err(|_| poisoned())?;
        if bindings.iter().any(|b| {
            b.user_id == binding.user_id && b.role_id == binding.role_id && b.tenant_id == binding.tenant_id
        }) {
            return Err(StoreError::unique("role_binding"));
        }
        bindings.push(binding.clone());
        Ok(())
    }

    fn bindings_for_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleBinding>> {
        let bindings = self.bindings.read().map_err(|_| poisoned())?;
        Ok(bindings
            .iter()
            .filter(|b| b.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEmployeeStore {
    inner: RwLock<Vec<EmployeeRecord>>,
    faults: Faults,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

impl EmployeeStore for InMemoryEmployeeStore {
    fn insert(&self, employee: &EmployeeRecord) -> StoreResult<()> {
        self.faults.check("insert")?;
        let mut rows = self.inner.write().map_err(|_| poisoned())?;
        if rows
            .iter()
            .any(|e| e.tenant_id == employee.tenant_id && e.code == employee.code)
        {
            return Err(StoreError::unique("employee_code"));
        }
        rows.push(employee.clone());
        Ok(())
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<EmployeeRecord>> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows.iter().filter(|e| e.tenant_id == tenant_id).cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    inner: RwLock<BTreeMap<(TenantId, GrantId), GrantAssignment>>,
    faults: Faults,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Total rows across all tenants.
    pub fn row_count(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl GrantStore for InMemoryGrantStore {
    fn assign(&self, assignment: &GrantAssignment) -> StoreResult<()> {
        self.faults.check("assign")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.entry((assignment.tenant_id, assignment.grant_id))
            .or_insert_with(|| assignment.clone());
        Ok(())
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<GrantAssignment>> {
        self.faults.check("list")?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .values()
            .filter(|a| a.tenant_id == tenant_id && a.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    inner: RwLock<HashMap<TemplateId, SubscriptionTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, template: SubscriptionTemplate) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(template.id, template);
        }
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn get(&self, id: TemplateId) -> StoreResult<Option<SubscriptionTemplate>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGrantCatalog {
    inner: RwLock<Vec<MenuGrant>>,
}

impl InMemoryGrantCatalog {
    pub fn new(grants: Vec<MenuGrant>) -> Self {
        Self {
            inner: RwLock::new(grants),
        }
    }
}

impl GrantCatalogStore for InMemoryGrantCatalog {
    fn list_active(&self) -> StoreResult<Vec<MenuGrant>> {
        let grants = self.inner.read().map_err(|_| poisoned())?;
        Ok(grants.iter().filter(|g| g.is_active).cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBrandingStore {
    inner: RwLock<HashMap<TenantId, BrandingRecord>>,
    faults: Faults,
}

impl InMemoryBrandingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

impl BrandingStore for InMemoryBrandingStore {
    fn upsert(&self, branding: &BrandingRecord) -> StoreResult<()> {
        self.faults.check("upsert")?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(branding.tenant_id, branding.clone());
        Ok(())
    }

    fn get(&self, tenant_id: TenantId) -> StoreResult<Option<BrandingRecord>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&tenant_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    faults: Faults,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> StoreResult<()> {
        self.faults.check("append")?;
        let mut events = self.events.write().map_err(|_| poisoned())?;
        events.push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrphanLedger {
    inner: RwLock<Vec<OrphanRecord>>,
}

impl InMemoryOrphanLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrphanLedger for InMemoryOrphanLedger {
    fn record(&self, orphan: &OrphanRecord) -> StoreResult<()> {
        let mut rows = self.inner.write().map_err(|_| poisoned())?;
        rows.push(orphan.clone());
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<OrphanRecord>> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use tenancy_provisioning::{
        AdminInput, PlanCatalogEntry, PlanConfiguration, ProvisioningRequest, TenantInput,
    };

    use super::*;

    fn tenant(code: &str) -> Tenant {
        let request = ProvisioningRequest {
            tenant: TenantInput {
                name: code.to_string(),
                code: code.to_string(),
                ..TenantInput::default()
            },
            admin: AdminInput::default(),
        };
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let plan = PlanConfiguration::from_catalog(PlanCatalogEntry::trial(), start).unwrap();
        Tenant::from_request(TenantId::new(), &request, &plan, Utc::now())
    }

    #[test]
    fn duplicate_tenant_code_is_a_unique_violation() {
        let store = InMemoryTenantStore::new();
        store.insert(&tenant("ACME")).unwrap();

        let err = store.insert(&tenant("ACME")).unwrap_err();
        assert_eq!(err, StoreError::unique("code"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn injected_fault_fails_only_that_operation() {
        let store = InMemoryTenantStore::new();
        store.faults().fail("delete");

        let t = tenant("ACME");
        store.insert(&t).unwrap();
        assert!(matches!(store.delete(t.id), Err(StoreError::Unavailable(_))));

        store.faults().heal("delete");
        store.delete(t.id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn deleting_missing_tenant_is_not_found() {
        let store = InMemoryTenantStore::new();
        assert!(matches!(store.delete(TenantId::new()), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn grant_assign_is_idempotent() {
        let store = InMemoryGrantStore::new();
        let tenant_id = TenantId::new();
        let a = GrantAssignment::full_access(tenant_id, GrantId::new(3));

        store.assign(&a).unwrap();
        store.assign(&a).unwrap();

        assert_eq!(store.row_count(), 1);
        assert_eq!(store.list_by_tenant(tenant_id).unwrap(), vec![a]);
    }

    #[test]
    fn grant_cache_update_keeps_existing_template_when_none_given() {
        let store = InMemoryTenantStore::new();
        let mut t = tenant("ACME");
        let template_id = TemplateId::new();
        t.template_id = Some(template_id);
        store.insert(&t).unwrap();

        store
            .update_grant_cache(t.id, &[GrantId::new(1), GrantId::new(2)], None)
            .unwrap();

        let stored = store.get(t.id).unwrap().unwrap();
        assert_eq!(stored.allowed_grant_ids, vec![GrantId::new(1), GrantId::new(2)]);
        assert_eq!(stored.template_id, Some(template_id));
    }
}
