//! Postgres-backed provisioning stores.
//!
//! One pool serves every store trait. The traits are synchronous; each call
//! blocks on the current tokio runtime, so callers must run on a blocking
//! thread (`tokio::task::spawn_blocking`), never on an async worker.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation { field }` (from the constraint name) |
//! | Database (other) | any other | `Unavailable` |
//! | PoolClosed / Io / Tls / other | N/A | `Unavailable` |

use std::future::Future;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use tenancy_core::{
    EmployeeId, GrantId, RoleBindingId, RoleId, SagaId, TemplateId, TenantId, UserId,
};
use tenancy_provisioning::{
    AdminIdentity, AuditEvent, BrandingRecord, CatalogRole, EmployeeRecord, GrantAssignment,
    Limits, MenuGrant, OrphanEntityKind, OrphanRecord, RoleBinding, SubscriptionStatus,
    SubscriptionTemplate, Tenant,
};

use super::r#trait::{
    AuditSink, BrandingStore, EmployeeStore, GrantCatalogStore, GrantStore, IdentityStore,
    OrphanLedger, RoleStore, StoreError, StoreResult, TemplateStore, TenantStore,
};

const SCHEMA: &str = include_str!("../../migrations/0001_provisioning.sql");

const TENANT_COLUMNS: &str = "id, code, name, legal_name, contact_email, phone, address, city, \
     country, tax_id, plan_name, subscription_status, support_tier, start_date, end_date, \
     max_users, max_branches, max_departments, modules, allowed_grant_ids, template_id, created_at";

const IDENTITY_COLUMNS: &str = "id, email, password_hash, first_name, last_name, display_name, \
     phone, is_active, is_verified, created_at";

#[derive(Debug, Clone)]
pub struct PostgresStores {
    pool: Arc<PgPool>,
}

impl PostgresStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the schema (idempotent) and seed the default roles.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Insert or replace a grant catalog entry.
    pub async fn upsert_menu_grant(&self, grant: &MenuGrant) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO menu_grants (id, key, module, is_core, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET key = EXCLUDED.key, module = EXCLUDED.module,
                is_core = EXCLUDED.is_core, is_active = EXCLUDED.is_active
            "#,
        )
        .bind(grant.id.get())
        .bind(&grant.key)
        .bind(&grant.module)
        .bind(grant.is_core)
        .bind(grant.is_active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_menu_grant", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn fetch_tenant_by_code(&self, code: &str) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE code = $1"))
            .bind(code)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant_by_code", e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn fetch_tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_tenant", e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id, code = %tenant.code), err)]
    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let modules: Vec<String> = tenant.modules.iter().cloned().collect();
        sqlx::query(&format!(
            "INSERT INTO tenants ({TENANT_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)"
        ))
        .bind(tenant.id.as_uuid())
        .bind(&tenant.code)
        .bind(&tenant.name)
        .bind(&tenant.legal_name)
        .bind(&tenant.contact_email)
        .bind(&tenant.phone)
        .bind(&tenant.address)
        .bind(&tenant.city)
        .bind(&tenant.country)
        .bind(&tenant.tax_id)
        .bind(&tenant.plan_name)
        .bind(tenant.subscription_status.as_str())
        .bind(&tenant.support_tier)
        .bind(tenant.start_date)
        .bind(tenant.end_date)
        .bind(i64::from(tenant.limits.max_users))
        .bind(i64::from(tenant.limits.max_branches))
        .bind(i64::from(tenant.limits.max_departments))
        .bind(modules)
        .bind(grant_ids_to_i64(&tenant.allowed_grant_ids))
        .bind(tenant.template_id.map(|t| *t.as_uuid()))
        .bind(tenant.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_tenant", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_tenant(&self, id: TenantId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tenant", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tenant {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, grant_ids), fields(grant_count = grant_ids.len()), err)]
    async fn write_grant_cache(
        &self,
        id: TenantId,
        grant_ids: &[GrantId],
        template_id: Option<TemplateId>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET allowed_grant_ids = $2, template_id = COALESCE($3, template_id)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(grant_ids_to_i64(grant_ids))
        .bind(template_id.map(|t| *t.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_grant_cache", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tenant {id}")));
        }
        Ok(())
    }

    async fn fetch_identity_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>> {
        let row = sqlx::query(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM admin_identities WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_identity_by_email", e))?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn fetch_identity(&self, id: UserId) -> StoreResult<Option<AdminIdentity>> {
        let row = sqlx::query(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM admin_identities WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_identity", e))?;
        row.as_ref().map(identity_from_row).transpose()
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.id), err)]
    async fn insert_identity(&self, identity: &AdminIdentity) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO admin_identities ({IDENTITY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(identity.id.as_uuid())
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.display_name)
        .bind(&identity.phone)
        .bind(identity.is_active)
        .bind(identity.is_verified)
        .bind(identity.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_identity", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_identity(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM admin_identities WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_identity", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("admin identity {id}")));
        }
        Ok(())
    }

    async fn fetch_role_by_name(&self, name: &str) -> StoreResult<Option<CatalogRole>> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.map(|r| -> StoreResult<CatalogRole> {
            Ok(CatalogRole {
                id: RoleId::from_uuid(r.try_get("id").map_err(decode_error)?),
                name: r.try_get("name").map_err(decode_error)?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self, binding), fields(tenant_id = %binding.tenant_id, user_id = %binding.user_id), err)]
    async fn insert_role_binding(&self, binding: &RoleBinding) -> StoreResult<()> {
        sqlx::query("INSERT INTO role_bindings (id, user_id, role_id, tenant_id) VALUES ($1, $2, $3, $4)")
            .bind(binding.id.as_uuid())
            .bind(binding.user_id.as_uuid())
            .bind(binding.role_id.as_uuid())
            .bind(binding.tenant_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role_binding", e))?;
        Ok(())
    }

    async fn fetch_bindings(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleBinding>> {
        let rows = sqlx::query("SELECT id, user_id, role_id, tenant_id FROM role_bindings WHERE tenant_id = $1")
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("bindings_for_tenant", e))?;
        rows.iter()
            .map(|r| -> StoreResult<RoleBinding> {
                Ok(RoleBinding {
                    id: RoleBindingId::from_uuid(r.try_get("id").map_err(decode_error)?),
                    user_id: UserId::from_uuid(r.try_get("user_id").map_err(decode_error)?),
                    role_id: RoleId::from_uuid(r.try_get("role_id").map_err(decode_error)?),
                    tenant_id: TenantId::from_uuid(r.try_get("tenant_id").map_err(decode_error)?),
                })
            })
            .collect()
    }

    #[instrument(skip(self, employee), fields(tenant_id = %employee.tenant_id, code = %employee.code), err)]
    async fn insert_employee(&self, employee: &EmployeeRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO employees (id, tenant_id, user_id, code, first_name, last_name, email, designation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(employee.id.as_uuid())
        .bind(employee.tenant_id.as_uuid())
        .bind(employee.user_id.as_uuid())
        .bind(&employee.code)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.designation)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_employee", e))?;
        Ok(())
    }

    async fn fetch_employees(&self, tenant_id: TenantId) -> StoreResult<Vec<EmployeeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, user_id, code, first_name, last_name, email, designation
            FROM employees WHERE tenant_id = $1 ORDER BY code
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_employees", e))?;
        rows.iter()
            .map(|r| -> StoreResult<EmployeeRecord> {
                Ok(EmployeeRecord {
                    id: EmployeeId::from_uuid(r.try_get("id").map_err(decode_error)?),
                    tenant_id: TenantId::from_uuid(r.try_get("tenant_id").map_err(decode_error)?),
                    user_id: UserId::from_uuid(r.try_get("user_id").map_err(decode_error)?),
                    code: r.try_get("code").map_err(decode_error)?,
                    first_name: r.try_get("first_name").map_err(decode_error)?,
                    last_name: r.try_get("last_name").map_err(decode_error)?,
                    email: r.try_get("email").map_err(decode_error)?,
                    designation: r.try_get("designation").map_err(decode_error)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, assignment), fields(tenant_id = %assignment.tenant_id, grant_id = %assignment.grant_id), err)]
    async fn insert_grant(&self, assignment: &GrantAssignment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_grants (tenant_id, grant_id, can_view, can_create, can_edit, can_delete, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, grant_id) DO NOTHING
            "#,
        )
        .bind(assignment.tenant_id.as_uuid())
        .bind(assignment.grant_id.get())
        .bind(assignment.can_view)
        .bind(assignment.can_create)
        .bind(assignment.can_edit)
        .bind(assignment.can_delete)
        .bind(assignment.is_active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_grant", e))?;
        Ok(())
    }

    async fn fetch_grants(&self, tenant_id: TenantId) -> StoreResult<Vec<GrantAssignment>> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, grant_id, can_view, can_create, can_edit, can_delete, is_active
            FROM tenant_grants
            WHERE tenant_id = $1 AND is_active
            ORDER BY grant_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_grants", e))?;
        rows.iter()
            .map(|r| -> StoreResult<GrantAssignment> {
                Ok(GrantAssignment {
                    tenant_id: TenantId::from_uuid(r.try_get("tenant_id").map_err(decode_error)?),
                    grant_id: GrantId::new(r.try_get("grant_id").map_err(decode_error)?),
                    can_view: r.try_get("can_view").map_err(decode_error)?,
                    can_create: r.try_get("can_create").map_err(decode_error)?,
                    can_edit: r.try_get("can_edit").map_err(decode_error)?,
                    can_delete: r.try_get("can_delete").map_err(decode_error)?,
                    is_active: r.try_get("is_active").map_err(decode_error)?,
                })
            })
            .collect()
    }

    async fn fetch_template(&self, id: TemplateId) -> StoreResult<Option<SubscriptionTemplate>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, max_users, max_branches, max_departments, modules, allowed_grant_ids,
                   trial_days, support_tier, validity_days, is_active
            FROM subscription_templates WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_template", e))?;
        row.as_ref().map(template_from_row).transpose()
    }

    async fn fetch_active_catalog(&self) -> StoreResult<Vec<MenuGrant>> {
        let rows = sqlx::query(
            "SELECT id, key, module, is_core, is_active FROM menu_grants WHERE is_active ORDER BY id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_menu_grants", e))?;
        rows.iter()
            .map(|r| -> StoreResult<MenuGrant> {
                Ok(MenuGrant {
                    id: GrantId::new(r.try_get("id").map_err(decode_error)?),
                    key: r.try_get("key").map_err(decode_error)?,
                    module: r.try_get("module").map_err(decode_error)?,
                    is_core: r.try_get("is_core").map_err(decode_error)?,
                    is_active: r.try_get("is_active").map_err(decode_error)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, branding), fields(tenant_id = %branding.tenant_id), err)]
    async fn write_branding(&self, branding: &BrandingRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_branding (tenant_id, logo_url, primary_color, secondary_color)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id) DO UPDATE
            SET logo_url = EXCLUDED.logo_url,
                primary_color = EXCLUDED.primary_color,
                secondary_color = EXCLUDED.secondary_color
            "#,
        )
        .bind(branding.tenant_id.as_uuid())
        .bind(&branding.logo_url)
        .bind(&branding.primary_color)
        .bind(&branding.secondary_color)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_branding", e))?;
        Ok(())
    }

    async fn fetch_branding(&self, tenant_id: TenantId) -> StoreResult<Option<BrandingRecord>> {
        let row = sqlx::query(
            "SELECT tenant_id, logo_url, primary_color, secondary_color FROM tenant_branding WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_branding", e))?;
        row.map(|r| -> StoreResult<BrandingRecord> {
            Ok(BrandingRecord {
                tenant_id: TenantId::from_uuid(r.try_get("tenant_id").map_err(decode_error)?),
                logo_url: r.try_get("logo_url").map_err(decode_error)?,
                primary_color: r.try_get("primary_color").map_err(decode_error)?,
                secondary_color: r.try_get("secondary_color").map_err(decode_error)?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self, event), fields(tenant_id = %event.tenant_id, action = %event.action), err)]
    async fn append_audit(&self, event: &AuditEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (id, actor, action, tenant_id, target_user_id, details, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.actor)
        .bind(&event.action)
        .bind(event.tenant_id.as_uuid())
        .bind(event.target_user_id.map(|u| *u.as_uuid()))
        .bind(&event.details)
        .bind(event.occurred_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    #[instrument(skip(self, orphan), fields(saga_id = %orphan.saga_id, entity_id = %orphan.entity_id), err)]
    async fn insert_orphan(&self, orphan: &OrphanRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO provisioning_orphans (saga_id, entity_kind, entity_id, description, error, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(orphan.saga_id.as_uuid())
        .bind(orphan.entity_kind.as_str())
        .bind(orphan.entity_id)
        .bind(&orphan.description)
        .bind(&orphan.error)
        .bind(orphan.recorded_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_orphan", e))?;
        Ok(())
    }

    async fn fetch_orphans(&self) -> StoreResult<Vec<OrphanRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT saga_id, entity_kind, entity_id, description, error, recorded_at
            FROM provisioning_orphans ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orphans", e))?;
        rows.iter()
            .map(|r| -> StoreResult<OrphanRecord> {
                let kind: String = r.try_get("entity_kind").map_err(decode_error)?;
                Ok(OrphanRecord {
                    saga_id: SagaId::from_uuid(r.try_get("saga_id").map_err(decode_error)?),
                    entity_kind: OrphanEntityKind::parse(&kind).ok_or_else(|| {
                        StoreError::Unavailable(format!("unknown orphan entity kind '{kind}'"))
                    })?,
                    entity_id: r.try_get("entity_id").map_err(decode_error)?,
                    description: r.try_get("description").map_err(decode_error)?,
                    error: r.try_get("error").map_err(decode_error)?,
                    recorded_at: r.try_get("recorded_at").map_err(decode_error)?,
                })
            })
            .collect()
    }
}

fn block_on<T>(fut: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Unavailable(
            "PostgresStores requires a tokio runtime; call from spawn_blocking".to_string(),
        )
    })?;
    handle.block_on(fut)
}

impl TenantStore for PostgresStores {
    fn find_by_code(&self, code: &str) -> StoreResult<Option<Tenant>> {
        block_on(self.fetch_tenant_by_code(code))
    }

    fn get(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        block_on(self.fetch_tenant(id))
    }

    fn insert(&self, tenant: &Tenant) -> StoreResult<()> {
        block_on(self.insert_tenant(tenant))
    }

    fn delete(&self, id: TenantId) -> StoreResult<()> {
        block_on(self.delete_tenant(id))
    }

    fn update_grant_cache(
        &self,
        id: TenantId,
        grant_ids: &[GrantId],
        template_id: Option<TemplateId>,
    ) -> StoreResult<()> {
        block_on(self.write_grant_cache(id, grant_ids, template_id))
    }
}

impl IdentityStore for PostgresStores {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>> {
        block_on(self.fetch_identity_by_email(email))
    }

    fn get(&self, id: UserId) -> StoreResult<Option<AdminIdentity>> {
        block_on(self.fetch_identity(id))
    }

    fn insert(&self, identity: &AdminIdentity) -> StoreResult<()> {
        block_on(self.insert_identity(identity))
    }

    fn delete(&self, id: UserId) -> StoreResult<()> {
        block_on(self.delete_identity(id))
    }
}

impl RoleStore for PostgresStores {
    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<CatalogRole>> {
        block_on(self.fetch_role_by_name(name))
    }

    fn insert_binding(&self, binding: &RoleBinding) -> StoreResult<()> {
        block_on(self.insert_role_binding(binding))
    }

    fn bindings_for_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleBinding>> {
        block_on(self.fetch_bindings(tenant_id))
    }
}

impl EmployeeStore for PostgresStores {
    fn insert(&self, employee: &EmployeeRecord) -> StoreResult<()> {
        block_on(self.insert_employee(employee))
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<EmployeeRecord>> {
        block_on(self.fetch_employees(tenant_id))
    }
}

impl GrantStore for PostgresStores {
    fn assign(&self, assignment: &GrantAssignment) -> StoreResult<()> {
        block_on(self.insert_grant(assignment))
    }

    fn list_by_tenant(&self, tenant_id: TenantId) -> StoreResult<Vec<GrantAssignment>> {
        block_on(self.fetch_grants(tenant_id))
    }
}

impl TemplateStore for PostgresStores {
    fn get(&self, id: TemplateId) -> StoreResult<Option<SubscriptionTemplate>> {
        block_on(self.fetch_template(id))
    }
}

impl GrantCatalogStore for PostgresStores {
    fn list_active(&self) -> StoreResult<Vec<MenuGrant>> {
        block_on(self.fetch_active_catalog())
    }
}

impl BrandingStore for PostgresStores {
    fn upsert(&self, branding: &BrandingRecord) -> StoreResult<()> {
        block_on(self.write_branding(branding))
    }

    fn get(&self, tenant_id: TenantId) -> StoreResult<Option<BrandingRecord>> {
        block_on(self.fetch_branding(tenant_id))
    }
}

impl AuditSink for PostgresStores {
    fn append(&self, event: &AuditEvent) -> StoreResult<()> {
        block_on(self.append_audit(event))
    }
}

impl OrphanLedger for PostgresStores {
    fn record(&self, orphan: &OrphanRecord) -> StoreResult<()> {
        block_on(self.insert_orphan(orphan))
    }

    fn list(&self) -> StoreResult<Vec<OrphanRecord>> {
        block_on(self.fetch_orphans())
    }
}

fn tenant_from_row(row: &PgRow) -> StoreResult<Tenant> {
    let status: String = row.try_get("subscription_status").map_err(decode_error)?;
    let modules: Vec<String> = row.try_get("modules").map_err(decode_error)?;
    let grant_ids: Vec<i64> = row.try_get("allowed_grant_ids").map_err(decode_error)?;
    let template_id: Option<uuid::Uuid> = row.try_get("template_id").map_err(decode_error)?;

    Ok(Tenant {
        id: TenantId::from_uuid(row.try_get("id").map_err(decode_error)?),
        code: row.try_get("code").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        legal_name: row.try_get("legal_name").map_err(decode_error)?,
        contact_email: row.try_get("contact_email").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        address: row.try_get("address").map_err(decode_error)?,
        city: row.try_get("city").map_err(decode_error)?,
        country: row.try_get("country").map_err(decode_error)?,
        tax_id: row.try_get("tax_id").map_err(decode_error)?,
        plan_name: row.try_get("plan_name").map_err(decode_error)?,
        subscription_status: SubscriptionStatus::parse(&status).ok_or_else(|| {
            StoreError::Unavailable(format!("unknown subscription status '{status}'"))
        })?,
        support_tier: row.try_get("support_tier").map_err(decode_error)?,
        start_date: row.try_get("start_date").map_err(decode_error)?,
        end_date: row.try_get("end_date").map_err(decode_error)?,
        limits: Limits {
            max_users: limit(row, "max_users")?,
            max_branches: limit(row, "max_branches")?,
            max_departments: limit(row, "max_departments")?,
        },
        modules: modules.into_iter().collect(),
        allowed_grant_ids: grant_ids.into_iter().map(GrantId::new).collect(),
        template_id: template_id.map(TemplateId::from_uuid),
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn identity_from_row(row: &PgRow) -> StoreResult<AdminIdentity> {
    Ok(AdminIdentity {
        id: UserId::from_uuid(row.try_get("id").map_err(decode_error)?),
        email: row.try_get("email").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
        display_name: row.try_get("display_name").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        is_verified: row.try_get("is_verified").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn template_from_row(row: &PgRow) -> StoreResult<SubscriptionTemplate> {
    let grant_ids: Option<Vec<i64>> = row.try_get("allowed_grant_ids").map_err(decode_error)?;
    Ok(SubscriptionTemplate {
        id: TemplateId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        max_users: optional_limit(row, "max_users")?,
        max_branches: optional_limit(row, "max_branches")?,
        max_departments: optional_limit(row, "max_departments")?,
        modules: row.try_get("modules").map_err(decode_error)?,
        allowed_grant_ids: grant_ids.map(|ids| ids.into_iter().map(GrantId::new).collect()),
        trial_days: optional_limit(row, "trial_days")?,
        support_tier: row.try_get("support_tier").map_err(decode_error)?,
        validity_days: optional_limit(row, "validity_days")?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
    })
}

fn limit(row: &PgRow, column: &str) -> StoreResult<u32> {
    let raw: i64 = row.try_get(column).map_err(decode_error)?;
    u32::try_from(raw).map_err(|_| StoreError::Unavailable(format!("{column} out of range: {raw}")))
}

fn optional_limit(row: &PgRow, column: &str) -> StoreResult<Option<u32>> {
    let raw: Option<i64> = row.try_get(column).map_err(decode_error)?;
    raw.map(|v| {
        u32::try_from(v).map_err(|_| StoreError::Unavailable(format!("{column} out of range: {v}")))
    })
    .transpose()
}

fn grant_ids_to_i64(ids: &[GrantId]) -> Vec<i64> {
    ids.iter().map(|id| id.get()).collect()
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(format!("failed to decode row: {err}"))
}

/// Unique-constraint name to the request field it protects.
fn unique_field(constraint: Option<&str>) -> String {
    match constraint {
        Some("tenants_code_key") => "code".to_string(),
        Some("admin_identities_email_key") => "email".to_string(),
        Some(other) => other.to_string(),
        None => "unknown".to_string(),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::UniqueViolation {
                    field: unique_field(db_err.constraint()),
                };
            }
            StoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed during {operation}"))
        }
        other => StoreError::Unavailable(format!("error in {operation}: {other}")),
    }
}
