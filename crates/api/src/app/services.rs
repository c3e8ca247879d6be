//! Store backend selection and provisioner wiring.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use tenancy_core::GrantId;
use tenancy_infra::store::{
    InMemoryAuditSink, InMemoryBrandingStore, InMemoryEmployeeStore, InMemoryGrantCatalog,
    InMemoryGrantStore, InMemoryIdentityStore, InMemoryOrphanLedger, InMemoryRoleStore,
    InMemoryTemplateStore, InMemoryTenantStore, PostgresStores, StoreError,
};
use tenancy_infra::{ProvisioningConfig, ProvisioningStores, TenantProvisioner};
use tenancy_provisioning::MenuGrant;

use super::ApiConfig;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("failed to connect to Postgres: {0}")]
    Connect(#[source] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared per-process services handed to handlers.
#[derive(Clone)]
pub struct AppServices {
    pub provisioner: TenantProvisioner,
}

impl AppServices {
    pub fn new(provisioner: TenantProvisioner) -> Self {
        Self { provisioner }
    }

    /// In-memory stores seeded with the admin role and the default menu catalog.
    pub fn in_memory(config: ProvisioningConfig) -> Self {
        let stores = in_memory_stores(&config);
        Self::new(TenantProvisioner::new(stores, config))
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    if config.use_persistent_stores {
        return build_persistent_services(config).await;
    }

    tracing::info!("using in-memory stores");
    Ok(AppServices::in_memory(config.provisioning.clone()))
}

async fn build_persistent_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(ServicesError::MissingDatabaseUrl)?;

    let pool = PgPool::connect(database_url)
        .await
        .map_err(ServicesError::Connect)?;

    let backend = Arc::new(PostgresStores::new(pool));
    backend.migrate().await?;
    for grant in default_menu_catalog() {
        backend.upsert_menu_grant(&grant).await?;
    }

    tracing::info!("using Postgres stores");
    let stores = ProvisioningStores::shared(backend);
    Ok(AppServices::new(TenantProvisioner::new(
        stores,
        config.provisioning.clone(),
    )))
}

pub fn in_memory_stores(config: &ProvisioningConfig) -> ProvisioningStores {
    ProvisioningStores {
        tenants: Arc::new(InMemoryTenantStore::new()),
        identities: Arc::new(InMemoryIdentityStore::new()),
        roles: Arc::new(InMemoryRoleStore::new().with_role(&config.tenant_admin_role)),
        employees: Arc::new(InMemoryEmployeeStore::new()),
        grants: Arc::new(InMemoryGrantStore::new()),
        templates: Arc::new(InMemoryTemplateStore::new()),
        grant_catalog: Arc::new(InMemoryGrantCatalog::new(default_menu_catalog())),
        branding: Arc::new(InMemoryBrandingStore::new()),
        audit: Arc::new(InMemoryAuditSink::new()),
        orphans: Arc::new(InMemoryOrphanLedger::new()),
    }
}

/// Menu entries every deployment starts with, one or more per plan module.
pub fn default_menu_catalog() -> Vec<MenuGrant> {
    let entry = |id: i64, key: &str, module: Option<&str>, is_core: bool| MenuGrant {
        id: GrantId::new(id),
        key: key.to_string(),
        module: module.map(str::to_string),
        is_core,
        is_active: true,
    };
    vec![
        entry(1, "dashboard", Some("CORE"), true),
        entry(2, "settings", Some("CORE"), true),
        entry(3, "profile", None, false),
        entry(10, "hr.employees", Some("HR"), false),
        entry(11, "hr.departments", Some("HR"), false),
        entry(20, "payroll.runs", Some("PAYROLL"), false),
        entry(30, "attendance.timesheets", Some("ATTENDANCE"), false),
        entry(40, "leave.requests", Some("LEAVE"), false),
        entry(50, "recruitment.openings", Some("RECRUITMENT"), false),
        entry(60, "performance.reviews", Some("PERFORMANCE"), false),
        entry(70, "analytics.reports", Some("ANALYTICS"), false),
        entry(80, "api.keys", Some("API"), false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique_and_active() {
        let catalog = default_menu_catalog();
        let mut ids: Vec<GrantId> = catalog.iter().map(|g| g.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
        assert!(catalog.iter().all(|g| g.is_active));
    }

    #[tokio::test]
    async fn persistent_mode_without_url_is_an_error() {
        let config = ApiConfig {
            use_persistent_stores: true,
            ..ApiConfig::from_lookup(|_| None)
        };
        assert!(matches!(
            build_services(&config).await,
            Err(ServicesError::MissingDatabaseUrl)
        ));
    }
}
