//! Per-entity stores the provisioning saga writes through.

mod r#trait;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{
    Faults, InMemoryAuditSink, InMemoryBrandingStore, InMemoryEmployeeStore, InMemoryGrantCatalog,
    InMemoryGrantStore, InMemoryIdentityStore, InMemoryOrphanLedger, InMemoryRoleStore,
    InMemoryTemplateStore, InMemoryTenantStore,
};
pub use postgres::PostgresStores;
pub use r#trait::{
    AuditSink, BrandingStore, EmployeeStore, GrantCatalogStore, GrantStore, IdentityStore,
    OrphanLedger, RoleStore, StoreError, StoreResult, TemplateStore, TenantStore,
};
