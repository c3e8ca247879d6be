//! Tenant provisioning domain.
//!
//! Request validation, plan resolution rules, grant selection and the records
//! the provisioning saga writes, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod employee;
pub mod grants;
pub mod model;
pub mod plan;
pub mod request;

pub use employee::{EMPLOYEE_DESIGNATION, employee_code};
pub use grants::{normalize_grant_ids, select_grants};
pub use model::{
    AdminIdentity, AuditEvent, BrandingRecord, CatalogRole, EmployeeRecord, GrantAssignment,
    MenuGrant, OrphanEntityKind, OrphanRecord, RoleBinding, Tenant, TENANT_PROVISIONED_ACTION,
};
pub use plan::{
    Limits, PLAN_CATALOG, PlanCatalogEntry, PlanConfiguration, SubscriptionStatus,
    SubscriptionTemplate,
};
pub use request::{AdminInput, BrandingInput, LimitOverrides, ProvisioningRequest, TenantInput};
