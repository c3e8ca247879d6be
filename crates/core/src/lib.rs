//! `tenancy-core`: shared building blocks for the provisioning workspace.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{
    AuditEventId, EmployeeId, GrantId, RoleBindingId, RoleId, SagaId, TemplateId, TenantId, UserId,
};
