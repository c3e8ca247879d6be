use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer. Two tiers matter to provisioning:
/// the platform tier (who may create tenants) and the tenant tier (the role
/// bound to a tenant's first administrator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Platform-level administrator; the only tier allowed to provision tenants.
    pub const PLATFORM_ADMIN: Role = Role::from_static("platform_admin");

    /// Catalog name of the role bound to a freshly provisioned tenant's admin.
    pub const TENANT_ADMIN: Role = Role::from_static("TENANT_ADMIN");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
