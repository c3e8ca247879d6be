use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, PrincipalId, Role};

/// A fully resolved principal for authorization decisions.
///
/// Construction of this object is decoupled from storage and transport: the
/// API derives it from verified claims and `permissions_for_roles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Static role→permission policy.
///
/// Only the platform tier can provision tenants; tenant-tier roles grant
/// nothing at the platform boundary.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out = Vec::new();
    for role in roles {
        if role.as_str() == Role::PLATFORM_ADMIN.as_str() {
            out.push(Permission::TENANTS_PROVISION);
        }
    }
    out
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            principal_id = %principal.principal_id,
            required = %required,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: Vec<Role>) -> Principal {
        let permissions = permissions_for_roles(&roles);
        Principal {
            principal_id: PrincipalId::new(),
            roles,
            permissions,
        }
    }

    #[test]
    fn platform_admin_may_provision() {
        let p = principal(vec![Role::PLATFORM_ADMIN]);
        assert!(authorize(&p, &Permission::TENANTS_PROVISION).is_ok());
    }

    #[test]
    fn tenant_admin_may_not_provision() {
        let p = principal(vec![Role::TENANT_ADMIN, Role::new("admin")]);
        assert_eq!(
            authorize(&p, &Permission::TENANTS_PROVISION),
            Err(AuthzError::Forbidden("platform.tenants.provision".to_string()))
        );
    }

    #[test]
    fn wildcard_permission_allows_everything() {
        let p = Principal {
            principal_id: PrincipalId::new(),
            roles: vec![],
            permissions: vec![Permission::WILDCARD],
        };
        assert!(authorize(&p, &Permission::TENANTS_PROVISION).is_ok());
    }
}
