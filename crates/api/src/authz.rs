//! API-side authorization guard.
//!
//! Checked in the handler before any provisioning work starts, so the
//! orchestrator stays auth-agnostic.

use tenancy_auth::{authorize, permissions_for_roles, AuthzError, Permission, Principal};

use crate::context::PrincipalContext;

/// Require `permission` for the caller in `principal`.
pub fn require_permission(
    principal: &PrincipalContext,
    permission: &Permission,
) -> Result<(), AuthzError> {
    let resolved = Principal {
        principal_id: principal.principal_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_for_roles(principal.roles()),
    };
    authorize(&resolved, permission)
}

#[cfg(test)]
mod tests {
    use tenancy_auth::{PrincipalId, Role};

    use super::*;

    #[test]
    fn platform_admin_may_provision() {
        let principal = PrincipalContext::new(PrincipalId::new(), vec![Role::PLATFORM_ADMIN]);
        assert!(require_permission(&principal, &Permission::TENANTS_PROVISION).is_ok());
    }

    #[test]
    fn tenant_admin_may_not_provision() {
        let principal = PrincipalContext::new(PrincipalId::new(), vec![Role::TENANT_ADMIN]);
        assert!(matches!(
            require_permission(&principal, &Permission::TENANTS_PROVISION),
            Err(AuthzError::Forbidden(_))
        ));
    }
}
