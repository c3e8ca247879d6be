//! Provisioning configuration loaded from the environment.

use tenancy_auth::Role;

/// Settings the provisioning saga reads at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    /// Catalog role bound to the new admin (`TENANT_ADMIN_ROLE`).
    pub tenant_admin_role: String,
    /// Catalog plan used when a request names neither plan nor template (`DEFAULT_PLAN`).
    pub default_plan: String,
    /// Secret mixed into password hashes (`PASSWORD_PEPPER`).
    pub password_pepper: Option<String>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            tenant_admin_role: Role::TENANT_ADMIN.as_str().to_string(),
            default_plan: "TRIAL".to_string(),
            password_pepper: None,
        }
    }
}

impl ProvisioningConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            tenant_admin_role: get("TENANT_ADMIN_ROLE").unwrap_or(defaults.tenant_admin_role),
            default_plan: get("DEFAULT_PLAN").unwrap_or(defaults.default_plan),
            password_pepper: get("PASSWORD_PEPPER"),
        }
    }
}
