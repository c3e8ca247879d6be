//! Inbound provisioning request and its shape validation.

use serde::{Deserialize, Serialize};

use tenancy_core::{DomainError, DomainResult, TemplateId};

/// Shortest accepted tenant code.
pub const MIN_CODE_LEN: usize = 2;
/// Longest accepted tenant code.
pub const MAX_CODE_LEN: usize = 32;
/// Shortest accepted admin password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Explicit limits that replace the resolved plan's limits field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_users: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_branches: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_departments: Option<u32>,
}

/// Optional branding supplied at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingInput {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
}

impl BrandingInput {
    /// True when no field carries a non-blank value.
    pub fn is_empty(&self) -> bool {
        [&self.logo_url, &self.primary_color, &self.secondary_color]
            .into_iter()
            .all(|v| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default, flatten)]
    pub limits: LimitOverrides,
    #[serde(default)]
    pub subscription_template_id: Option<TemplateId>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub branding: Option<BrandingInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AdminInput {
    /// "First Last", or just the first name when no family name is given.
    pub fn display_name(&self) -> String {
        let first = self.first_name.trim();
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{first} {last}"),
            _ => first.to_string(),
        }
    }
}

/// A single "create tenant with admin" call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub tenant: TenantInput,
    pub admin: AdminInput,
}

impl ProvisioningRequest {
    /// Check the request shape. Performs no lookups.
    pub fn validate(&self) -> DomainResult<()> {
        require("tenant.name", &self.tenant.name)?;
        require("tenant.code", &self.tenant.code)?;
        require("admin.email", &self.admin.email)?;
        require("admin.password", &self.admin.password)?;

        let code = self.tenant.code.trim();
        let len = code.chars().count();
        if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "tenant.code must be between {MIN_CODE_LEN} and {MAX_CODE_LEN} characters"
            )));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::validation(
                "tenant.code may only contain letters, digits, '-' and '_'",
            ));
        }

        if !self.admin.email.contains('@') {
            return Err(DomainError::validation("admin.email is not a valid email address"));
        }

        if self.admin.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "admin.password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(())
    }

    /// Tenant code as stored: trimmed and upper-cased.
    pub fn tenant_code(&self) -> String {
        self.tenant.code.trim().to_ascii_uppercase()
    }

    /// Admin identity key as stored: trimmed and lower-cased.
    pub fn admin_email(&self) -> String {
        self.admin.email.trim().to_lowercase()
    }

    /// Branding, if any field was actually supplied.
    pub fn branding(&self) -> Option<&BrandingInput> {
        self.tenant.branding.as_ref().filter(|b| !b.is_empty())
    }
}

fn require(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}
