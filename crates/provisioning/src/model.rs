//! Records written by the provisioning saga.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use tenancy_core::{
    AuditEventId, EmployeeId, GrantId, RoleBindingId, RoleId, SagaId, TemplateId, TenantId, UserId,
};

use crate::plan::{Limits, PlanConfiguration, SubscriptionStatus};
use crate::request::{AdminInput, BrandingInput, ProvisioningRequest};

/// Audit action recorded for a successful provisioning.
pub const TENANT_PROVISIONED_ACTION: &str = "tenant.provisioned";

/// A provisioned organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Upper-cased, immutable after creation.
    pub code: String,
    pub name: String,
    pub legal_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub tax_id: Option<String>,
    pub plan_name: String,
    pub subscription_status: SubscriptionStatus,
    pub support_tier: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub limits: Limits,
    pub modules: BTreeSet<String>,
    /// Cached grant ids, refreshed from the tenant's assignments.
    pub allowed_grant_ids: Vec<GrantId>,
    pub template_id: Option<TemplateId>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn from_request(
        id: TenantId,
        request: &ProvisioningRequest,
        plan: &PlanConfiguration,
        created_at: DateTime<Utc>,
    ) -> Self {
        let t = &request.tenant;
        Self {
            id,
            code: request.tenant_code(),
            name: t.name.trim().to_string(),
            legal_name: t.legal_name.clone(),
            contact_email: t.contact_email.clone(),
            phone: t.phone.clone(),
            address: t.address.clone(),
            city: t.city.clone(),
            country: t.country.clone(),
            tax_id: t.tax_id.clone(),
            plan_name: plan.plan_name.clone(),
            subscription_status: plan.status(),
            support_tier: plan.support_tier.clone(),
            start_date: plan.start_date,
            end_date: plan.end_date,
            limits: plan.limits,
            modules: plan.modules.clone(),
            allowed_grant_ids: Vec::new(),
            template_id: plan.template_id,
            created_at,
        }
    }
}

/// The tenant's first administrative identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: UserId,
    /// Lower-cased unique key.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub display_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminIdentity {
    /// New active, unverified identity.
    pub fn new(
        id: UserId,
        email: String,
        admin: &AdminInput,
        password_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            password_hash,
            first_name: admin.first_name.trim().to_string(),
            last_name: admin
                .last_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            display_name: admin.display_name(),
            phone: admin.phone.clone(),
            is_active: true,
            is_verified: false,
            created_at,
        }
    }
}

/// A role from the role catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRole {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub id: RoleBindingId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub tenant_id: TenantId,
}

/// Auxiliary employee profile for the admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub code: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub designation: String,
}

/// Catalog entry for a menu/feature grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGrant {
    pub id: GrantId,
    pub key: String,
    pub module: Option<String>,
    pub is_core: bool,
    pub is_active: bool,
}

/// A grant given to a tenant. Unique per (tenant, grant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantAssignment {
    pub tenant_id: TenantId,
    pub grant_id: GrantId,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub is_active: bool,
}

impl GrantAssignment {
    /// Active assignment with every permission flag set.
    pub fn full_access(tenant_id: TenantId, grant_id: GrantId) -> Self {
        Self {
            tenant_id,
            grant_id,
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingRecord {
    pub tenant_id: TenantId,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

impl BrandingRecord {
    pub fn from_input(tenant_id: TenantId, input: &BrandingInput) -> Self {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            tenant_id,
            logo_url: clean(&input.logo_url),
            primary_color: clean(&input.primary_color),
            secondary_color: clean(&input.secondary_color),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    /// Principal that invoked the operation.
    pub actor: String,
    pub action: String,
    pub tenant_id: TenantId,
    pub target_user_id: Option<UserId>,
    pub details: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanEntityKind {
    Tenant,
    AdminIdentity,
}

impl OrphanEntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanEntityKind::Tenant => "tenant",
            OrphanEntityKind::AdminIdentity => "admin_identity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tenant" => Some(OrphanEntityKind::Tenant),
            "admin_identity" => Some(OrphanEntityKind::AdminIdentity),
            _ => None,
        }
    }
}

/// A row left behind because its unwind action failed. Needs manual cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub saga_id: SagaId,
    pub entity_kind: OrphanEntityKind,
    pub entity_id: Uuid,
    pub description: String,
    pub error: String,
    pub recorded_at: DateTime<Utc>,
}
