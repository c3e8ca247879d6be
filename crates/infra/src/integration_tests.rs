//! End-to-end tests for the provisioning saga over the in-memory stores.
//!
//! Verifies:
//! - mandatory failures unwind everything the run created
//! - best-effort failures never fail the run
//! - plan resolution and grant derivation land on the stored tenant

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};

    use tenancy_auth::{HashError, SecretHasher};
    use tenancy_core::{GrantId, TemplateId, UserId};
    use tenancy_provisioning::{
        AdminIdentity, AdminInput, BrandingInput, MenuGrant, OrphanEntityKind,
        ProvisioningRequest, SubscriptionStatus, SubscriptionTemplate, TenantInput,
    };

    use crate::config::ProvisioningConfig;
    use crate::provisioning::{
        apply_plan_grants, resolve_plan, ErrorKind, FixedClock, ProvisioningError,
        ProvisioningStores, TenantProvisioner,
    };
    use crate::store::{
        BrandingStore, EmployeeStore, GrantStore, IdentityStore, InMemoryAuditSink,
        InMemoryBrandingStore, InMemoryEmployeeStore, InMemoryGrantCatalog, InMemoryGrantStore,
        InMemoryIdentityStore, InMemoryOrphanLedger, InMemoryRoleStore, InMemoryTemplateStore,
        InMemoryTenantStore, OrphanLedger, RoleStore, StoreResult, TenantStore,
    };

    struct PlainHasher;

    impl SecretHasher for PlainHasher {
        fn hash(&self, plaintext: &str) -> Result<String, HashError> {
            Ok(format!("hashed:{plaintext}"))
        }
    }

    /// Finds nothing, so only the insert constraint can catch a duplicate.
    struct BlindIdentityStore(Arc<InMemoryIdentityStore>);

    impl IdentityStore for BlindIdentityStore {
        fn find_by_email(&self, _email: &str) -> StoreResult<Option<AdminIdentity>> {
            Ok(None)
        }

        fn get(&self, id: UserId) -> StoreResult<Option<AdminIdentity>> {
            self.0.get(id)
        }

        fn insert(&self, identity: &AdminIdentity) -> StoreResult<()> {
            self.0.insert(identity)
        }

        fn delete(&self, id: UserId) -> StoreResult<()> {
            self.0.delete(id)
        }
    }

    struct Fixture {
        tenants: Arc<InMemoryTenantStore>,
        identities: Arc<InMemoryIdentityStore>,
        roles: Arc<InMemoryRoleStore>,
        employees: Arc<InMemoryEmployeeStore>,
        grants: Arc<InMemoryGrantStore>,
        templates: Arc<InMemoryTemplateStore>,
        branding: Arc<InMemoryBrandingStore>,
        audit: Arc<InMemoryAuditSink>,
        orphans: Arc<InMemoryOrphanLedger>,
        stores: ProvisioningStores,
    }

    impl Fixture {
        fn new() -> Self {
            Self::build(InMemoryRoleStore::new().with_role("TENANT_ADMIN"))
        }

        fn without_admin_role() -> Self {
            Self::build(InMemoryRoleStore::new().with_role("AUDITOR"))
        }

        fn build(roles: InMemoryRoleStore) -> Self {
            let tenants = Arc::new(InMemoryTenantStore::new());
            let identities = Arc::new(InMemoryIdentityStore::new());
            let roles = Arc::new(roles);
            let employees = Arc::new(InMemoryEmployeeStore::new());
            let grants = Arc::new(InMemoryGrantStore::new());
            let templates = Arc::new(InMemoryTemplateStore::new());
            let branding = Arc::new(InMemoryBrandingStore::new());
            let audit = Arc::new(InMemoryAuditSink::new());
            let orphans = Arc::new(InMemoryOrphanLedger::new());
            let stores = ProvisioningStores {
                tenants: tenants.clone(),
                identities: identities.clone(),
                roles: roles.clone(),
                employees: employees.clone(),
                grants: grants.clone(),
                templates: templates.clone(),
                grant_catalog: Arc::new(InMemoryGrantCatalog::new(catalog())),
                branding: branding.clone(),
                audit: audit.clone(),
                orphans: orphans.clone(),
            };
            Self {
                tenants,
                identities,
                roles,
                employees,
                grants,
                templates,
                branding,
                audit,
                orphans,
                stores,
            }
        }

        fn provisioner(&self) -> TenantProvisioner {
            TenantProvisioner::new(self.stores.clone(), ProvisioningConfig::default())
                .with_hasher(Arc::new(PlainHasher))
                .with_clock(Arc::new(FixedClock(
                    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
                )))
        }

        fn template(&self, modules: Option<&[&str]>, allowed: Option<&[i64]>) -> TemplateId {
            let template = SubscriptionTemplate {
                id: TemplateId::new(),
                name: "Partner".to_string(),
                max_users: None,
                max_branches: None,
                max_departments: None,
                modules: modules.map(|m| m.iter().map(|s| s.to_string()).collect()),
                allowed_grant_ids: allowed.map(|ids| ids.iter().copied().map(GrantId::new).collect()),
                trial_days: None,
                support_tier: None,
                validity_days: None,
                is_active: true,
            };
            let id = template.id;
            self.templates.put(template);
            id
        }
    }

    fn catalog() -> Vec<MenuGrant> {
        let grant = |id: i64, module: Option<&str>, is_core: bool| MenuGrant {
            id: GrantId::new(id),
            key: format!("menu.{id}"),
            module: module.map(str::to_string),
            is_core,
            is_active: true,
        };
        vec![
            grant(1, Some("CORE"), true),
            grant(2, None, false),
            grant(3, Some("HR"), false),
            grant(4, Some("PAYROLL"), false),
            grant(5, Some("ATTENDANCE"), false),
            grant(9, Some("ANALYTICS"), false),
        ]
    }

    fn request(code: &str, email: &str, plan: Option<&str>) -> ProvisioningRequest {
        ProvisioningRequest {
            tenant: TenantInput {
                name: "Acme Corp".to_string(),
                code: code.to_string(),
                contact_email: Some("ops@acme.test".to_string()),
                plan: plan.map(str::to_string),
                ..TenantInput::default()
            },
            admin: AdminInput {
                email: email.to_string(),
                password: "correct-horse".to_string(),
                first_name: "Ada".to_string(),
                last_name: Some("Lovelace".to_string()),
                phone: None,
            },
        }
    }

    fn ids(raw: &[i64]) -> Vec<GrantId> {
        raw.iter().copied().map(GrantId::new).collect()
    }

    #[test]
    fn acme_basic_is_fully_provisioned() {
        let fx = Fixture::new();
        let outcome = fx
            .provisioner()
            .provision("platform-admin", &request("ACME", "a@acme.test", Some("BASIC")))
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.tenant.code, "ACME");
        assert_eq!(outcome.tenant.plan_name, "BASIC");
        assert_eq!(outcome.tenant.subscription_status, SubscriptionStatus::Active);
        assert_eq!(outcome.tenant.end_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(outcome.employee_code.as_deref(), Some("ACME-B-001"));
        assert_eq!(outcome.admin.email, "a@acme.test");
        assert_eq!(outcome.admin.display_name, "Ada Lovelace");
        assert_eq!(outcome.admin.password_hash, "hashed:correct-horse");

        // BASIC = CORE, HR, PAYROLL
        assert_eq!(outcome.tenant.allowed_grant_ids, ids(&[1, 2, 3, 4]));
        let stored = fx.tenants.get(outcome.tenant.id).unwrap().unwrap();
        assert_eq!(stored.allowed_grant_ids, ids(&[1, 2, 3, 4]));

        let bindings = fx.roles.bindings_for_tenant(outcome.tenant.id).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].user_id, outcome.admin.id);

        let employees = fx.employees.list_by_tenant(outcome.tenant.id).unwrap();
        assert_eq!(employees[0].designation, "Administrator");

        let events = fx.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "tenant.provisioned");
        assert_eq!(events[0].actor, "platform-admin");
        assert_eq!(events[0].details["employee_code"], "ACME-B-001");
    }

    #[test]
    fn duplicate_code_writes_nothing() {
        let fx = Fixture::new();
        let provisioner = fx.provisioner();
        provisioner
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap();

        let failure = provisioner
            .provision("root", &request("acme", "b@acme.test", None))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::Conflict);
        assert!(matches!(&failure.error, ProvisioningError::Conflict { field } if field == "code"));
        assert_eq!(failure.failed_step, "check_duplicates");
        assert_eq!(fx.tenants.len(), 1);
        assert_eq!(fx.identities.len(), 1);
    }

    #[test]
    fn duplicate_email_writes_nothing() {
        let fx = Fixture::new();
        let provisioner = fx.provisioner();
        provisioner
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap();

        let failure = provisioner
            .provision("root", &request("GLOBEX", " A@ACME.TEST", None))
            .unwrap_err();

        assert!(matches!(&failure.error, ProvisioningError::Conflict { field } if field == "email"));
        assert_eq!(fx.tenants.len(), 1);
        assert_eq!(fx.identities.len(), 1);
    }

    #[test]
    fn missing_admin_role_unwinds_tenant_and_identity() {
        let fx = Fixture::without_admin_role();
        let failure = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::NotFound);
        assert_eq!(failure.failed_step, "bind_tenant_admin_role");
        assert!(!failure.left_orphans());
        assert_eq!(failure.compensation_kind(), None);
        assert!(fx.tenants.is_empty());
        assert!(fx.identities.is_empty());
        assert!(fx.orphans.list().unwrap().is_empty());
        assert!(fx.audit.events().is_empty());
    }

    #[test]
    fn identity_outage_unwinds_tenant() {
        let fx = Fixture::new();
        fx.identities.faults().fail("insert");

        let failure = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::DependencyFailure);
        assert_eq!(failure.failed_step, "create_admin_identity");
        assert!(fx.tenants.is_empty());
    }

    #[test]
    fn binding_outage_unwinds_tenant_and_identity() {
        let fx = Fixture::new();
        fx.roles.faults().fail("insert_binding");

        let failure = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::DependencyFailure);
        assert_eq!(failure.failed_step, "bind_tenant_admin_role");
        assert!(!failure.left_orphans());
        assert!(fx.tenants.is_empty());
        assert!(fx.identities.is_empty());
        assert!(fx.audit.events().is_empty());
    }

    #[test]
    fn insert_time_unique_violation_is_conflict_and_unwinds() {
        let fx = Fixture::new();
        fx.provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap();

        let mut stores = fx.stores.clone();
        stores.identities = Arc::new(BlindIdentityStore(fx.identities.clone()));
        let provisioner = TenantProvisioner::new(stores, ProvisioningConfig::default())
            .with_hasher(Arc::new(PlainHasher));

        let failure = provisioner
            .provision("root", &request("GLOBEX", "a@acme.test", None))
            .unwrap_err();

        assert!(matches!(&failure.error, ProvisioningError::Conflict { field } if field == "email"));
        assert_eq!(failure.failed_step, "create_admin_identity");
        assert_eq!(fx.tenants.len(), 1);
        assert!(fx.tenants.find_by_code("GLOBEX").unwrap().is_none());
    }

    #[test]
    fn failed_compensation_keeps_original_error_and_records_orphan() {
        let fx = Fixture::without_admin_role();
        fx.tenants.faults().fail("delete");

        let failure = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::NotFound);
        assert!(matches!(failure.error, ProvisioningError::RoleNotFound(_)));
        assert_eq!(failure.compensation_failures.len(), 1);
        assert_eq!(failure.compensation_failures[0].step, "create_tenant");
        assert_eq!(failure.compensation_kind(), Some(ErrorKind::CompensationFailure));

        // The older compensation still ran.
        assert!(fx.identities.is_empty());
        assert_eq!(fx.tenants.len(), 1);

        let orphans = fx.orphans.list().unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].entity_kind, OrphanEntityKind::Tenant);
        assert_eq!(orphans[0].saga_id, failure.saga_id);
    }

    #[test]
    fn employee_failure_does_not_fail_the_run() {
        let fx = Fixture::new();
        fx.employees.faults().fail("insert");

        let outcome = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", Some("BASIC")))
            .unwrap();

        assert_eq!(outcome.employee_code, None);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].step, "create_employee_record");
        assert_eq!(outcome.warnings[0].kind(), ErrorKind::BestEffortFailure);
        assert_eq!(fx.tenants.len(), 1);
        assert_eq!(fx.identities.len(), 1);
        assert_eq!(fx.roles.bindings_for_tenant(outcome.tenant.id).unwrap().len(), 1);
        assert_eq!(outcome.tenant.allowed_grant_ids, ids(&[1, 2, 3, 4]));
    }

    #[test]
    fn grant_failure_does_not_fail_the_run() {
        let fx = Fixture::new();
        fx.grants.faults().fail("assign");

        let outcome = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap();

        assert_eq!(outcome.warnings[0].step, "derive_grants");
        assert!(outcome.tenant.allowed_grant_ids.is_empty());
        assert_eq!(fx.audit.events().len(), 1);
    }

    #[test]
    fn default_plan_is_thirty_day_trial() {
        let fx = Fixture::new();
        let outcome = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap();

        let tenant = outcome.tenant;
        assert_eq!(tenant.plan_name, "TRIAL");
        assert_eq!(tenant.subscription_status, SubscriptionStatus::Trial);
        assert_eq!(tenant.start_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(tenant.end_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(
            tenant.modules,
            BTreeSet::from(["CORE".to_string(), "HR".to_string()])
        );
        assert_eq!(outcome.employee_code.as_deref(), Some("ACME-T-001"));
    }

    #[test]
    fn standard_plan_runs_one_year() {
        let fx = Fixture::new();
        let outcome = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", Some("standard")))
            .unwrap();

        assert_eq!(outcome.tenant.plan_name, "STANDARD");
        assert_eq!(outcome.tenant.end_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(outcome.tenant.allowed_grant_ids, ids(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn explicit_allow_list_is_assigned_exactly() {
        let fx = Fixture::new();
        let template_id = fx.template(None, Some(&[5, 9]));
        let mut req = request("ACME", "a@acme.test", None);
        req.tenant.subscription_template_id = Some(template_id);

        let outcome = fx.provisioner().provision("root", &req).unwrap();

        assert_eq!(outcome.tenant.plan_name, "CUSTOM");
        assert_eq!(outcome.employee_code.as_deref(), Some("ACME-C-001"));
        assert_eq!(outcome.tenant.allowed_grant_ids, ids(&[5, 9]));
        assert_eq!(outcome.tenant.template_id, Some(template_id));
        let assigned: Vec<GrantId> = fx
            .grants
            .list_by_tenant(outcome.tenant.id)
            .unwrap()
            .into_iter()
            .map(|a| a.grant_id)
            .collect();
        assert_eq!(assigned, ids(&[5, 9]));
    }

    #[test]
    fn hr_only_template_gets_core_moduleless_and_hr_grants() {
        let fx = Fixture::new();
        let template_id = fx.template(Some(&["HR"]), None);
        let mut req = request("ACME", "a@acme.test", None);
        req.tenant.subscription_template_id = Some(template_id);

        let outcome = fx.provisioner().provision("root", &req).unwrap();

        assert_eq!(outcome.tenant.allowed_grant_ids, ids(&[1, 2, 3]));
    }

    #[test]
    fn unknown_template_is_not_found_and_writes_nothing() {
        let fx = Fixture::new();
        let mut req = request("ACME", "a@acme.test", None);
        req.tenant.subscription_template_id = Some(TemplateId::new());

        let failure = fx.provisioner().provision("root", &req).unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::NotFound);
        assert_eq!(failure.failed_step, "resolve_plan");
        assert!(fx.tenants.is_empty());
        assert!(fx.identities.is_empty());
    }

    #[test]
    fn deriving_grants_twice_is_idempotent() {
        let fx = Fixture::new();
        let req = request("ACME", "a@acme.test", Some("PREMIUM"));
        let outcome = fx.provisioner().provision("root", &req).unwrap();
        let rows = fx.grants.row_count();

        let plan = resolve_plan(
            fx.stores.templates.as_ref(),
            &req,
            "TRIAL",
            outcome.tenant.start_date,
        )
        .unwrap();
        let again = apply_plan_grants(&fx.stores, outcome.tenant.id, &plan).unwrap();

        assert_eq!(again, outcome.tenant.allowed_grant_ids);
        assert_eq!(fx.grants.row_count(), rows);
        let stored = fx.tenants.get(outcome.tenant.id).unwrap().unwrap();
        assert_eq!(stored.allowed_grant_ids, again);
    }

    #[test]
    fn invalid_request_fails_before_any_store_call() {
        let fx = Fixture::new();
        fx.tenants.faults().fail("find");

        let failure = fx
            .provisioner()
            .provision("root", &request(" ", "a@acme.test", None))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::Validation);
        assert_eq!(failure.failed_step, "validate_request");
        assert!(fx.tenants.is_empty());
    }

    #[test]
    fn branding_is_saved_when_supplied() {
        let fx = Fixture::new();
        let mut req = request("ACME", "a@acme.test", None);
        req.tenant.branding = Some(BrandingInput {
            logo_url: Some("https://cdn.acme.test/logo.png".to_string()),
            primary_color: Some("#0055ff".to_string()),
            secondary_color: None,
        });

        let outcome = fx.provisioner().provision("root", &req).unwrap();

        let branding = fx.branding.get(outcome.tenant.id).unwrap().unwrap();
        assert_eq!(branding.primary_color.as_deref(), Some("#0055ff"));
        assert_eq!(branding.secondary_color, None);
    }

    #[test]
    fn audit_failure_is_a_warning() {
        let fx = Fixture::new();
        fx.audit.faults().fail("append");

        let outcome = fx
            .provisioner()
            .provision("root", &request("ACME", "a@acme.test", None))
            .unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].step, "emit_audit");
        assert!(fx.audit.events().is_empty());
        assert_eq!(outcome.employee_code.as_deref(), Some("ACME-T-001"));
    }
}
