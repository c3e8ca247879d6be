//! Subscription plans: the fixed catalog, stored templates, and the
//! normalized configuration the saga provisions from.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use tenancy_core::{DomainError, DomainResult, GrantId, TemplateId};

use crate::request::LimitOverrides;

pub const TRIAL_PLAN: &str = "TRIAL";
pub const CUSTOM_PLAN: &str = "CUSTOM";
pub const CUSTOM_PLAN_PREFIX: char = 'C';

const TRIAL_WINDOW_DAYS: u64 = 30;
const DEFAULT_WINDOW_DAYS: u64 = 365;

const TEMPLATE_DEFAULT_LIMITS: Limits = Limits {
    max_users: 10,
    max_branches: 1,
    max_departments: 5,
};
const TEMPLATE_DEFAULT_SUPPORT_TIER: &str = "email";

/// Seat/branch/department limits. `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_users: u32,
    pub max_branches: u32,
    pub max_departments: u32,
}

impl Limits {
    /// Replace each limit the overrides set explicitly.
    pub fn with_overrides(self, overrides: &LimitOverrides) -> Self {
        Self {
            max_users: overrides.max_users.unwrap_or(self.max_users),
            max_branches: overrides.max_branches.unwrap_or(self.max_branches),
            max_departments: overrides.max_departments.unwrap_or(self.max_departments),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Trial,
    Active,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "TRIAL",
            SubscriptionStatus::Active => "ACTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TRIAL" => Some(SubscriptionStatus::Trial),
            "ACTIVE" => Some(SubscriptionStatus::Active),
            _ => None,
        }
    }
}

/// A fixed catalog plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanCatalogEntry {
    pub name: &'static str,
    pub prefix: char,
    pub limits: Limits,
    pub modules: &'static [&'static str],
    pub support_tier: &'static str,
    pub trial_days: u32,
}

const TRIAL_MODULES: &[&str] = &["CORE", "HR"];
const BASIC_MODULES: &[&str] = &["CORE", "HR", "PAYROLL"];
const STANDARD_MODULES: &[&str] = &["CORE", "HR", "PAYROLL", "ATTENDANCE", "LEAVE"];
const PREMIUM_MODULES: &[&str] = &[
    "CORE",
    "HR",
    "PAYROLL",
    "ATTENDANCE",
    "LEAVE",
    "RECRUITMENT",
    "PERFORMANCE",
];
const ENTERPRISE_MODULES: &[&str] = &[
    "CORE",
    "HR",
    "PAYROLL",
    "ATTENDANCE",
    "LEAVE",
    "RECRUITMENT",
    "PERFORMANCE",
    "ANALYTICS",
    "API",
];

/// The plan catalog. The first entry is the fallback for unknown names.
pub const PLAN_CATALOG: [PlanCatalogEntry; 5] = [
    PlanCatalogEntry {
        name: TRIAL_PLAN,
        prefix: 'T',
        limits: Limits {
            max_users: 5,
            max_branches: 1,
            max_departments: 3,
        },
        modules: TRIAL_MODULES,
        support_tier: "community",
        trial_days: 30,
    },
    PlanCatalogEntry {
        name: "BASIC",
        prefix: 'B',
        limits: Limits {
            max_users: 10,
            max_branches: 2,
            max_departments: 5,
        },
        modules: BASIC_MODULES,
        support_tier: "email",
        trial_days: 0,
    },
    PlanCatalogEntry {
        name: "STANDARD",
        prefix: 'S',
        limits: Limits {
            max_users: 50,
            max_branches: 5,
            max_departments: 20,
        },
        modules: STANDARD_MODULES,
        support_tier: "standard",
        trial_days: 0,
    },
    PlanCatalogEntry {
        name: "PREMIUM",
        prefix: 'P',
        limits: Limits {
            max_users: 200,
            max_branches: 20,
            max_departments: 50,
        },
        modules: PREMIUM_MODULES,
        support_tier: "priority",
        trial_days: 0,
    },
    PlanCatalogEntry {
        name: "ENTERPRISE",
        prefix: 'E',
        limits: Limits {
            max_users: 0,
            max_branches: 0,
            max_departments: 0,
        },
        modules: ENTERPRISE_MODULES,
        support_tier: "dedicated",
        trial_days: 0,
    },
];

impl PlanCatalogEntry {
    /// Look up a plan by case-insensitive name, falling back to the trial plan.
    pub fn lookup(name: &str) -> &'static PlanCatalogEntry {
        let wanted = name.trim().to_ascii_uppercase();
        PLAN_CATALOG
            .iter()
            .find(|entry| entry.name == wanted)
            .unwrap_or(&PLAN_CATALOG[0])
    }

    pub fn trial() -> &'static PlanCatalogEntry {
        &PLAN_CATALOG[0]
    }

    pub fn is_trial(&self) -> bool {
        self.name == TRIAL_PLAN
    }

    fn module_set(&self) -> BTreeSet<String> {
        self.modules.iter().map(|m| m.to_string()).collect()
    }
}

/// A stored subscription template. Every field but the name is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTemplate {
    pub id: TemplateId,
    pub name: String,
    pub max_users: Option<u32>,
    pub max_branches: Option<u32>,
    pub max_departments: Option<u32>,
    pub modules: Option<Vec<String>>,
    pub allowed_grant_ids: Option<Vec<GrantId>>,
    pub trial_days: Option<u32>,
    pub support_tier: Option<String>,
    pub validity_days: Option<u32>,
    pub is_active: bool,
}

/// Normalized plan the saga provisions from.
///
/// Limits are always present and the module set is never empty, whichever
/// source produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfiguration {
    pub plan_name: String,
    pub prefix: char,
    pub limits: Limits,
    pub modules: BTreeSet<String>,
    pub allowed_grant_ids: Option<Vec<GrantId>>,
    pub trial_days: u32,
    pub support_tier: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub template_id: Option<TemplateId>,
}

impl PlanConfiguration {
    /// Build from a catalog entry. Trial runs 30 days, every other plan a year.
    pub fn from_catalog(entry: &PlanCatalogEntry, start_date: NaiveDate) -> DomainResult<Self> {
        let window = if entry.is_trial() {
            TRIAL_WINDOW_DAYS
        } else {
            DEFAULT_WINDOW_DAYS
        };
        Ok(Self {
            plan_name: entry.name.to_string(),
            prefix: entry.prefix,
            limits: entry.limits,
            modules: entry.module_set(),
            allowed_grant_ids: None,
            trial_days: entry.trial_days,
            support_tier: entry.support_tier.to_string(),
            start_date,
            end_date: add_days(start_date, window)?,
            template_id: None,
        })
    }

    /// Map a template onto a plan, substituting defaults for unset fields.
    ///
    /// An explicit `0` limit is kept (unlimited). An unset or empty module
    /// list falls back to the trial modules.
    pub fn from_template(template: &SubscriptionTemplate, start_date: NaiveDate) -> DomainResult<Self> {
        let limits = Limits {
            max_users: template
                .max_users
                .unwrap_or(TEMPLATE_DEFAULT_LIMITS.max_users),
            max_branches: template
                .max_branches
                .unwrap_or(TEMPLATE_DEFAULT_LIMITS.max_branches),
            max_departments: template
                .max_departments
                .unwrap_or(TEMPLATE_DEFAULT_LIMITS.max_departments),
        };

        let modules: BTreeSet<String> = match template.modules.as_deref() {
            Some(list) if list.iter().any(|m| !m.trim().is_empty()) => list
                .iter()
                .map(|m| m.trim().to_ascii_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
            _ => PlanCatalogEntry::trial().module_set(),
        };

        let window = match template.validity_days {
            Some(days) if days > 0 => u64::from(days),
            _ => DEFAULT_WINDOW_DAYS,
        };

        Ok(Self {
            plan_name: CUSTOM_PLAN.to_string(),
            prefix: CUSTOM_PLAN_PREFIX,
            limits,
            modules,
            allowed_grant_ids: template.allowed_grant_ids.clone(),
            trial_days: template.trial_days.unwrap_or(0),
            support_tier: template
                .support_tier
                .clone()
                .unwrap_or_else(|| TEMPLATE_DEFAULT_SUPPORT_TIER.to_string()),
            start_date,
            end_date: add_days(start_date, window)?,
            template_id: Some(template.id),
        })
    }

    pub fn with_overrides(mut self, overrides: &LimitOverrides) -> Self {
        self.limits = self.limits.with_overrides(overrides);
        self
    }

    pub fn status(&self) -> SubscriptionStatus {
        if self.trial_days > 0 {
            SubscriptionStatus::Trial
        } else {
            SubscriptionStatus::Active
        }
    }

    /// The explicit allow-list, when present and non-empty.
    pub fn explicit_grants(&self) -> Option<&[GrantId]> {
        self.allowed_grant_ids
            .as_deref()
            .filter(|ids| !ids.is_empty())
    }
}

fn add_days(start: NaiveDate, days: u64) -> DomainResult<NaiveDate> {
    start
        .checked_add_days(Days::new(days))
        .ok_or_else(|| DomainError::invariant(format!("subscription end date overflows from {start}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn template() -> SubscriptionTemplate {
        SubscriptionTemplate {
            id: TemplateId::new(),
            name: "Partner".to_string(),
            max_users: None,
            max_branches: None,
            max_departments: None,
            modules: None,
            allowed_grant_ids: None,
            trial_days: None,
            support_tier: None,
            validity_days: None,
            is_active: true,
        }
    }

    #[test]
    fn trial_plan_runs_thirty_days() {
        let plan = PlanConfiguration::from_catalog(PlanCatalogEntry::lookup("trial"), start()).unwrap();
        assert_eq!(plan.plan_name, "TRIAL");
        assert_eq!(plan.prefix, 'T');
        assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(plan.modules, BTreeSet::from(["CORE".to_string(), "HR".to_string()]));
        assert_eq!(plan.status(), SubscriptionStatus::Trial);
    }

    #[test]
    fn standard_plan_runs_a_year() {
        let plan = PlanConfiguration::from_catalog(PlanCatalogEntry::lookup("Standard"), start()).unwrap();
        assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(plan.limits.max_users, 50);
        assert!(plan.modules.contains("LEAVE"));
        assert_eq!(plan.status(), SubscriptionStatus::Active);
    }

    #[test]
    fn unknown_plan_falls_back_to_trial() {
        let entry = PlanCatalogEntry::lookup("platinum");
        assert_eq!(entry.name, "TRIAL");
        assert_eq!(entry.prefix, 'T');
    }

    #[test]
    fn catalog_prefixes_are_distinct() {
        let prefixes: BTreeSet<char> = PLAN_CATALOG.iter().map(|e| e.prefix).collect();
        assert_eq!(prefixes.len(), PLAN_CATALOG.len());
        assert!(!prefixes.contains(&CUSTOM_PLAN_PREFIX));
    }

    #[test]
    fn enterprise_is_unlimited() {
        let entry = PlanCatalogEntry::lookup("ENTERPRISE");
        assert_eq!(entry.limits.max_users, 0);
        assert!(entry.modules.contains(&"API"));
    }

    #[test]
    fn template_defaults_fill_unset_fields() {
        let plan = PlanConfiguration::from_template(&template(), start()).unwrap();
        assert_eq!(plan.plan_name, "CUSTOM");
        assert_eq!(plan.prefix, 'C');
        assert_eq!(plan.limits, TEMPLATE_DEFAULT_LIMITS);
        assert_eq!(plan.modules, BTreeSet::from(["CORE".to_string(), "HR".to_string()]));
        assert_eq!(plan.support_tier, "email");
        assert_eq!(plan.trial_days, 0);
        assert_eq!(plan.status(), SubscriptionStatus::Active);
        assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn template_explicit_zero_means_unlimited() {
        let mut t = template();
        t.max_users = Some(0);
        t.validity_days = Some(90);
        t.trial_days = Some(14);
        let plan = PlanConfiguration::from_template(&t, start()).unwrap();
        assert_eq!(plan.limits.max_users, 0);
        assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(plan.status(), SubscriptionStatus::Trial);
        assert_eq!(plan.template_id, Some(t.id));
    }

    #[test]
    fn empty_template_module_list_uses_trial_modules() {
        let mut t = template();
        t.modules = Some(vec![]);
        let plan = PlanConfiguration::from_template(&t, start()).unwrap();
        assert!(!plan.modules.is_empty());
    }

    #[test]
    fn overrides_replace_only_given_limits() {
        let plan = PlanConfiguration::from_catalog(PlanCatalogEntry::lookup("BASIC"), start())
            .unwrap()
            .with_overrides(&LimitOverrides {
                max_users: Some(25),
                ..LimitOverrides::default()
            });
        assert_eq!(plan.limits.max_users, 25);
        assert_eq!(plan.limits.max_branches, 2);
    }

    #[test]
    fn empty_allow_list_is_not_explicit() {
        let mut t = template();
        t.allowed_grant_ids = Some(vec![]);
        let plan = PlanConfiguration::from_template(&t, start()).unwrap();
        assert!(plan.explicit_grants().is_none());
    }
}
