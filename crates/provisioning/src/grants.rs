//! Grant selection for a resolved plan.

use std::collections::BTreeSet;

use tenancy_core::GrantId;

use crate::model::MenuGrant;
use crate::plan::PlanConfiguration;

/// Grants a tenant on `plan` receives.
///
/// An explicit non-empty allow-list wins as-is. Otherwise every active catalog
/// entry that is core, has no module, or belongs to an enabled module.
pub fn select_grants(plan: &PlanConfiguration, catalog: &[MenuGrant]) -> Vec<GrantId> {
    if let Some(explicit) = plan.explicit_grants() {
        return normalize_grant_ids(explicit.iter().copied());
    }

    let selected = catalog
        .iter()
        .filter(|grant| grant.is_active)
        .filter(|grant| match grant.module.as_deref() {
            _ if grant.is_core => true,
            None => true,
            Some(module) => plan.modules.contains(module),
        })
        .map(|grant| grant.id);
    normalize_grant_ids(selected)
}

/// Sorted, deduplicated id list; the shape of the tenant's cached allow-list.
pub fn normalize_grant_ids(ids: impl IntoIterator<Item = GrantId>) -> Vec<GrantId> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}
