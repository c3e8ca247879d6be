use chrono::NaiveDate;

use tenancy_provisioning::{PlanCatalogEntry, PlanConfiguration, ProvisioningRequest};
use tenancy_saga::SagaStep;

use super::compensation::ProvisioningCompensation;
use super::error::ProvisioningError;
use super::state::{ProvisioningPhase, ProvisioningState};
use super::StepContext;
use crate::store::TemplateStore;

/// Resolve the plan a request provisions.
///
/// A template reference wins over a plan name; a missing or inactive
/// template is `TemplateNotFound`. Without either, `default_plan` is used.
/// Request limit overrides are applied last.
pub fn resolve_plan(
    templates: &dyn TemplateStore,
    request: &ProvisioningRequest,
    default_plan: &str,
    start_date: NaiveDate,
) -> Result<PlanConfiguration, ProvisioningError> {
    let plan = match request.tenant.subscription_template_id {
        Some(template_id) => {
            let template = templates
                .get(template_id)
                .map_err(ProvisioningError::store("get_template"))?
                .filter(|t| t.is_active)
                .ok_or(ProvisioningError::TemplateNotFound(template_id))?;
            PlanConfiguration::from_template(&template, start_date)?
        }
        None => {
            let name = request
                .tenant
                .plan
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(default_plan);
            PlanConfiguration::from_catalog(PlanCatalogEntry::lookup(name), start_date)?
        }
    };
    Ok(plan.with_overrides(&request.tenant.limits))
}

pub struct ResolvePlan;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for ResolvePlan
{
    fn name(&self) -> &'static str {
        "resolve_plan"
    }

    fn execute(
        &self,
        ctx: &StepContext<'a>,
        state: &mut ProvisioningState,
    ) -> Result<Option<ProvisioningCompensation>, ProvisioningError> {
        let plan = resolve_plan(
            ctx.stores.templates.as_ref(),
            ctx.request,
            &ctx.config.default_plan,
            ctx.now.date_naive(),
        )?;
        tracing::debug!(plan = %plan.plan_name, prefix = %plan.prefix, "plan resolved");
        state.plan = Some(plan);
        state.advance(ProvisioningPhase::PlanResolved);
        Ok(None)
    }
}
