//! Uniqueness pre-checks run before any write.
//!
//! Advisory only: the store constraints are authoritative, and a violation
//! raised by an insert maps to the same conflict.

use tenancy_saga::SagaStep;

use super::compensation::ProvisioningCompensation;
use super::error::ProvisioningError;
use super::state::{ProvisioningPhase, ProvisioningState};
use super::StepContext;

pub struct CheckDuplicates;

impl<'a> SagaStep<StepContext<'a>, ProvisioningState, ProvisioningCompensation, ProvisioningError>
    for CheckDuplicates
{
    fn name(&self) -> &'static str {
        "check_duplicates"
    }

    fn execute(
        &self,
        ctx: &StepContext<'a>,
        state: &mut ProvisioningState,
    ) -> Result<Option<ProvisioningCompensation>, ProvisioningError> {
        let code = ctx.request.tenant_code();
        if ctx
            .stores
            .tenants
            .find_by_code(&code)
            .map_err(ProvisioningError::store("find_tenant_by_code"))?
            .is_some()
        {
            return Err(ProvisioningError::Conflict {
                field: "code".to_string(),
            });
        }

        let email = ctx.request.admin_email();
        if ctx
            .stores
            .identities
            .find_by_email(&email)
            .map_err(ProvisioningError::store("find_identity_by_email"))?
            .is_some()
        {
            return Err(ProvisioningError::Conflict {
                field: "email".to_string(),
            });
        }

        state.advance(ProvisioningPhase::DuplicatesChecked);
        Ok(None)
    }
}
