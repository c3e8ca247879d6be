//! Platform-admin tenant provisioning.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use tenancy_auth::Permission;
use tenancy_provisioning::ProvisioningRequest;

use crate::app::dto::ProvisionTenantResponse;
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/tenants", post(provision_tenant))
}

/// POST /admin/tenants - create a tenant and its first administrator
pub async fn provision_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<ProvisioningRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = authz::require_permission(&principal, &Permission::TENANTS_PROVISION) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation", rejection.body_text());
        }
    };

    // Store calls block; keep them off the async workers.
    let actor = principal.principal_id().to_string();
    let provisioner = services.provisioner.clone();
    let result = tokio::task::spawn_blocking(move || provisioner.provision(&actor, &request)).await;

    match result {
        Ok(Ok(outcome)) => (
            StatusCode::CREATED,
            Json(ProvisionTenantResponse::from(outcome)),
        )
            .into_response(),
        Ok(Err(failure)) => errors::provisioning_failure_to_response(&failure),
        Err(join) => {
            tracing::error!(error = %join, "provisioning task did not complete");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "provisioning task did not complete",
            )
        }
    }
}
