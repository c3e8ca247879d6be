use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tenancy_infra::{ErrorKind, ProvisioningFailure};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DependencyFailure
        | ErrorKind::CompensationFailure
        | ErrorKind::BestEffortFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status and code come from the originating fault. An incomplete unwind is
/// reported alongside it.
pub fn provisioning_failure_to_response(failure: &ProvisioningFailure) -> axum::response::Response {
    let kind = failure.kind();
    let mut body = json!({
        "error": kind.as_str(),
        "message": failure.error.to_string(),
    });
    if let Some(compensation) = failure.compensation_kind() {
        body["compensation"] = json!(compensation.as_str());
        body["saga_id"] = json!(failure.saga_id.to_string());
    }
    (status_for(kind), axum::Json(body)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
