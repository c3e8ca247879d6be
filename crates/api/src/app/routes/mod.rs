use axum::Router;

pub mod system;
pub mod tenants;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new().nest("/admin", tenants::router())
}
