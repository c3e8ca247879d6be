//! HTTP API: server wiring, auth middleware and the tenant provisioning route.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
