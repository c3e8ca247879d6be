use std::sync::Arc;

use anyhow::Context;

use tenancy_api::app::{self, ApiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenancy_observability::init();

    let config = ApiConfig::from_env();
    let services = app::services::build_services(&config)
        .await
        .context("failed to build services")?;

    let app = app::build_app(&config.jwt_secret, Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
