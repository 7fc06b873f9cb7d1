use std::sync::Arc;

use anyhow::Context;

use stockroom_infra::StockroomConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let config = StockroomConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(stockroom_api::app::services::build_services(&config).await?);
    let app = stockroom_api::app::build_app(services);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
