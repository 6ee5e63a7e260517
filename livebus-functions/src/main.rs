use std::sync::Arc;

use anyhow::Result;
use livebus_core::logging::init_tracing;
use livebus_functions::{router, Functions, FunctionsConfig, HttpMailRelay};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = FunctionsConfig::from_env()?;
    let relay = HttpMailRelay::new(&config.relay_url, &config.relay_api_key)?;
    let functions = Functions::new(Arc::new(relay), config.mail_settings());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "livebus functions listening");

    axum::serve(listener, router(Arc::new(functions))).await?;

    Ok(())
}
