//! SSO gateway server.

use anyhow::Context;
use rust_common::{KvBackend, MemoryKv, RedisKv, init_tracing};
use sso_gateway::clock::SystemClock;
use sso_gateway::http::{AppState, router};
use sso_gateway::payload::Extensions;
use sso_gateway::{Config, Gateway};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    init_tracing(&config.tracing()).context("initializing tracing")?;

    info!("Starting SSO gateway");

    let kv: Arc<dyn KvBackend> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisKv::connect(url)
                .await
                .context("connecting to Redis")?,
        ),
        None => {
            warn!("REDIS_URL not set, using the in-memory backend; clients are lost on restart");
            Arc::new(MemoryKv::new())
        }
    };

    let gateway = Gateway::new(kv, Arc::new(SystemClock), &config, Extensions::new())
        .context("wiring gateway")?;
    let app = router(AppState::new(gateway.registrar));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("parsing listen address")?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "SSO gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SSO gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
