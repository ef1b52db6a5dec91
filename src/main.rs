mod config;

use clap::Parser as _;
use config::Config;
use keyrelay::{
    AppState, build_router,
    credential::{CredentialSource, EnvCredential},
    upstream::Upstream,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse().validate()?;
    info!("Starting proxy with config: {:?}", config);

    // The credential is read per request; this only flags a likely misconfiguration early.
    let credentials = EnvCredential::default();
    if credentials.credential().is_none() {
        warn!(
            "{} is not set, forwarded requests will fail until it is",
            credentials.var()
        );
    }

    let upstream = Upstream::builder()
        .url(config.upstream)
        .credentials(Arc::new(credentials))
        .build();
    let app_state = AppState::new(upstream);
    let router = build_router(app_state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Proxy listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
