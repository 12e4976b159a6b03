use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merx_api::state::{AppState, AuthConfig};
use merx_order::GatewayRegistry;
use merx_store::{Config, Db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merx_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load configuration")?;
    tracing::info!("starting merx API on port {}", config.server.port);

    let db = Db::connect(&config.database.url)
        .await
        .context("failed to open database")?;
    db.migrate().await.context("failed to run migrations")?;

    let gateways = GatewayRegistry::from_names(
        &config.payments.gateways,
        config.payments.simulated_success_rate,
    )
    .context("failed to build payment gateways")?;

    let state = AppState::assemble(
        &db,
        gateways,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        config.payments.default_gateway.clone(),
        Duration::from_millis(config.payments.charge_timeout_ms),
    );

    let app = merx_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
