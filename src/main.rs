//! Kars e-commerce backend

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kars::api::{self, AppState, PgSessionAuthenticator};
use kars::config::Config;
use kars::services::{EventBus, Services};
use kars::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
    store.migrate().await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, %url, "NATS unavailable, domain events will only be logged");
                None
            }
        },
        None => None,
    };

    let auth = Arc::new(PgSessionAuthenticator::new(store.pool().clone()));
    let services = Services::new(Arc::new(store), EventBus::new(nats));
    let app = api::router(AppState::new(services, auth));

    let addr = config.socket_addr();
    tracing::info!("Kars e-commerce listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
