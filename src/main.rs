//! Storefront - catalog, cart and ordering service

use std::sync::Arc;

use anyhow::Result;
use storefront::api::{self, AppState};
use storefront::config::Config;
use storefront::notify::{LogListener, NatsPublisher, OrderHooks};
use storefront::repository::{InMemoryStore, PgStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, keeping data in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let mut hooks = OrderHooks::new().with(LogListener);
    if let Some(url) = &config.nats_url {
        match NatsPublisher::connect(url, &config.nats_subject).await {
            Ok(publisher) => hooks = hooks.with(publisher),
            Err(e) => tracing::warn!(error = %e, "NATS unavailable, order events will not be published"),
        }
    }

    let app = api::router(AppState::new(store, hooks));
    let addr = config.bind_address();
    tracing::info!("Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
