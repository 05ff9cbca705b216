//! Ledgerflow API server entry point.

use std::sync::Arc;

use ledgerflow_api::config::Config;
use ledgerflow_api::error::AppError;
use ledgerflow_api::state::AppState;
use ledgerflow_core::clock::SystemClock;
use ledgerflow_core::store::EventStore;
use ledgerflow_event_store::{InMemoryEventStore, PgEventStore, schema};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

async fn connect_event_store(config: &Config) -> Result<Arc<dyn EventStore>, AppError> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, events are kept in memory");
        return Ok(Arc::new(InMemoryEventStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    schema::migrate(&pool).await?;
    Ok(Arc::new(PgEventStore::new(pool)))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Ledgerflow API server");

    let config = Config::from_env()?;
    let event_store = connect_event_store(&config).await?;
    let app_state = AppState::new(event_store, Arc::new(SystemClock))?;
    let app = ledgerflow_api::app(app_state);

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
