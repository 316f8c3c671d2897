use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayfarer_api::{app, AppState};
use wayfarer_catalog::CatalogRepository;
use wayfarer_core::BookingStore;
use wayfarer_store::app_config::{Config, StorageBackend};
use wayfarer_store::{seed_sample_catalog, DbClient, MemoryStore, PgBookingStore, PgCatalogRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wayfarer_api=debug,wayfarer_booking=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Wayfarer API on port {}", config.server.port);

    let (booking_store, catalog_repo): (Arc<dyn BookingStore>, Arc<dyn CatalogRepository>) =
        match config.storage.backend {
            StorageBackend::Postgres => {
                let db = DbClient::new(&config.database)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;

                (
                    Arc::new(PgBookingStore::new(db.pool.clone(), config.database.lock_timeout_ms)),
                    Arc::new(PgCatalogRepository::new(db.pool.clone())),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on shutdown");
                let store = Arc::new(MemoryStore::with_open_user_registry());
                (store.clone(), store)
            }
        };

    if config.storage.seed_sample_data {
        seed_sample_catalog(catalog_repo.as_ref(), chrono::Utc::now().date_naive())
            .await
            .context("Failed to seed sample data")?;
    }

    let state = AppState::new(
        booking_store,
        catalog_repo,
        &config.booking,
        config.events.channel_capacity,
    );

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
