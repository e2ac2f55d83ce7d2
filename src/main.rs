use anyhow::{Context, Result};
use std::{fs, net::SocketAddr, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use busmarket_catalog::{
    AppState,
    catalog::{CatalogQueryService, FallbackBounds, FilterBoundsAggregator},
    config::Settings,
    create_router,
    models::Listing,
    store::{CatalogStore, SqliteStore},
};

// Load a JSON array of listings into the store, only when it has no records yet
async fn seed_if_empty(store: &SqliteStore, seed_path: &Path) -> Result<()> {
    if !store.is_empty().await.context("Failed to inspect catalog store")? {
        tracing::info!("Catalog store already populated, skipping seed.");
        return Ok(());
    }

    let content = fs::read_to_string(seed_path)
        .with_context(|| format!("Failed to read seed file {}", seed_path.display()))?;
    let listings: Vec<Listing> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file {}", seed_path.display()))?;

    let count = listings.len();
    for listing in listings {
        store.upsert(listing).await.context("Failed to insert seed listing")?;
    }
    tracing::info!("Seeded catalog with {} listings from {}", count, seed_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "busmarket_catalog=info,tower_http=info".into()))
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing BusMarket catalog server...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    if settings.admin_jwt_secret.is_none() {
        tracing::warn!("admin_jwt_secret is not set; /api/admin/listings will reject every request.");
    }

    let store = SqliteStore::open(&settings.database_path)
        .with_context(|| format!("Failed to open catalog database {}", settings.database_path))?;
    if let Some(seed_path) = settings.seed_path.as_deref() {
        seed_if_empty(&store, Path::new(seed_path)).await?;
    }

    let store: Arc<dyn CatalogStore> = Arc::new(store);
    let aggregator = FilterBoundsAggregator::new(Arc::clone(&store), FallbackBounds::from_settings(&settings.catalog));
    let app_state = AppState {
        settings: Arc::new(settings),
        catalog: Arc::new(CatalogQueryService::new(store, aggregator)),
    };

    let addr: SocketAddr = app_state
        .settings
        .server_address
        .parse()
        .with_context(|| format!("Invalid server address format: {}", app_state.settings.server_address))?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, create_router(app_state).into_make_service()).await?;

    Ok(())
}
