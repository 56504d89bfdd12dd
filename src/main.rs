use std::net::SocketAddr;
use std::sync::Arc;

use candidature_backend::{
    config::{get_config, init_config},
    database::{
        pool::{create_pool, run_migrations},
        KeyValueStore, MemoryStorage, PgStorage,
    },
    routes, AppState,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let (storage, backend): (Arc<dyn KeyValueStore>, &'static str) = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            (Arc::new(PgStorage::new(pool)), "postgres")
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data will not survive a restart");
            (Arc::new(MemoryStorage::new()), "memory")
        }
    };

    let app_state = AppState::new(storage, backend, config).await?;

    {
        let mut changes = app_state.store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) => {
                        tracing::debug!(collection = ?event.collection, "Record store changed")
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Change observer lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let app = routes::api_router()
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
