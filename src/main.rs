use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use taquilla_rollup::config::{Config, FactStoreKind};
use taquilla_rollup::{
    api, init_db, FactStore, PeriodResolver, Repository, RestFactStore, SqliteFactStore,
    StatsService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;

    let store: Arc<dyn FactStore> = match config.fact_store {
        FactStoreKind::Sqlite => {
            let path = config.database_path.as_deref().unwrap_or_default();
            let pool = init_db(path)
                .await
                .with_context(|| format!("Failed to initialize database at {}", path))?;
            tracing::info!("Using SQLite fact store at {}", path);
            Arc::new(SqliteFactStore::new(Arc::new(Repository::new(pool))))
        }
        FactStoreKind::Rest => {
            let url = config.fact_store_url.clone().unwrap_or_default();
            tracing::info!("Using REST fact store at {}", url);
            Arc::new(RestFactStore::new(url, config.fact_store_api_key.clone()))
        }
    };

    let resolver = PeriodResolver::new(config.utc_offset);
    let service = Arc::new(StatsService::new(store, resolver));
    let app = api::create_router(api::AppState::new(service));

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        "Server listening on {} (business offset {})",
        addr,
        config.utc_offset
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
