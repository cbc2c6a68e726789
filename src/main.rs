use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maverick_api::{
    config::{CatalogSourceKind, Config},
    db::{
        create_pool, create_redis_client, load_dataset, run_migrations, Cache, CatalogSource,
        Enrichment, FileCatalogSource, PostgresCatalogSource,
    },
    routes::{create_router, AppState},
    services::{providers::TmdbProvider, HybridRecommender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maverick_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let settings = config
        .recommender_settings()
        .context("Invalid recommender settings")?;

    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url).context("Failed to open Redis client")?;
            let (cache, handle) = Cache::new(client);
            tracing::info!("Redis result cache enabled");
            (Some(cache), Some(handle))
        }
        None => (None, None),
    };

    let source: Box<dyn CatalogSource> = match config.catalog_source {
        CatalogSourceKind::Csv => Box::new(FileCatalogSource::new(
            config.movies_path.clone(),
            config.ratings_path.clone(),
        )),
        CatalogSourceKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres catalog source")?;
            let pool = create_pool(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            run_migrations(&pool).await?;
            Box::new(PostgresCatalogSource::new(pool))
        }
    };

    let enrichment = match &config.tmdb_api_key {
        Some(api_key) => Some(Enrichment {
            provider: Arc::new(TmdbProvider::new(
                api_key.clone(),
                config.tmdb_api_url.clone(),
                cache.clone(),
            )?),
            concurrency: config.enrichment_concurrency,
        }),
        None => {
            tracing::info!("TMDB_API_KEY not set, skipping metadata enrichment");
            None
        }
    };

    let dataset = load_dataset(source.as_ref(), settings.rating_scale, enrichment)
        .await
        .with_context(|| format!("Failed to load catalog from {}", source.name()))?;
    let recommender = Arc::new(HybridRecommender::new(dataset, settings)?);

    let state = AppState::new(recommender, cache, config.recommendation_cache_ttl);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
