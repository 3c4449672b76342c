// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;

use crate::application::air_quality_service::AirQualityService;
use crate::application::cache::{CacheAside, CacheStore};
use crate::application::dashboard_service::DashboardService;
use crate::application::monitoring_repository::MonitoringRepository;
use crate::application::station_service::StationService;
use crate::infrastructure::config::{CacheBackend, CacheSettings, load_app_config};
use crate::infrastructure::memory_cache::MemoryCache;
use crate::infrastructure::postgres_repository::PostgresRepository;
use crate::infrastructure::redis_cache::RedisCache;
use crate::infrastructure::telemetry;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config().context("failed to load configuration")?;

    // Initialize tracing
    telemetry::init(&config.logging)?;

    // Create repository (infrastructure layer)
    let pool = PostgresRepository::connect(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(config.database.acquire_timeout_secs),
    )
    .await
    .context("failed to connect to the database")?;

    if config.database.run_migrations {
        PostgresRepository::run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;
        tracing::info!("database migrations applied");
    }

    let repository: Arc<dyn MonitoringRepository> = Arc::new(PostgresRepository::new(pool));
    let cache = build_cache(&config.cache).await;
    tracing::info!(enabled = cache.is_enabled(), "response cache configured");

    // Create services (application layer)
    let station_service = StationService::new(repository.clone(), cache.clone());
    let air_quality_service = AirQualityService::new(repository.clone(), cache.clone());
    let dashboard_service = DashboardService::new(repository, cache);

    // Create application state
    let state = Arc::new(AppState {
        station_service,
        air_quality_service,
        dashboard_service,
    });

    // Build router (presentation layer)
    let router = build_router(state, &config.cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    tracing::info!(%addr, "starting ispu-monitor service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// An unreachable Redis is not fatal: the service runs uncached.
async fn build_cache(settings: &CacheSettings) -> CacheAside {
    let store: Option<Arc<dyn CacheStore>> = match settings.backend {
        CacheBackend::None => None,
        CacheBackend::Memory => Some(Arc::new(MemoryCache::new())),
        CacheBackend::Redis => match settings.redis_url.as_deref() {
            None => {
                tracing::warn!("redis cache selected without cache.redis_url, running without cache");
                None
            }
            Some(url) => match RedisCache::connect(url).await {
                Ok(redis) => Some(Arc::new(redis)),
                Err(e) => {
                    tracing::warn!(error = %e, "redis unavailable, running without cache");
                    None
                }
            },
        },
    };
    CacheAside::new(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
