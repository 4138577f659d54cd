use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod blob;
mod catalog;
mod error;
mod identity;
mod ledger;
mod middleware;
mod models;
mod reports;
mod repositories;
mod reviews;
mod routes;
mod settings;
mod state;
mod store;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, init_pool, run_migrations},
};
use tokio::net::TcpListener;

use crate::{
    blob::BlobStore,
    middleware::{JwtConfig, TokenVerifier},
    settings::ServiceSettings,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let settings = ServiceSettings::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    run_migrations(&pool).await?;

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let jwt_config = JwtConfig::from_env().map_err(anyhow::Error::msg)?;
    let tokens = TokenVerifier::new(&jwt_config).map_err(anyhow::Error::msg)?;

    let blobs = BlobStore::init(&settings.upload_dir).await?;

    let app_state = AppState::new(pool, redis_pool, blobs, tokens, settings.loan_period_days);
    let app = routes::create_router(app_state, settings.max_upload_bytes);

    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!("API service listening on {}", settings.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
