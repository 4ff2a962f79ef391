use sea_orm::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shop_admin::api::create_api_router;
use shop_admin::config::AppConfig;
use shop_admin::directory::seed_demo;
use shop_admin::entities::setup_schema;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let db = Database::connect(config.database_url.as_str()).await?;
    setup_schema(&db).await?;

    if config.seed_demo {
        seed_demo(&db).await?;
    }

    let shared_db = Arc::new(db);
    let app = create_api_router(shared_db);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %listener.local_addr()?, "Running");
    axum::serve(listener, app).await?;

    Ok(())
}
