use std::sync::Arc;

use sonara_api::{
    auth::{PasswordService, TokenService},
    bootstrap_admin,
    config::AppConfig,
    create_router, db,
    users::PgUserRepository,
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Sonara API - Starting...");
    tracing::debug!("Configuration: {:?}", config);

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url).await?;

    db::run_migrations(&db_pool).await?;

    let state = AppState::new(
        Arc::new(PgUserRepository::new(db_pool)),
        PasswordService::new(),
        TokenService::new(config.jwt_secret.as_bytes(), config.jwt_ttl_secs),
    );

    if let Some(admin) = &config.bootstrap_admin {
        if let Err(e) = bootstrap_admin(&state.users, admin).await {
            tracing::error!("Failed to create bootstrap administrator: {:?}", e);
        }
    }

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Sonara API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
