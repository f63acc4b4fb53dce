use livetalk::bootstrap;
use livetalk::config::Config;
use livetalk::infrastructure::http::router::build_router;
use livetalk::infrastructure::observability;
use livetalk::infrastructure::persistence::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    let _guard = observability::init(&config)?;
    tracing::info!("Configuration loaded");

    // Initialize database connection
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connection established");

    // Run migrations
    db.run_migrations().await?;
    tracing::info!("Database migrations applied");

    let state = bootstrap::build_app_state(db, &config);
    let app = build_router(state);

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
