use datti::{
    api::{AppState, build_router},
    auth,
    cache::BalanceCache,
    config::{
        database::{create_connection, create_tables, ensure_sqlite_dir},
        load_app_configuration,
    },
    errors::Result,
};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the main application configuration
    let app_config = load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and make sure the schema exists
    ensure_sqlite_dir(&app_config.database.url)?;
    let database = create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    create_tables(&database)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Wire up identity and shared state
    let state = AppState {
        database,
        cache: BalanceCache::new(app_config.ledger.cache_balances),
        identity: auth::from_config(&app_config.auth)?,
    };

    // 6. Serve until Ctrl+C
    let listener = TcpListener::bind(app_config.server.http_addr).await?;
    info!(addr = %app_config.server.http_addr, "Datti listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
}
