//! # Brightline API Server
//!
//! Backend for the Brightline marketing site: services, case studies and
//! impact stories for the public pages, plus contact/quote/demo forms and
//! file uploads that fan out to email and the CRM.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=sqlite://brightline.db JWT_SECRET=... cargo run -p brightline-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use brightline_api::{
    app::{self, AppState},
    config::Config,
};
use brightline_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "brightline_api=debug,brightline_shared=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        "Brightline API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    // Database
    ensure_database_exists(&config.database.url).await?;
    let db_config = if config.database.url.contains(":memory:") {
        DatabaseConfig::in_memory()
    } else {
        DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        }
    };
    let pool = create_pool(db_config).await?;
    run_migrations(&pool).await?;

    // Collaborators and router
    let integrations = app::integrations_from_config(&config)?;
    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config, integrations);
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
