//! Server: composes the modules under `MODULES_DIR`, syncs their tables and serves the API.
//!
//! Run from repo root: `cargo run -p api-skeleton-server`

use api_skeleton::{
    app_router, compose, connect, ensure_database_exists, sync_schema, ServiceCatalog, Settings,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("api_skeleton=info,tower_http=info")),
        )
        .init();

    // Fail fast on bad module configuration, before touching the database.
    let app = compose(&settings, &ServiceCatalog::with_builtins())?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = connect(&settings).await?;
    if settings.schema_sync {
        sync_schema(&pool, &app.composition, &settings.database_schema).await?;
    }

    let state = app.into_state(pool);
    let router = app_router(state, settings.max_body_bytes);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        environment = %settings.app_env,
        "listening"
    );
    axum::serve(listener, router).await?;
    Ok(())
}
