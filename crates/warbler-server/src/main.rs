mod config;

use tower_http::trace::TraceLayer;
use tracing::info;

use warbler_db::Database;
use warbler_web::session::SessionKeys;
use warbler_web::{AppStateInner, router};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warbler=debug,warbler_web=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = if config.in_memory() {
        info!("Using an in-memory database; nothing will persist");
        Database::open_in_memory()?
    } else {
        Database::open(&config.db_path)?
    };

    let sessions = SessionKeys::new(config.secret_key.as_bytes(), config.session_ttl()?);
    let state = AppStateInner::new(db, sessions)?;

    let app = router(state).layer(TraceLayer::new_for_http());

    info!("Warbler listening on {}", config.addr);
    info!("Database: {}", config.db_path.display());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
