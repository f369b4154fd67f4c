mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use fundraise_api::AppStateInner;
use fundraise_api::auth::TokenIssuer;
use fundraise_api::payments::CheckoutLinks;
use fundraise_api::storage::Storage;

use crate::config::Config;

/// The binary's own target is `fundraise`, after the `[[bin]]` name.
const DEFAULT_LOG_FILTER: &str = "fundraise=debug,fundraise_api=debug,fundraise_db=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and storage
    let db = fundraise_db::Database::open(&config.db_path)?;
    let storage = Storage::new(config.storage_dir.clone()).await?;

    let state = AppStateInner::new(
        db,
        storage,
        TokenIssuer::new(&config.jwt_secret, chrono_hours(config.token_ttl_hours)),
        Arc::new(CheckoutLinks::new(config.payment_base_url.clone())?),
        config.max_upload_bytes,
    );

    let app = fundraise_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Fundraise server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn chrono_hours(hours: i64) -> chrono::Duration {
    chrono::Duration::hours(hours)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
