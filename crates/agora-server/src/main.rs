use std::net::SocketAddr;
use std::sync::Arc;

use axum::{ServiceExt, extract::Request};
use tracing::info;

use agora_api::config::Config;
use agora_api::google::GoogleClient;
use agora_api::routes;
use agora_api::state::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "agora_server=debug,agora_api=debug,agora_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = agora_db::Database::open(&config.db_path)?;
    let pruned = db.prune_sessions()?;
    info!("Pruned {} expired sessions at startup", pruned);

    let state: AppState = Arc::new(AppStateInner {
        db,
        google: GoogleClient::new(config.google),
        cookie_secure: config.cookie_secure,
    });

    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
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
