//! ShopLux Storefront - product catalog, cart and sign-in API

use std::sync::Arc;

use anyhow::{Context, Result};
use shoplux_storefront::{
    api::{self, AppState, SessionLimits},
    auth::InMemoryAuthProvider,
    config::Config,
    Catalog,
};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let catalog = Catalog::load(config.catalog_path.as_deref(), &config.currency)?;
    let limits = SessionLimits { max_sessions: config.max_sessions, idle_timeout: config.session_idle };
    let state = AppState::with_limits(catalog, Arc::new(InMemoryAuthProvider::new()), limits);
    let app = api::router(state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await.with_context(|| format!("binding {address}"))?;
    info!("ShopLux storefront listening on {}", address);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
