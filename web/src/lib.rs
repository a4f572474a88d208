use log::*;
pub use service::AppState;
use tokio::net::TcpListener;

mod controller;
mod error;
pub(crate) mod params;
mod router;
mod ws;

pub use error::{Error, Result};

/// Serves the API until a shutdown signal arrives. On shutdown the hub is
/// closed first so open WebSocket connections finish with a Close frame
/// instead of holding the graceful shutdown open.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );

    let listener = TcpListener::bind(&server_url).await?;

    info!(
        "Server starting... listening for connections on http://{} ({} environment)",
        server_url,
        app_state.config.runtime_env()
    );

    let hub = app_state.hub.clone();
    let router = router::define_routes(app_state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(hub.clone()))
        .await?;

    hub.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal(hub: hub::Hub) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
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

    info!("Shutdown signal received, closing subscriber connections");
    hub.close();
}
