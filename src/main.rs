use clap::Parser;
use yt_oauth::CredentialStore;

mod config;
mod fetch;
mod logging;
mod server;

use config::Args;
use server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Values from .env act as defaults for the environment-backed flags
    dotenvy::dotenv().ok();

    let args = Args::parse();
    logging::init_logging(&args.log_level, args.log_format)?;

    let oauth = args.oauth_config();
    let store = CredentialStore::new(&args.token_path);
    tracing::info!(token_path = %args.token_path, "Using credential file");
    tracing::info!(rest_api_address = %args.rest_api_address, "Using YouTube Data API");

    let state = AppState::new(oauth, store, &args.rest_api_address);
    let app = server::router(state);

    let listen_address = args.listen_address();
    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .map_err(|e| format!("Failed to bind '{}': {}", listen_address, e))?;

    tracing::info!(
        "Server is running on http://localhost:{} (login at /login, fetch at /liked)",
        args.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
