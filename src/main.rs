//! Portal Store server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_store::auth::{AuthContext, GoTrueClient};
use portal_store::db::{DataClient, MemoryClient, PostgrestClient};
use portal_store::{create_router, spawn_purge_task, AppState, Backend, Config};

/// Main entry point for the Portal Store server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the data client (signing in first when credentials are set)
/// 4. Start the expired entry purge task if enabled
/// 5. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_store=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portal Store");

    let config = Config::from_env();
    info!(
        backend = config.backend.as_str(),
        default_ttl = config.default_ttl,
        port = config.server_port,
        cleanup_interval = config.cleanup_interval,
        tables = ?config.tables,
        "configuration loaded"
    );

    let client = data_client(&config).await?;
    let state = AppState::new(client, config.clone());

    let purge_handle = spawn_purge_task(state.cache.clone(), config.cleanup_interval);
    if purge_handle.is_none() {
        info!("expired entry purge disabled, eviction is lazy only");
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(purge_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the configured backend. With `AUTH_EMAIL`/`AUTH_PASSWORD` set, the
/// PostgREST client sends the signed-in user's token instead of the anon key.
async fn data_client(config: &Config) -> anyhow::Result<Arc<dyn DataClient>> {
    match config.backend {
        Backend::Memory => {
            warn!("using in-memory tables, data is lost on restart");
            Ok(Arc::new(MemoryClient::new()))
        }
        Backend::Postgrest => {
            let (Some(url), Some(anon_key)) = (&config.supabase_url, &config.supabase_anon_key)
            else {
                bail!("DATA_BACKEND=postgrest needs SUPABASE_URL and SUPABASE_ANON_KEY");
            };
            let client = PostgrestClient::new(url, anon_key);

            let (Some(email), Some(password)) = (&config.auth_email, &config.auth_password) else {
                return Ok(Arc::new(client));
            };
            let auth = AuthContext::new(Arc::new(GoTrueClient::new(url, anon_key)));
            let session = auth
                .login(email, password)
                .await
                .context("service sign-in failed")?;
            info!(user = %session.user.id, "using service session for data access");
            Ok(Arc::new(client.with_access_token(&session.access_token)))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the purge task.
async fn shutdown_signal(purge_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = purge_handle {
        handle.abort();
        warn!("Purge task aborted");
    }
}
