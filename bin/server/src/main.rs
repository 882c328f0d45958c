use cartpal_server::{
    api,
    auth::{AuthConfig, AuthContext, DirectorySessionStore, HttpIdentityVerifier},
    config::ServerConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let auth_config = AuthConfig::builder(config.auth)
        .build()
        .unwrap_or_else(|report| panic!("invalid auth configuration: {report}"));

    let verifier = HttpIdentityVerifier::new(&config.identity)
        .unwrap_or_else(|report| panic!("invalid identity provider configuration: {report}"));

    let sessions = DirectorySessionStore::open(auth_config.session_storage_path())
        .await
        .unwrap_or_else(|report| panic!("failed to open session storage: {report}"));

    // Cleanup expired sessions on startup
    match sessions.delete_expired().await {
        Ok(count) if count > 0 => {
            tracing::info!(
                deleted_sessions = count,
                "Cleaned up expired sessions on startup"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cleanup expired sessions on startup");
        }
    }

    // Spawn periodic session cleanup task
    let cleanup_store = sessions.clone();
    let cleanup_interval = auth_config.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            match cleanup_store.delete_expired().await {
                Ok(count) if count > 0 => {
                    tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                }
            }
        }
    });

    let auth = AuthContext::new(Arc::new(verifier), auth_config, sessions);
    let app = api::router(&auth);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
