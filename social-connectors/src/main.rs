use anyhow::{Context, Result};
use social_connectors::{create_oauth_router, ConnectorRegistry, InMemoryAccountSink, OAuthAppState};
use socialink::config::AppConfig;
use socialink::credentials::TokenCipher;
use socialink::oauth::{run_state_cleanup, AuthorizationFlow, OAuthStateStore};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "social_connectors=info,socialink=info".into()),
        )
        .init();

    info!("Social connectors starting...");

    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!(
        environment = ?config.environment,
        port = config.server.port,
        frontend_url = %config.oauth.frontend_url,
        http_timeout_seconds = config.http.timeout_seconds,
        "Configuration loaded"
    );

    // Key and algorithm are validated here, before any route is served
    let cipher = Arc::new(
        TokenCipher::from_config(&config.encryption).context("Failed to initialize token cipher")?,
    );

    let store = Arc::new(OAuthStateStore::with_ttl_seconds(config.oauth.state_ttl_seconds));
    let cleanup_handle = tokio::spawn(run_state_cleanup(
        Arc::clone(&store),
        config.oauth.state_cleanup_interval_seconds,
    ));

    let registry = ConnectorRegistry::from_config(&config, Arc::clone(&cipher))
        .context("Failed to build platform connectors")?;
    if registry.is_empty() {
        warn!("No platform credentials configured, every start request will return 404");
    }

    let state = OAuthAppState {
        registry: Arc::new(registry),
        flow: AuthorizationFlow::new(Arc::clone(&store)),
        sink: Arc::new(InMemoryAccountSink::new()),
        frontend_url: config.oauth.frontend_url.clone(),
    };
    let router = create_oauth_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind API port")?;
    info!(port = config.server.port, "OAuth API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "OAuth API server error");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    cleanup_handle.abort();
    info!("Social connectors stopped");

    Ok(())
}
