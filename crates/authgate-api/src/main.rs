//! authgate API server

use anyhow::Context;
use authgate_api::{create_router, state::AppState};
use authgate_core::{config::AppConfig, LoggingConfig, StoreBackend};
use authgate_store::{MemoryStore, SurrealStore};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    if config.uses_development_secrets() {
        tracing::warn!("Using development token secrets; set ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET");
    }

    let state = Arc::new(create_state(config).await?);
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("authgate API listening on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("authgate API stopped");
    Ok(())
}

/// Defaults, then the TOML file named by `AUTHGATE_CONFIG`, then environment
fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("AUTHGATE_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "authgate_api={level},authgate_store={level},tower_http={level}",
            level = config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_format {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn create_state(config: AppConfig) -> anyhow::Result<AppState> {
    match config.database.backend {
        StoreBackend::SurrealDb => {
            let store = SurrealStore::connect(&config.database)
                .await
                .context("Failed to connect to SurrealDB")?;
            store
                .init_schema()
                .await
                .context("Failed to initialize SurrealDB schema")?;
            tracing::info!(url = %config.database.surrealdb_url, "Connected to SurrealDB");

            let store = Arc::new(store);
            Ok(AppState::new(config, store.clone(), store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; users and tokens are lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok(AppState::new(config, store.clone(), store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
