//! granter server binary.
//!
//! Configures the OAuth 2.0 provider from the environment, seeds the in-memory
//! store with a demo client and resource owner, and starts the HTTP server with
//! graceful shutdown.

use anyhow::Result;
use granter::{
    config::Config,
    http::{AppState, build_router},
    oauth::{
        ClientType, GrantType, HmacSha256Strategy, OAuthClient, ResponseType, compose_provider,
    },
    storage::{MemoryOAuthStorage, StorageBackend},
};
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

const DEMO_CLIENT_ID: &str = "granter-demo";
const DEMO_CLIENT_SECRET: &str = "granter-demo-secret";
const DEMO_USERNAME: &str = "demo";
const DEMO_PASSWORD: &str = "demo-password";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "granter=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = granter::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting granter");

    let config = Config::new()?;

    let storage = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryOAuthStorage::new()),
    };
    seed_demo_data(&storage, &config)?;

    let strategy = Arc::new(HmacSha256Strategy::new(
        config.token_hmac_secret.as_ref().to_vec(),
    )?);
    let provider = compose_provider(&config.compose_config(), storage.clone(), strategy);

    let app_context = AppState {
        provider: Arc::new(provider),
        resource_owners: storage,
    };

    // Build the router
    let app = build_router(app_context);

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::error!("failed to install signal handler: {}", err);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    // Start HTTP server
    {
        let http_port = *config.http_port.as_ref();
        let inner_token = token.clone();
        tracker.spawn(async move {
            let bind_address = format!("0.0.0.0:{http_port}");
            tracing::info!("Starting server on {bind_address}");
            let listener = match TcpListener::bind(&bind_address).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind {bind_address}: {}", err);
                    inner_token.cancel();
                    return;
                }
            };

            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        () = shutdown_token.cancelled() => { }
                    }
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}

fn seed_demo_data(storage: &MemoryOAuthStorage, config: &Config) -> Result<()> {
    let redirect_uri = format!("{}/callback", config.external_base.trim_end_matches('/'));
    storage.store_client(OAuthClient {
        client_id: DEMO_CLIENT_ID.to_string(),
        client_secret: Some(DEMO_CLIENT_SECRET.to_string()),
        client_name: Some("granter demo client".to_string()),
        redirect_uris: vec![redirect_uri.clone()],
        grant_types: vec![
            GrantType::AuthorizationCode,
            GrantType::Implicit,
            GrantType::Password,
            GrantType::ClientCredentials,
            GrantType::RefreshToken,
        ],
        response_types: vec![ResponseType::Code, ResponseType::Token],
        scope: Some("read write offline".to_string()),
        client_type: ClientType::Confidential,
        created_at: chrono::Utc::now(),
    })?;
    storage.store_user(DEMO_USERNAME, DEMO_PASSWORD)?;

    tracing::info!(
        client_id = DEMO_CLIENT_ID,
        username = DEMO_USERNAME,
        %redirect_uri,
        "seeded demo client and resource owner"
    );
    Ok(())
}
