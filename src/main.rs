use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gcs_upload_storage::{
    api,
    config::{EnvDefaults, ServerConfig, StorageBackend, StorageOptions},
    object_store as obj,
    resolver::GuessContentType,
    AppState, GcsStorage,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "gcs-upload-storage starting");

    // Load configuration once; nothing below reads the environment again
    let config = ServerConfig::load()?;
    let env = EnvDefaults::load();

    let mut options = StorageOptions::default();
    if let Some(acl) = config.acl {
        options = options.acl(acl);
    }
    if config.guess_content_type {
        options = options.content_type(GuessContentType);
    }

    // Initialize storage engine
    let engine = match config.backend {
        StorageBackend::Gcs => GcsStorage::new(options, &env)?,
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.local_storage_path)?;
            info!(
                "Using local storage backend at: {}",
                config.local_storage_path
            );
            GcsStorage::with_store(options, &env, Arc::new(store))?
        }
    };
    info!("Storing uploads in bucket: {}", engine.bucket());

    let state = Arc::new(AppState {
        config: config.clone(),
        bucket: engine.bucket().to_string(),
        engine: Arc::new(engine),
    });

    // Build and start the HTTP server
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on: {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
