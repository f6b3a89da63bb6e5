// # beacon-collector - Collector Daemon
//
// The collector is a thin integration layer: it reads configuration from
// environment variables, initializes the runtime, picks a store backend,
// and serves the HTTP surface. All upsert and validation logic lives in
// beacon-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `BEACON_BIND_ADDR`: Socket address to listen on (default 0.0.0.0:5000)
// - `BEACON_STORE_TYPE`: Record storage backend (file, memory; default file)
// - `BEACON_STORE_PATH`: Path to the store file (required for file store)
// - `BEACON_LOG_LEVEL`: Log level (trace, debug, info, warn, error)
//
// ## Example
//
// ```bash
// export BEACON_BIND_ADDR=0.0.0.0:5000
// export BEACON_STORE_TYPE=file
// export BEACON_STORE_PATH=/var/lib/beacon/clients.json
//
// beacon-collector
// ```

mod server;

use anyhow::Result;
use beacon_core::store::{FileClientStore, MemoryClientStore};
use beacon_core::traits::ClientStore;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum CollectorExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<CollectorExitCode> for ExitCode {
    fn from(code: CollectorExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    bind_addr: String,
    store_type: String,
    store_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self {
            bind_addr: env::var("BEACON_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            store_type: env::var("BEACON_STORE_TYPE").unwrap_or_else(|_| "file".to_string()),
            store_path: env::var("BEACON_STORE_PATH").ok(),
            log_level: env::var("BEACON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!(
                "BEACON_BIND_ADDR '{}' is not a valid socket address. \
                Example: export BEACON_BIND_ADDR=0.0.0.0:5000",
                self.bind_addr
            );
        }

        match self.store_type.as_str() {
            "file" => {
                match &self.store_path {
                    Some(path) if !path.is_empty() => {}
                    _ => anyhow::bail!(
                        "BEACON_STORE_PATH is required when BEACON_STORE_TYPE=file. \
                        Set it via: export BEACON_STORE_PATH=/var/lib/beacon/clients.json"
                    ),
                }
            }
            "memory" => {}
            other => anyhow::bail!(
                "BEACON_STORE_TYPE '{}' is not supported. Supported types: file, memory",
                other
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "BEACON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return CollectorExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CollectorExitCode::ConfigError.into();
    }

    info!("Starting beacon collector");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CollectorExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            CollectorExitCode::RuntimeError
        } else {
            CollectorExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let store: server::AppState = match config.store_type.as_str() {
        "file" => {
            let path = config
                .store_path
                .as_deref()
                .expect("validated: file store has a path");
            info!("Using file store at {}", path);
            Arc::new(FileClientStore::new(path).await?)
        }
        _ => {
            info!("Using in-memory store (records will not survive restart)");
            Arc::new(MemoryClientStore::new())
        }
    };

    let app = server::router(store.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Force durability of anything still buffered before exiting
    store.flush().await?;
    info!("Store flushed, collector stopped");

    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            error!("Failed to setup SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sig) => sig,
        Err(e) => {
            error!("Failed to setup SIGINT handler: {}", e);
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for CTRL-C: {}", e);
    }
}
