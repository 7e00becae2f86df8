//! Process entry: tracing, configuration, database, HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::ai::GenAiSource;
use crate::config::{AppState, ServerConfig};
use crate::core::db::Database;
use crate::core::router::router;

pub async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    init_tracing(&config.log_level);

    info!("=== First Aid Companion Server ===");
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let source = Arc::new(GenAiSource::new(config.ai.clone()));

    if !config.enforce_chat_ownership {
        warn!(
            "Chat ownership is not enforced: any signed-in user can read or write a chat by id. \
             Set FIRSTAID_ENFORCE_CHAT_OWNERSHIP=true to restrict chats to their owner."
        );
    }

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("invalid FIRSTAID_BIND {}", config.bind_address))?;

    let app_state = AppState::new(config, db.clone(), source);
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("server stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `FIRSTAID_LOG`, falling back to `info` when
/// that is not a valid filter.
fn init_tracing(log_level: &str) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: FIRSTAID_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    log_level, e
                );
                EnvFilter::new("info")
            }
        },
    };

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        // Already set, ignore
    }
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
