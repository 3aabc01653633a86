//! todo-api バイナリのエントリポイント

use anyhow::Context;
use std::sync::Arc;
use todo_api::{app_with_state, AppState};
use todo_infrastructure::{InMemoryTodoStore, SqliteTodoStore, TodoStore};
use todo_shared::{init_tracing, Config, StoreKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format).map_err(|e| anyhow::anyhow!(e))?;

    let store: Arc<dyn TodoStore> = match &config.store {
        StoreKind::Sqlite { path } => Arc::new(
            SqliteTodoStore::open(path)
                .with_context(|| format!("failed to open database {}", path.display()))?,
        ),
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            Arc::new(InMemoryTodoStore::new())
        }
    };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server starting");

    let router = app_with_state(AppState::with_store(store));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
