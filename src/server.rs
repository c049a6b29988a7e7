//! The server instance
//!
//! [`McpServer`] is built once by the entry point from the loaded [`Config`]
//! and the populated [`Registry`], then consumed by `run`.

use std::{future::Future, io};

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::SSE_PATH;
use crate::registry::Registry;
use crate::{build_app, AppState, ServerInfo};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server terminated with transport error: {0}")]
    Serve(#[source] io::Error),
}

pub struct McpServer {
    bind_address: String,
    state: AppState,
}

impl McpServer {
    pub fn new(config: &Config, registry: Registry) -> Self {
        let state = AppState::new(
            ServerInfo::from(config),
            config.api_token.clone(),
            registry,
        );

        Self {
            bind_address: config.bind_address(),
            state,
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        bind_listener(&self.bind_address).await
    }

    /// Serves until the process is killed.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener. Open SSE streams are closed once
    /// `shutdown` resolves so that in-flight connections can drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;
        let sessions = self.state.sessions.clone();
        let shutdown = async move {
            shutdown.await;
            info!("shutdown requested, closing sse sessions");
            sessions.close_all();
        };

        info!(
            name = %self.state.server_info.name,
            bind_addr = %local_addr,
            sse_endpoint = SSE_PATH,
            tools = self.state.registry.tool_count(),
            resources = self.state.registry.resource_count(),
            "server starting"
        );

        axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;

        info!("server stopped");
        Ok(())
    }
}

/// Binds `addr`, resolving it first when the host is a name.
pub async fn bind_listener(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
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
}
