//! HTTP server

use super::api::build_router;
use super::state::{AppState, StreamSettings};
use anyhow::Result;
use chatline_core::{ChatService, Config, ShutdownCoordinator};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct ApiServer {
    state: Arc<AppState>,
    config: Config,
}

impl ApiServer {
    pub fn new(service: ChatService, shutdown: Arc<ShutdownCoordinator>, config: Config) -> Self {
        let stream = StreamSettings {
            keep_alive_interval: config.server.keep_alive_interval,
            buffer: config.server.stream_buffer,
        };
        let state = Arc::new(AppState::new(service, shutdown, stream));
        Self { state, config }
    }

    /// Serve until the shutdown coordinator fires, then give open
    /// connections `shutdown_timeout` to finish.
    pub async fn run(self) -> Result<()> {
        let router = build_router(self.state.clone());
        let shutdown = self.state.shutdown.clone();

        let listener = TcpListener::bind(self.config.server.bind_address).await?;
        info!("Chatline API listening on {}", listener.local_addr()?);

        let signal = {
            let shutdown = shutdown.clone();
            async move { shutdown.wait_for_shutdown().await }
        };
        let server = axum::serve(listener, router).with_graceful_shutdown(signal);
        let mut server = std::pin::pin!(server.into_future());

        tokio::select! {
            result = &mut server => result?,
            _ = async {
                shutdown.wait_for_shutdown().await;
                tokio::time::sleep(shutdown.timeout()).await;
            } => {
                warn!(
                    timeout = ?shutdown.timeout(),
                    "Connections still open after shutdown timeout, exiting"
                );
            }
        }

        shutdown.complete().await;
        Ok(())
    }
}
