//! # ECS-SD API Server
//!
//! HTTP front for Prometheus HTTP service discovery.
//!
//! ## Endpoints
//!
//! - `GET /prometheus-targets` - Run a discovery pass and return the target groups
//! - `GET /health` - Liveness probe
//!
//! ## Example
//!
//! ```rust,ignore
//! use ecs_sd_api::{shutdown_signal, ApiConfig, ApiServer};
//!
//! let server = ApiServer::new(discovery, ApiConfig::default());
//! server.run("0.0.0.0:10101".parse()?, shutdown_signal()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use ecs_sd_core::error::{EcsSdError, Result};
use ecs_sd_discovery::Discovery;

/// API server for ECS service discovery.
pub struct ApiServer {
    state: Arc<AppState>,
    config: ApiConfig,
}

impl ApiServer {
    /// Creates a new API server around a discovery pipeline.
    pub fn new(discovery: Discovery, config: ApiConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(discovery)),
            config,
        }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Binds `addr` and serves until `shutdown` resolves.
    pub async fn run<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await.map_err(EcsSdError::ServerStart)?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// After the signal, new connections are refused and in-flight requests
    /// get the configured grace period. Requests still running after that are
    /// abandoned and [`EcsSdError::ShutdownTimeout`] is returned.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(EcsSdError::ServerStart)?;
        let grace = self.config.shutdown_grace_period;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });
        let mut server = tokio::spawn(server.into_future());

        info!(%addr, "starting service discovery HTTP server");

        tokio::select! {
            result = &mut server => {
                match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(EcsSdError::ServerStart(err)),
                    Err(err) => Err(EcsSdError::ServerStart(std::io::Error::other(err))),
                }
            }
            _ = shutdown => {
                info!("service shutting down gracefully");
                let _ = stop_tx.send(());

                match tokio::time::timeout(grace, &mut server).await {
                    Ok(Ok(Ok(()))) => {
                        info!("service gracefully stopped");
                        Ok(())
                    }
                    Ok(Ok(Err(err))) => Err(EcsSdError::ShutdownFailed(err)),
                    Ok(Err(err)) => Err(EcsSdError::ShutdownFailed(std::io::Error::other(err))),
                    Err(_) => {
                        warn!(grace_secs = grace.as_secs(), "in-flight requests outlived the grace period");
                        server.abort();
                        Err(EcsSdError::ShutdownTimeout {
                            seconds: grace.as_secs(),
                        })
                    }
                }
            }
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for SIGINT");
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
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use ecs_sd_client::{ClusterInventory, Inventory, MemoryEcs, ServiceInventory};
    use ecs_sd_core::traits::EcsApi;
    use ecs_sd_core::types::{Cluster, HealthStatus, Tag, TargetGroup, Task};

    /// Inventory whose cluster lookup never completes.
    struct StalledEcs;

    #[async_trait]
    impl EcsApi for StalledEcs {
        async fn describe_clusters(&self, _names: &[String]) -> ecs_sd_core::Result<Vec<Cluster>> {
            std::future::pending().await
        }
        async fn list_services(&self, _cluster_arn: &str) -> ecs_sd_core::Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn list_tasks(&self, _cluster_arn: &str, _service: &str) -> ecs_sd_core::Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn describe_tasks(&self, _cluster_arn: &str, _arns: &[String]) -> ecs_sd_core::Result<Vec<Task>> {
            Ok(Vec::new())
        }
        async fn list_tags_for_resource(&self, _arn: &str) -> ecs_sd_core::Result<Vec<Tag>> {
            Ok(Vec::new())
        }
    }

    fn memory_discovery() -> Discovery {
        let ecs = Arc::new(MemoryEcs::new(Inventory {
            clusters: vec![ClusterInventory {
                name: "prod".into(),
                arn: "arn:aws:ecs:us-east-1:123:cluster/prod".into(),
                services: vec![ServiceInventory {
                    arn: "arn:aws:ecs:us-east-1:123:service/prod/api".into(),
                    tags: vec![],
                    tasks: vec![Task::new("arn:aws:ecs:us-east-1:123:task/prod/t1", HealthStatus::Healthy)
                        .with_private_ip("10.0.0.5")],
                }],
            }],
        }));
        Discovery::new(ecs, vec!["prod".into()]).unwrap()
    }

    async fn bind() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_serves_and_stops_gracefully() {
        let (listener, addr) = bind().await;
        let (tx, rx) = oneshot::channel::<()>();

        let server = ApiServer::new(memory_discovery(), ApiConfig::default());
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        let groups: Vec<TargetGroup> = reqwest::get(format!("http://{}/prometheus-targets", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(groups[0].targets, vec!["10.0.0.5:80".to_string()]);

        tx.send(()).unwrap();
        let result = handle.await.unwrap();
        assert!(result.is_ok(), "{:?}", result);
    }

    #[tokio::test]
    async fn test_shutdown_timeout_when_request_outlives_grace_period() {
        let (listener, addr) = bind().await;
        let (tx, rx) = oneshot::channel::<()>();

        let discovery = Discovery::new(Arc::new(StalledEcs), vec!["prod".into()]).unwrap();
        let config = ApiConfig {
            shutdown_grace_period: Duration::from_millis(200),
        };
        let server = ApiServer::new(discovery, config);
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        // This request never completes.
        let _request = tokio::spawn(reqwest::get(format!("http://{}/prometheus-targets", addr)));
        tokio::time::sleep(Duration::from_millis(100)).await;

        tx.send(()).unwrap();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(EcsSdError::ShutdownTimeout { .. })), "{:?}", result);
    }

    #[tokio::test]
    async fn test_bind_failure_is_start_error() {
        let (_listener, addr) = bind().await;

        let server = ApiServer::new(memory_discovery(), ApiConfig::default());
        let result = server.run(addr, std::future::pending()).await;
        assert!(matches!(result, Err(EcsSdError::ServerStart(_))));
    }
}
