//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding fallback
//! - Wire up middleware (tracing, request ID, timeout, body limit, gate)
//! - Spawn the rate pruner and the admin listener
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GateConfig;
use crate::http::middleware::{gate_middleware, RequestGate};
use crate::http::proxy::{proxy_handler, ProxyError, UpstreamClient};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::shutdown::recv_shutdown;
use crate::security::rate_limit::RatePruner;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
    pub gate: Arc<RequestGate>,
}

/// HTTP server for the request gate.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    gate: Arc<RequestGate>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GateConfig) -> Result<Self, ProxyError> {
        let gate = Arc::new(RequestGate::from_settings(&config.gate));
        Self::with_gate(config, gate)
    }

    /// Create a server around an existing gate (e.g. one with a manual clock).
    pub fn with_gate(config: GateConfig, gate: Arc<RequestGate>) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(&config.upstream.address)?;
        let state = AppState {
            upstream,
            gate: gate.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            gate,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .layer(middleware::from_fn_with_state(state.gate.clone(), gate_middleware))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            auth = self.gate.auth_mode().label(),
            "HTTP server starting"
        );

        let pruner = RatePruner::new(
            self.gate.limiter().clone(),
            Duration::from_secs(self.config.gate.prune_interval_secs),
        );
        tokio::spawn(pruner.run(shutdown.resubscribe()));

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router = setup_admin_router(AdminState::new(
                self.gate.clone(),
                &self.config.admin.api_key,
            ));
            let admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin server starting");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(recv_shutdown(admin_shutdown))
                    .await
                {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
