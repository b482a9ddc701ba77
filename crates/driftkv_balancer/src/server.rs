//! Balancer server lifecycle.
//!
//! Deferred startup: `new()` allocates shared state, `bind()` claims the
//! TCP port, and `serve()` accepts connections until the shutdown future
//! resolves. The split lets callers learn the real port (port 0 is
//! OS-assigned) and wire shutdown before traffic starts.

use crate::config::BalancerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::BalancerResult;
use crate::forward::{forward_handler, AppState};
use crate::health::{HealthOracle, HttpProbe};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The balancer: health oracle, dispatcher, and HTTP front end.
pub struct Balancer {
    config: Arc<BalancerConfig>,
    oracle: Arc<HealthOracle>,
    dispatcher: Arc<Dispatcher>,
    listener: Option<TcpListener>,
}

impl Balancer {
    /// Creates a balancer without binding any port.
    #[must_use]
    pub fn new(config: BalancerConfig) -> Self {
        let oracle = Arc::new(HealthOracle::new(config.backends.clone()));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&oracle)));

        Self {
            config: Arc::new(config),
            oracle,
            dispatcher,
            listener: None,
        }
    }

    /// Shared handle to the health oracle.
    #[must_use]
    pub fn oracle(&self) -> Arc<HealthOracle> {
        Arc::clone(&self.oracle)
    }

    /// Shared handle to the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Binds the TCP listener to `0.0.0.0:<port>`.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (port in use).
    pub async fn bind(&mut self) -> BalancerResult<u16> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, trace = self.config.trace, "balancer listening");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until the shutdown future resolves.
    ///
    /// Starts the health oracle's probe loop, then accepts connections:
    /// `GET /health` answers with the balancer's own backend-status JSON,
    /// everything else is forwarded to its routed backend.
    ///
    /// # Errors
    ///
    /// Returns an error on fatal listener I/O failure.
    ///
    /// # Panics
    ///
    /// Panics if `bind()` was not called first.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> BalancerResult<()> {
        let listener = self.listener.expect("bind() must be called before serve()");

        let probe = Arc::new(HttpProbe::new(self.config.scheme(), self.config.timeout));
        let probe_loop = self.oracle.spawn(probe, self.config.probe_interval);

        let state = AppState {
            dispatcher: self.dispatcher,
            oracle: self.oracle,
            client: reqwest::Client::new(),
            config: self.config,
        };

        let router = Router::new()
            .route("/health", get(status_handler))
            .fallback(forward_handler)
            .with_state(state);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        probe_loop.abort();
        Ok(())
    }
}

/// The balancer's own health endpoint: pool status as JSON.
async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let statuses = state.oracle.statuses();
    let healthy_count = statuses.iter().filter(|(_, healthy)| *healthy).count();

    Json(json!({
        "healthy_count": healthy_count,
        "backends": statuses
            .iter()
            .map(|(address, healthy)| json!({ "address": address, "healthy": healthy }))
            .collect::<Vec<_>>(),
    }))
}
