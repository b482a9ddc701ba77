//! Health oracle: periodic liveness probing of the backend pool.
//!
//! Each cycle probes every pool member and replaces its status atomically.
//! A backend is healthy iff its most recent probe returned HTTP 200;
//! before the first probe it is unknown and treated as unhealthy. There
//! is no hysteresis: transitions happen at probe boundaries only.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A single liveness check against one backend.
///
/// Abstracted so tests can substitute deterministic outcomes for real
/// HTTP round-trips.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probes `backend`, returning whether it is willing to take traffic.
    async fn probe(&self, backend: &str) -> bool;
}

/// Production probe: `GET <scheme>://<backend>/health`, healthy iff the
/// response is 200 within the timeout. Any other status, transport error,
/// or timeout is unhealthy.
pub struct HttpProbe {
    client: reqwest::Client,
    scheme: &'static str,
    timeout: Duration,
}

impl HttpProbe {
    /// Creates a probe using the given URL scheme and per-request timeout.
    #[must_use]
    pub fn new(scheme: &'static str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            scheme,
            timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, backend: &str) -> bool {
        let url = format!("{}://{}/health", self.scheme, backend);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}

/// Tracks which pool members are currently passing their probe.
///
/// Readers see a consistent snapshot per lookup; updates land per backend
/// as each probe completes.
pub struct HealthOracle {
    backends: Vec<String>,
    status: RwLock<HashMap<String, bool>>,
}

impl HealthOracle {
    /// Creates an oracle for the given pool. All members start unknown,
    /// which counts as unhealthy until the first probe.
    #[must_use]
    pub fn new(backends: Vec<String>) -> Self {
        Self {
            backends,
            status: RwLock::new(HashMap::new()),
        }
    }

    /// The full pool, in declared order.
    #[must_use]
    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    /// The currently healthy subset, preserving pool order.
    #[must_use]
    pub fn healthy_backends(&self) -> Vec<String> {
        let status = self.status.read();
        self.backends
            .iter()
            .filter(|b| status.get(*b).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Whether `backend` passed its most recent probe.
    #[must_use]
    pub fn is_healthy(&self, backend: &str) -> bool {
        self.status.read().get(backend).copied().unwrap_or(false)
    }

    /// Records a probe outcome, replacing the previous status.
    pub fn set_status(&self, backend: &str, healthy: bool) {
        self.status.write().insert(backend.to_string(), healthy);
    }

    /// Pool members with their current status, in declared order.
    #[must_use]
    pub fn statuses(&self) -> Vec<(String, bool)> {
        let status = self.status.read();
        self.backends
            .iter()
            .map(|b| (b.clone(), status.get(b).copied().unwrap_or(false)))
            .collect()
    }

    /// Runs one probe cycle over the whole pool.
    pub async fn check_all(&self, probe: &dyn HealthProbe) {
        for backend in &self.backends {
            let healthy = probe.probe(backend).await;
            if self.is_healthy(backend) != healthy {
                tracing::info!(backend = %backend, healthy, "backend health changed");
            }
            self.set_status(backend, healthy);
        }
    }

    /// Starts the background probe loop.
    ///
    /// Runs one cycle immediately, then one per `interval` for as long as
    /// the task lives. Missed ticks are skipped rather than bunched.
    pub fn spawn(
        self: &Arc<Self>,
        probe: Arc<dyn HealthProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let oracle = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                oracle.check_all(probe.as_ref()).await;
            }
        })
    }
}

impl std::fmt::Debug for HealthOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthOracle")
            .field("backends", &self.backends)
            .field("healthy", &self.healthy_backends())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Probe with a fixed per-backend outcome.
    struct FixedProbe {
        healthy: Vec<&'static str>,
    }

    #[async_trait]
    impl HealthProbe for FixedProbe {
        async fn probe(&self, backend: &str) -> bool {
            self.healthy.contains(&backend)
        }
    }

    fn pool() -> Vec<String> {
        vec![
            "server1:8080".to_string(),
            "server2:8080".to_string(),
            "server3:8080".to_string(),
        ]
    }

    #[test]
    fn unknown_backends_are_unhealthy() {
        let oracle = HealthOracle::new(pool());
        assert!(oracle.healthy_backends().is_empty());
        assert!(!oracle.is_healthy("server1:8080"));
    }

    #[tokio::test]
    async fn one_cycle_marks_responders_healthy() {
        let oracle = HealthOracle::new(pool());
        let probe = FixedProbe {
            healthy: vec!["server1:8080"],
        };

        oracle.check_all(&probe).await;

        assert_eq!(oracle.healthy_backends(), vec!["server1:8080"]);
        assert!(oracle.is_healthy("server1:8080"));
        assert!(!oracle.is_healthy("server2:8080"));
        assert!(!oracle.is_healthy("server3:8080"));
    }

    #[tokio::test]
    async fn recovery_flips_status_back() {
        let oracle = HealthOracle::new(pool());

        oracle
            .check_all(&FixedProbe {
                healthy: vec!["server1:8080"],
            })
            .await;
        assert_eq!(oracle.healthy_backends().len(), 1);

        oracle
            .check_all(&FixedProbe {
                healthy: vec!["server1:8080", "server2:8080", "server3:8080"],
            })
            .await;
        assert_eq!(oracle.healthy_backends(), pool());
    }

    #[tokio::test]
    async fn failure_excludes_within_one_cycle() {
        let oracle = HealthOracle::new(pool());

        oracle
            .check_all(&FixedProbe {
                healthy: vec!["server1:8080", "server2:8080", "server3:8080"],
            })
            .await;

        // server2 stops responding; one cycle is enough to exclude it.
        oracle
            .check_all(&FixedProbe {
                healthy: vec!["server1:8080", "server3:8080"],
            })
            .await;

        assert_eq!(
            oracle.healthy_backends(),
            vec!["server1:8080", "server3:8080"]
        );
    }

    #[tokio::test]
    async fn healthy_subset_preserves_pool_order() {
        let oracle = HealthOracle::new(pool());

        oracle
            .check_all(&FixedProbe {
                healthy: vec!["server3:8080", "server1:8080"],
            })
            .await;

        assert_eq!(
            oracle.healthy_backends(),
            vec!["server1:8080", "server3:8080"]
        );
    }

    #[test]
    fn statuses_cover_whole_pool() {
        let oracle = HealthOracle::new(pool());
        oracle.set_status("server2:8080", true);

        let statuses = oracle.statuses();
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0], ("server1:8080".to_string(), false));
        assert_eq!(statuses[1], ("server2:8080".to_string(), true));
        assert_eq!(statuses[2], ("server3:8080".to_string(), false));
    }
}
