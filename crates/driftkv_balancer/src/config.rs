//! Balancer configuration.

use std::time::Duration;

/// The fixed backend pool. Membership is compile-time; only health varies
/// at runtime.
pub const DEFAULT_BACKENDS: [&str; 3] = ["server1:8080", "server2:8080", "server3:8080"];

/// Configuration for the balancer.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    /// Port the balancer listens on. 0 means OS-assigned.
    pub port: u16,
    /// Bound on each backend request and on each health probe.
    pub timeout: Duration,
    /// Whether backends are reached over HTTPS.
    pub https: bool,
    /// Whether to add the `lb-from` response header.
    pub trace: bool,
    /// How often the health oracle probes the pool.
    pub probe_interval: Duration,
    /// Ordered backend pool.
    pub backends: Vec<String>,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            port: 8090,
            timeout: Duration::from_secs(3),
            https: false,
            trace: false,
            probe_interval: Duration::from_secs(10),
            backends: DEFAULT_BACKENDS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl BalancerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listen port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the backend request and probe timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether backends are reached over HTTPS.
    #[must_use]
    pub const fn https(mut self, value: bool) -> Self {
        self.https = value;
        self
    }

    /// Sets whether to add the `lb-from` response header.
    #[must_use]
    pub const fn trace(mut self, value: bool) -> Self {
        self.trace = value;
        self
    }

    /// Sets the health probe cadence.
    #[must_use]
    pub const fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Replaces the backend pool.
    #[must_use]
    pub fn backends(mut self, backends: Vec<String>) -> Self {
        self.backends = backends;
        self
    }

    /// The URL scheme used to reach backends.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}
