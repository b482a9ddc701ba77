//! Deterministic request-to-backend placement.

use crate::error::{BalancerError, BalancerResult};
use crate::hash::fnv1a;
use crate::health::HealthOracle;
use std::sync::Arc;

/// Maps request paths onto the healthy subset of the pool.
///
/// For a fixed healthy set the mapping is a pure function of the path:
/// `H[fnv1a(path) % |H|]`. When the healthy set changes the mapping
/// reshuffles.
#[derive(Debug)]
pub struct Dispatcher {
    oracle: Arc<HealthOracle>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given health oracle.
    #[must_use]
    pub fn new(oracle: Arc<HealthOracle>) -> Self {
        Self { oracle }
    }

    /// Returns the backend the request for `path` must be forwarded to.
    ///
    /// # Errors
    ///
    /// `NoHealthyBackends` iff no backend is currently healthy.
    pub fn route(&self, path: &str) -> BalancerResult<String> {
        let healthy = self.oracle.healthy_backends();

        if healthy.is_empty() {
            return Err(BalancerError::NoHealthyBackends);
        }

        let index = fnv1a(path.as_bytes()) as usize % healthy.len();
        Ok(healthy[index].clone())
    }
}
