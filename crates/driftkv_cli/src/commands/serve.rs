//! `serve` command: run the load balancer.

use driftkv_balancer::{Balancer, BalancerConfig};
use std::time::Duration;

/// Runs the balancer until a termination signal arrives.
///
/// Builds its own tokio runtime; bind failures (port in use) propagate so
/// the process exits non-zero.
pub fn run(
    port: u16,
    timeout_sec: u64,
    https: bool,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BalancerConfig::new()
        .port(port)
        .timeout(Duration::from_secs(timeout_sec))
        .https(https)
        .trace(trace);

    tracing::info!(port, trace, "starting load balancer");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut balancer = Balancer::new(config);
        balancer.bind().await?;
        balancer
            .serve(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("termination signal received, shutting down");
            })
            .await?;
        Ok(())
    })
}
