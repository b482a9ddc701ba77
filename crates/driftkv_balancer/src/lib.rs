//! # DriftKV Balancer
//!
//! Consistent-hashing HTTP load balancer with live health awareness.
//!
//! Requests are mapped to backends deterministically: the 32-bit FNV-1a
//! hash of the request path, modulo the number of currently healthy
//! backends, picks the target. A background health oracle probes every
//! pool member's `/health` endpoint on a fixed cadence; the dispatcher
//! only ever routes to backends that passed their latest probe.
//!
//! ```text
//!            ┌────────────┐   GET /health every 10s   ┌──────────┐
//!            │HealthOracle│ ─────────────────────────► │ backends │
//!            └─────┬──────┘                            └────▲─────┘
//!   request        │ healthy set                            │ forward
//! ───────────► Dispatcher ── fnv1a(path) % |H| ── Forwarder ┘
//! ```
//!
//! Stickiness is intentionally weak: when the healthy set changes the
//! mapping reshuffles, which is fine because backends hold no session
//! state.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatcher;
mod error;
mod forward;
mod hash;
mod health;
mod server;

pub use config::{BalancerConfig, DEFAULT_BACKENDS};
pub use dispatcher::Dispatcher;
pub use error::{BalancerError, BalancerResult};
pub use hash::fnv1a;
pub use health::{HealthOracle, HealthProbe, HttpProbe};
pub use server::Balancer;
