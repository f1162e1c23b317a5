//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! event loop, connection set, signal gate produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauge)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`connection_id`, `peer_addr`, `bytes`) for machine parsing
//! - Log filter can be replaced on the reload signal
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
