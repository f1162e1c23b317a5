//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bound socket, accept on readiness)
//!     → connection.rs (singleton set: evict previous, count bytes, close)
//!
//! Connection lifecycle:
//!     Accepted → Held → Closed (evicted | peer close | read error)
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ClientConnection, ClosedConnection, ConnectionId, ConnectionSet, ReadOutcome};
pub use listener::Listener;
