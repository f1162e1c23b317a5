//! Server core.
//!
//! # Data Flow
//! ```text
//! SignalGate::wait_ready_or_signal
//!     → Interrupted: consume pending flag → reload configuration
//!     → Ready: accept pending connections (each evicts the previous one)
//!              → read from the held connection if it was readable
//!     → back to waiting with listener + held connection watched
//! ```
//!
//! # Design Decisions
//! - Single-threaded: the wait is the only suspension point
//! - Accepts are dispatched before reads, so only the newest connection is read
//! - Received bytes are counted and logged, never stored or echoed

pub mod event_loop;

pub use event_loop::{Dispatch, EventLoop, LoopStats, Turn};
