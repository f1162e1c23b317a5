//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Install signal gate → Bind listener → Build event loop
//!
//! Signals (signals.rs):
//!     SIGHUP → wake the event loop → pending flag consumed
//!
//! Reload (reload.rs):
//!     Pending flag consumed → re-read config → swap log filter, resize buffer
//! ```
//!
//! # Design Decisions
//! - Ordered startup: signal handling first, then the listener
//! - Termination is external (SIGTERM/SIGINT default action); there is no
//!   in-band shutdown

pub mod reload;
pub mod signals;
pub mod startup;

pub use signals::SignalGate;
pub use startup::{start, ConfigSource};
