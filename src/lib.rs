//! Single-connection TCP byte counter with signal-driven reload.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

pub use config::schema::ServerConfig;
pub use error::ServerError;
pub use server::EventLoop;
