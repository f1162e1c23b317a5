//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address with an explicit backlog
//! - Report pending connections to the readiness wait
//!
//! # Design Decisions
//! - Bind and listen failures are distinct startup errors
//! - The listener lives until process shutdown; nothing else closes it

use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ListenerConfig;
use crate::error::ServerError;

/// The bound, listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured address and start listening.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ServerError> {
        let bind_err = |source| ServerError::Bind {
            addr: config.bind_address.clone(),
            source,
        };

        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| bind_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;

        let inner = socket
            .listen(config.backlog)
            .map_err(|source| ServerError::Listen { addr, source })?;
        let local_addr = inner
            .local_addr()
            .map_err(|source| ServerError::Listen { addr, source })?;

        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            "Listening for connections"
        );

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept one pending connection if there is one, otherwise register
    /// the waker for the next one.
    pub fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(TcpStream, SocketAddr)>> {
        self.inner.poll_accept(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bind_address: &str) -> ListenerConfig {
        ListenerConfig {
            bind_address: bind_address.into(),
            backlog: 16,
        }
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = Listener::bind(&config("127.0.0.1:0")).unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn bad_address_is_a_bind_error() {
        let err = Listener::bind(&config("nowhere")).unwrap_err();
        assert!(matches!(err, ServerError::Bind { ref addr, .. } if addr == "nowhere"));
    }

    #[tokio::test]
    async fn port_in_use_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let err = Listener::bind(&config(&addr)).unwrap_err();
        assert!(matches!(
            err,
            ServerError::Bind { .. } | ServerError::Listen { .. }
        ));
    }
}
