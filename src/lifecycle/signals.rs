//! OS signal handling.
//!
//! # Responsibilities
//! - Register the reload signal (SIGHUP)
//! - Wait for socket readiness or the signal, whichever comes first
//! - Expose the pending-signal flag to the event loop only
//!
//! # Design Decisions
//! - Uses Tokio's signal handling: the installed handler is minimal
//!   (`SA_RESTART`, writes one byte to a self-pipe) and the pipe is polled
//!   alongside the sockets, so a signal raised between two waits is still
//!   seen by the next one
//! - Once registered, SIGHUP never takes its default action (terminate)
//! - A pending signal wins over socket readiness, like `EINTR` would
//! - Draining the self-pipe is what consumes raises; every raise since the
//!   last drain collapses into the single `pending` flag, which the wait
//!   sets before it reports `Interrupted`

use std::future::poll_fn;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

use tokio::net::TcpStream;
use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::error::ServerError;
use crate::net::{ClientConnection, ConnectionId, Listener};

/// What ended a readiness wait.
#[derive(Debug)]
pub enum Wakeup {
    /// The reload signal arrived. No descriptor was touched.
    Interrupted,
    /// At least one watched descriptor is ready.
    Ready(Readiness),
}

/// Descriptors found ready by one wait.
#[derive(Debug, Default)]
pub struct Readiness {
    /// Connections taken off the listener, in arrival order. An `Err`
    /// ends the batch.
    pub incoming: Vec<std::io::Result<(TcpStream, SocketAddr)>>,
    /// The held connection, if it was readable.
    pub readable: Option<ConnectionId>,
}

impl Readiness {
    fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.readable.is_none()
    }
}

/// Owner of the reload signal registration and its pending flag.
#[derive(Debug)]
pub struct SignalGate {
    signal: Signal,
    pending: AtomicBool,
}

impl SignalGate {
    /// Register the SIGHUP handler. From here on every raise is recorded,
    /// whether or not a wait is in progress.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn install() -> Result<Self, ServerError> {
        let signal = signal(SignalKind::hangup()).map_err(ServerError::SignalInstall)?;
        tracing::debug!("Reload signal handler installed");
        Ok(Self {
            signal,
            pending: AtomicBool::new(false),
        })
    }

    /// Block until the listener or `client` is ready, or the signal fires.
    ///
    /// Returns `Wakeup::Interrupted` for the signal (not an error). Fails only
    /// when the runtime's signal stream has ended.
    pub async fn wait_ready_or_signal(
        &mut self,
        listener: &Listener,
        client: Option<&ClientConnection>,
    ) -> Result<Wakeup, ServerError> {
        let Self { signal, pending } = self;

        poll_fn(|cx| {
            match signal.poll_recv(cx) {
                Poll::Ready(Some(())) => {
                    pending.store(true, Ordering::Release);
                    return Poll::Ready(Ok(Wakeup::Interrupted));
                }
                Poll::Ready(None) => return Poll::Ready(Err(ServerError::SignalStreamClosed)),
                Poll::Pending => {}
            }

            let mut readiness = Readiness::default();
            while let Poll::Ready(result) = listener.poll_accept(cx) {
                let failed = result.is_err();
                readiness.incoming.push(result);
                if failed {
                    break;
                }
            }

            // An error on the socket also counts as readable; the read reports it.
            readiness.readable = client
                .filter(|conn| conn.poll_read_ready(cx).is_ready())
                .map(ClientConnection::id);

            if readiness.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(Ok(Wakeup::Ready(readiness)))
            }
        })
        .await
    }

    /// Return and clear whether the signal fired since the last call.
    ///
    /// After `Wakeup::Interrupted` this is always `true` for the first call.
    pub fn consume_pending_signal(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
