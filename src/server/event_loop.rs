//! The single-threaded readiness loop.
//!
//! # State Machine
//! ```text
//! WAITING ──(signal)────▶ consume flag, reload ──▶ WAITING
//!    │
//!    └──(readiness)──▶ DISPATCH: accept* then read ──▶ WAITING
//! ```
//!
//! The only way out is a fatal wait error. Signals, accept failures and
//! connection churn all lead back to `WAITING`.

use crate::error::ServerError;
use crate::lifecycle::reload::ConfigReloader;
use crate::lifecycle::signals::{Readiness, SignalGate, Wakeup};
use crate::net::{ClientConnection, ConnectionId, ConnectionSet, Listener, ReadOutcome};
use crate::observability::metrics;

const ACCEPT_ERROR_LOG_EVERY: u64 = 10_000;

/// Running totals since the loop was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub accepted: u64,
    pub evicted: u64,
    pub closed: u64,
    pub bytes_read: u64,
    pub accept_errors: u64,
    pub signals_processed: u64,
}

/// What a single loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Woken by the reload signal. The flag was consumed and the
    /// configuration reloaded; no connection was touched.
    Signal,
    Dispatched(Dispatch),
}

/// Effects of dispatching one readiness result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Accepted connections, oldest first. Only the last one is still held.
    pub accepted: Vec<ConnectionId>,
    /// Connections closed because a newer one was accepted.
    pub evicted: Vec<ConnectionId>,
    pub accept_errors: usize,
    /// The read performed on the held connection, if it was readable.
    pub read: Option<(ConnectionId, ReadOutcome)>,
}

/// Owns the listener, the signal gate and the connection set.
#[derive(Debug)]
pub struct EventLoop {
    listener: Listener,
    gate: SignalGate,
    connections: ConnectionSet,
    buffer: Vec<u8>,
    reloader: Option<ConfigReloader>,
    stats: LoopStats,
    accept_error_streak: u64,
}

impl EventLoop {
    pub fn new(listener: Listener, gate: SignalGate, read_buffer_size: usize) -> Self {
        Self {
            listener,
            gate,
            connections: ConnectionSet::new(),
            buffer: vec![0; read_buffer_size.max(1)],
            reloader: None,
            stats: LoopStats::default(),
            accept_error_streak: 0,
        }
    }

    /// Re-read configuration every time the signal is processed.
    pub fn with_reloader(mut self, reloader: ConfigReloader) -> Self {
        self.reloader = Some(reloader);
        self
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.listener.local_addr()
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Accept failures since the last successful accept.
    pub fn accept_error_streak(&self) -> u64 {
        self.accept_error_streak
    }

    pub fn read_buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Run until the wait fails. Never returns `Ok` on its own.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!(address = %self.local_addr(), "Server started");
        loop {
            self.turn().await?;
        }
    }

    /// Wait once, then dispatch what woke us.
    pub async fn turn(&mut self) -> Result<Turn, ServerError> {
        let wakeup = self
            .gate
            .wait_ready_or_signal(&self.listener, self.connections.current())
            .await?;

        match wakeup {
            Wakeup::Interrupted => {
                self.process_signal();
                Ok(Turn::Signal)
            }
            Wakeup::Ready(readiness) => Ok(Turn::Dispatched(self.dispatch(readiness))),
        }
    }

    fn process_signal(&mut self) {
        tracing::info!("Reload signal received");
        // The wait sets the flag whenever it reports the signal.
        if !self.gate.consume_pending_signal() {
            return;
        }

        if let Some(reloader) = &mut self.reloader {
            match reloader.reload() {
                Ok(config) => {
                    let size = config.connection.read_buffer_size.max(1);
                    if size != self.buffer.len() {
                        self.buffer = vec![0; size];
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reload failed; keeping current configuration");
                }
            }
        }

        self.stats.signals_processed += 1;
        metrics::record_signal();
        tracing::info!("Reload signal processed");
    }

    fn dispatch(&mut self, readiness: Readiness) -> Dispatch {
        let mut dispatch = Dispatch::default();

        for incoming in readiness.incoming {
            match incoming {
                Ok((stream, peer_addr)) => {
                    self.end_accept_error_streak();
                    let conn = ClientConnection::new(stream, peer_addr);
                    let id = conn.id();
                    tracing::info!(connection_id = %id, peer_addr = %peer_addr, "New connection");
                    metrics::record_accept();
                    self.stats.accepted += 1;
                    dispatch.accepted.push(id);

                    if let Some(evicted) = self.connections.accept(conn) {
                        self.stats.evicted += 1;
                        dispatch.evicted.push(evicted.id);
                    }
                }
                Err(e) => {
                    self.accept_error_streak += 1;
                    // A failing accept leaves the listener ready, so the loop
                    // retries at full speed; log the first and then every
                    // ACCEPT_ERROR_LOG_EVERY-th failure.
                    if self.accept_error_streak == 1 {
                        tracing::warn!(error = %e, "Accept failed");
                    } else if self.accept_error_streak % ACCEPT_ERROR_LOG_EVERY == 0 {
                        tracing::warn!(
                            error = %e,
                            failures = self.accept_error_streak,
                            "Accept still failing"
                        );
                    }
                    metrics::record_accept_error();
                    self.stats.accept_errors += 1;
                    dispatch.accept_errors += 1;
                }
            }
        }

        // Readiness was measured before the accepts above; it only applies
        // if the same connection is still held.
        let held = self.connections.current().map(ClientConnection::id);
        if let Some(id) = readiness.readable.filter(|ready| Some(*ready) == held) {
            let outcome = self.connections.read_from(id, &mut self.buffer);
            match outcome {
                ReadOutcome::Data { bytes_read } => {
                    tracing::info!(connection_id = %id, bytes = bytes_read, "Bytes received");
                    metrics::record_bytes(bytes_read);
                    self.stats.bytes_read += bytes_read as u64;
                }
                ReadOutcome::Closed => {
                    if self.connections.remove(id).is_some() {
                        self.stats.closed += 1;
                    }
                }
                ReadOutcome::WouldBlock => {
                    tracing::trace!(connection_id = %id, "Spurious readiness");
                }
            }
            dispatch.read = Some((id, outcome));
        }

        dispatch
    }

    fn end_accept_error_streak(&mut self) {
        if self.accept_error_streak > 0 {
            tracing::info!(
                failures = self.accept_error_streak,
                "Accept recovered"
            );
            self.accept_error_streak = 0;
        }
    }
}
