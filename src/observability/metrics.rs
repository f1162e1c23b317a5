//! Metrics collection.
//!
//! # Metrics
//! - `lone_listener_connections_accepted_total` (counter)
//! - `lone_listener_connections_evicted_total` (counter): superseded by a newer accept
//! - `lone_listener_connections_closed_total` (counter): peer close or read error
//! - `lone_listener_bytes_received_total` (counter)
//! - `lone_listener_accept_errors_total` (counter)
//! - `lone_listener_reload_signals_total` (counter)
//! - `lone_listener_connection_held` (gauge): 1 while a client is tracked, else 0
//!
//! # Design Decisions
//! - No exporter is installed here; updates go to whatever recorder the
//!   process installed, and are no-ops otherwise

use metrics::{counter, gauge};

pub fn record_accept() {
    counter!("lone_listener_connections_accepted_total").increment(1);
    gauge!("lone_listener_connection_held").set(1.0);
}

pub fn record_eviction() {
    counter!("lone_listener_connections_evicted_total").increment(1);
}

pub fn record_close() {
    counter!("lone_listener_connections_closed_total").increment(1);
    gauge!("lone_listener_connection_held").set(0.0);
}

pub fn record_bytes(bytes: usize) {
    counter!("lone_listener_bytes_received_total").increment(bytes as u64);
}

pub fn record_accept_error() {
    counter!("lone_listener_accept_errors_total").increment(1);
}

pub fn record_signal() {
    counter!("lone_listener_reload_signals_total").increment(1);
}
