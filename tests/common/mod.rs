//! Shared helpers for driving the event loop one turn at a time.

#![allow(dead_code)]

use std::time::Duration;

use lone_listener::config::ListenerConfig;
use lone_listener::lifecycle::SignalGate;
use lone_listener::net::{Listener, ReadOutcome};
use lone_listener::server::{Dispatch, EventLoop, Turn};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

const TURN_TIMEOUT: Duration = Duration::from_secs(5);

/// An event loop on an ephemeral loopback port.
pub fn local_loop(read_buffer_size: usize) -> EventLoop {
    let gate = SignalGate::install().unwrap();
    let listener = Listener::bind(&ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        backlog: 16,
    })
    .unwrap();
    EventLoop::new(listener, gate, read_buffer_size)
}

pub async fn turn(event_loop: &mut EventLoop) -> Turn {
    tokio::time::timeout(TURN_TIMEOUT, event_loop.turn())
        .await
        .expect("event loop did not wake up")
        .unwrap()
}

/// Turn until something is accepted.
pub async fn next_accept(event_loop: &mut EventLoop) -> Dispatch {
    loop {
        if let Turn::Dispatched(dispatch) = turn(event_loop).await {
            if !dispatch.accepted.is_empty() {
                return dispatch;
            }
        }
    }
}

/// Turn until the held connection is read, skipping stale readiness.
pub async fn next_read(event_loop: &mut EventLoop) -> ReadOutcome {
    loop {
        if let Turn::Dispatched(Dispatch {
            read: Some((_, outcome)),
            ..
        }) = turn(event_loop).await
        {
            if outcome != ReadOutcome::WouldBlock {
                return outcome;
            }
        }
    }
}

pub async fn connect(event_loop: &EventLoop) -> TcpStream {
    TcpStream::connect(event_loop.local_addr()).await.unwrap()
}

/// True once the server side of `client` has been closed.
pub async fn sees_eof(client: &mut TcpStream) -> bool {
    let mut buf = [0u8; 16];
    matches!(
        tokio::time::timeout(TURN_TIMEOUT, client.read(&mut buf)).await,
        Ok(Ok(0)) | Ok(Err(_))
    )
}
