//! lone-listener
//!
//! A single-threaded TCP server that keeps at most one client connection,
//! counts the bytes it receives, and reloads its configuration on SIGHUP.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!                 │                 EVENT LOOP                    │
//!   SIGHUP ──────▶│  ┌────────────┐                               │
//!                 │  │ SignalGate │── Interrupted ──▶ reload      │
//!                 │  │  (wait)    │                               │
//!   connect ─────▶│  └─────┬──────┘                               │
//!                 │        │ Ready                                │
//!                 │        ▼                                      │
//!                 │  ┌──────────┐   accept   ┌───────────────┐    │
//!                 │  │ Listener │───────────▶│ ConnectionSet │    │
//!                 │  └──────────┘  (evicts)  │   (0 or 1)    │    │
//!   bytes ───────▶│                          └───────────────┘    │
//!                 │                     read, count, log          │
//!                 └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lone_listener::config::{load_config, ConfigOverrides};
use lone_listener::lifecycle::{self, ConfigSource};
use lone_listener::observability::logging;
use lone_listener::ServerError;

#[derive(Parser)]
#[command(name = "lone-listener")]
#[command(about = "Single-connection TCP byte counter", long_about = None)]
struct Cli {
    /// TOML configuration file, re-read on SIGHUP
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overrides the file (e.g. 0.0.0.0:11111)
    #[arg(short, long)]
    bind: Option<String>,

    /// Log filter directive, overrides the file (e.g. debug)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                tracing::error!(error = %e, "Fatal error");
            } else {
                eprintln!("lone-listener: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ServerError> {
    let overrides = ConfigOverrides {
        bind_address: cli.bind,
        log_level: cli.log_level,
    };
    let config = load_config(cli.config.as_deref(), &overrides)?;
    let filter = logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backlog = config.listener.backlog,
        read_buffer_size = config.connection.read_buffer_size,
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(async {
        let source = ConfigSource {
            path: cli.config,
            overrides,
            filter: Some(filter),
        };
        let event_loop = lifecycle::start(&config, source)?;
        event_loop.run().await
    })
}
