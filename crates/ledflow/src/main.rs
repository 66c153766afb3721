//! LedFlow - sACN (E1.31) to WS281x pixel bridge
//!
//! Loads the TOML configuration, starts the supervisor and runs until a
//! stop signal arrives. Usage: `ledflow [config-path]`, defaulting to
//! `./ledflow.toml`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use tracing::{error, info};

use ledflow::logging_setup;
use ledflow::supervisor::Supervisor;
use ledflow_core::OutputId;
use ledflow_gpio::{PixelTransmitter, SinkTransmitter};

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ledflow.toml"));

    let config = ledflow_io::load_config(&config_path)
        .with_context(|| format!("failed to load [{}]", config_path.display()))?;
    let _log_guard = logging_setup::init(&config.log)?;
    info!(
        "ledflow {} starting with [{}]",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    // The WS281x signal generation plugs in behind PixelTransmitter; hosts
    // without LED hardware run against the sink.
    let transmitters: HashMap<OutputId, Box<dyn PixelTransmitter>> = config
        .outputs
        .keys()
        .map(|&id| (id, Box::new(SinkTransmitter) as Box<dyn PixelTransmitter>))
        .collect();

    let supervisor = Supervisor::start(&config, transmitters)?;
    let stop = supervisor.stop_flag();

    std::thread::Builder::new()
        .name("signal-wait".to_string())
        .spawn(move || {
            wait_for_stop_signal();
            stop.store(true, Ordering::Relaxed);
        })
        .context("failed to spawn signal thread")?;

    supervisor.run()
}

/// Block until SIGINT (ctrl-c) or, on unix, SIGTERM arrives
fn wait_for_stop_signal() {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start signal runtime: {err}");
            return;
        }
    };

    runtime.block_on(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut term = match signal(SignalKind::terminate()) {
                Ok(term) => term,
                Err(err) => {
                    error!("failed to install SIGTERM handler: {err}");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
                _ = term.recv() => info!("SIGTERM received"),
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("stop signal received");
            }
        }
    });
}
