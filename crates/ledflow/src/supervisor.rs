//! Run orchestration
//!
//! Owns the whole run lifecycle: `Starting -> Running -> Stopping ->
//! Stopped`, with `Errored` absorbing startup failures and unexpected
//! thread deaths. The network side (`sacn-recv`) and the hardware side
//! (`led-tick` plus one thread per line) are separate named threads joined
//! by a bounded handoff channel; either side dying tears the whole run
//! down, never leaving an orphaned worker.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use tracing::{error, info};

use ledflow_core::{BridgeStats, FrameTrigger, OutputId, UniverseStore};
use ledflow_gpio::{OutputWorker, PixelTransmitter, WorkerConfig};
use ledflow_io::BridgeConfig;
use ledflow_sacn::{ReceiverConfig, SacnReceiver};

/// How long a stopping run waits for its threads before abandoning them
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Health poll interval while running
const HEALTH_POLL: Duration = Duration::from_millis(250);

/// Wake triggers buffered between receiver and worker
const TRIGGER_QUEUE_DEPTH: usize = 4;

/// Lifecycle state of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Binding, building and spawning
    Starting,
    /// Steady state: packets flow, outputs tick
    Running,
    /// Stop requested, winding threads down
    Stopping,
    /// Every thread observed terminated
    Stopped,
    /// Absorbing failure state
    Errored,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
            RunState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Coordinates the receiver thread and the output worker for one run
pub struct Supervisor {
    state: RunState,
    stop: Arc<AtomicBool>,
    receiver_thread: Option<JoinHandle<()>>,
    worker: Option<OutputWorker>,
    local_addr: SocketAddr,
    store: Arc<UniverseStore>,
    stats: Arc<BridgeStats>,
}

impl Supervisor {
    /// Bind the socket, build the pipeline and spawn both sides.
    ///
    /// On any failure everything already started is torn down before the
    /// error is returned.
    pub fn start(
        config: &BridgeConfig,
        transmitters: HashMap<OutputId, Box<dyn PixelTransmitter>>,
    ) -> Result<Self> {
        info!("supervisor: starting");

        let map = Arc::new(
            config
                .fixture_map()
                .context("fixture map construction failed")?,
        );
        let store = Arc::new(UniverseStore::for_universes(map.universes()));
        let stats = Arc::new(BridgeStats::new(map.outputs().iter().map(|line| line.id)));
        let stop = Arc::new(AtomicBool::new(false));

        let worker_config = WorkerConfig {
            refresh_rate_hz: config.input.refresh_rate_hz,
        };
        let (trigger_tx, trigger_rx) = bounded::<FrameTrigger>(TRIGGER_QUEUE_DEPTH);

        let receiver_config = ReceiverConfig {
            bind_addr: config.input.ipv4,
            port: config.input.port,
            tick: worker_config.tick(),
        };
        let receiver = SacnReceiver::bind(
            &receiver_config,
            map.clone(),
            store.clone(),
            stats.clone(),
            trigger_tx,
        )
        .context("socket bind failed")?;
        let local_addr = receiver.local_addr().context("socket bind failed")?;

        let worker = OutputWorker::spawn(
            map,
            store.clone(),
            stats.clone(),
            transmitters,
            trigger_rx,
            stop.clone(),
            worker_config,
        )
        .context("output worker startup failed")?;

        let recv_stop = stop.clone();
        let receiver_thread = match thread::Builder::new()
            .name("sacn-recv".to_string())
            .spawn(move || receiver.run(recv_stop))
        {
            Ok(handle) => handle,
            Err(err) => {
                // Tear the already-running worker down before reporting.
                stop.store(true, Ordering::Relaxed);
                worker.join(SHUTDOWN_TIMEOUT);
                return Err(err).context("failed to spawn receiver thread");
            }
        };

        info!("supervisor: running");
        Ok(Self {
            state: RunState::Running,
            stop,
            receiver_thread: Some(receiver_thread),
            worker: Some(worker),
            local_addr,
            store,
            stats,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Shared stop flag; raising it drives the run into `Stopping`
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Address the receiver actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Universe snapshots for the monitoring collaborator
    pub fn store(&self) -> Arc<UniverseStore> {
        self.store.clone()
    }

    /// Counters for the monitoring collaborator
    pub fn stats(&self) -> Arc<BridgeStats> {
        self.stats.clone()
    }

    /// Drive the run to completion.
    ///
    /// Blocks until the stop flag is raised (clean shutdown) or one side
    /// dies unexpectedly (`Errored`, reported as an error).
    pub fn run(mut self) -> Result<()> {
        while !self.stop.load(Ordering::Relaxed) {
            let worker_alive = self.worker.as_ref().is_some_and(OutputWorker::is_alive);
            if !worker_alive {
                return self.fail("output worker exited unexpectedly");
            }
            let receiver_alive = self
                .receiver_thread
                .as_ref()
                .is_some_and(|handle| !handle.is_finished());
            if !receiver_alive {
                return self.fail("sACN receiver exited unexpectedly");
            }
            thread::sleep(HEALTH_POLL);
        }
        self.shutdown()
    }

    fn shutdown(mut self) -> Result<()> {
        self.state = RunState::Stopping;
        info!("supervisor: stopping");
        self.stop.store(true, Ordering::Relaxed);

        let clean = self.teardown(SHUTDOWN_TIMEOUT);
        if clean {
            self.state = RunState::Stopped;
            info!("supervisor: stopped");
            Ok(())
        } else {
            self.state = RunState::Errored;
            bail!("shutdown timed out; remaining worker threads were abandoned");
        }
    }

    fn fail(mut self, reason: &str) -> Result<()> {
        self.state = RunState::Errored;
        error!("supervisor: {reason}");
        self.stop.store(true, Ordering::Relaxed);
        self.teardown(SHUTDOWN_TIMEOUT);
        bail!("{reason}");
    }

    /// Join both sides within `timeout`; true when everything terminated
    fn teardown(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut clean = true;

        if let Some(handle) = self.receiver_thread.take() {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                clean &= handle.join().is_ok();
            } else {
                clean = false;
            }
        }
        if let Some(worker) = self.worker.take() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            clean &= worker.join(remaining);
        }
        clean
    }
}
