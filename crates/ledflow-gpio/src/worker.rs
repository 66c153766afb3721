//! Output worker: tick loop plus one transmit thread per line
//!
//! The tick thread wakes on a trigger or its own timer, assembles every
//! output from the latest universe snapshots and hands each buffer to that
//! line's dedicated thread over a single-slot channel. A line still busy
//! with its previous frame drops the new one (counted); the other lines are
//! unaffected. Line threads drain their channel, send, and black the strip
//! out when the channel closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use ledflow_core::{assemble_to_vec, BridgeStats, FixtureMap, FrameTrigger, OutputId, UniverseStore};

use crate::driver::OutputDriver;
use crate::error::{GpioError, Result};
use crate::transmit::PixelTransmitter;

/// Default WS281x refresh rate in Hz
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 40;

/// Worker settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Tick rate driving assembly and transmission
    pub refresh_rate_hz: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
        }
    }
}

impl WorkerConfig {
    /// Tick period derived from the refresh rate
    pub fn tick(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.refresh_rate_hz.max(1)))
    }
}

struct LineHandle {
    id: OutputId,
    frame_tx: Sender<Vec<u8>>,
}

/// Handle to the running worker threads
pub struct OutputWorker {
    tick_thread: Option<JoinHandle<()>>,
    line_threads: Vec<JoinHandle<()>>,
}

impl OutputWorker {
    /// Spawn the per-line transmit threads and the tick loop.
    ///
    /// `transmitters` must hold one entry per output line in `map`. The
    /// worker runs until `stop` is raised or the trigger channel closes.
    pub fn spawn(
        map: Arc<FixtureMap>,
        store: Arc<UniverseStore>,
        stats: Arc<BridgeStats>,
        mut transmitters: HashMap<OutputId, Box<dyn PixelTransmitter>>,
        trigger_rx: Receiver<FrameTrigger>,
        stop: Arc<AtomicBool>,
        config: WorkerConfig,
    ) -> Result<Self> {
        let tick = config.tick();
        let mut line_threads = Vec::with_capacity(map.outputs().len());
        let mut lines = Vec::with_capacity(map.outputs().len());

        for output in map.outputs() {
            let transmitter = transmitters
                .remove(&output.id)
                .ok_or(GpioError::MissingTransmitter(output.id))?;
            let mut driver = OutputDriver::new(output.id, transmitter, tick, stats.clone());
            let (frame_tx, frame_rx) = bounded::<Vec<u8>>(1);
            let id = output.id;
            let frame_len = output.buffer_len();

            let handle = thread::Builder::new()
                .name(format!("led-{id}"))
                .spawn(move || {
                    debug!("transmit thread for [{id}] started");
                    while let Ok(frame) = frame_rx.recv() {
                        driver.send(&frame);
                    }
                    driver.blackout(frame_len);
                    debug!("transmit thread for [{id}] stopped");
                })
                .map_err(GpioError::Spawn)?;

            line_threads.push(handle);
            lines.push(LineHandle { id, frame_tx });
        }

        let tick_thread = thread::Builder::new()
            .name("led-tick".to_string())
            .spawn(move || {
                info!(
                    "output worker started ({} Hz tick, {} outputs)",
                    config.refresh_rate_hz,
                    lines.len()
                );

                while !stop.load(Ordering::Relaxed) {
                    match trigger_rx.recv_timeout(tick) {
                        Ok(FrameTrigger) | Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let cycle_start = Instant::now();
                    for (output, line) in map.outputs().iter().zip(&lines) {
                        let frame = assemble_to_vec(output, &store);
                        match line.frame_tx.try_send(frame) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                stats.record_frame_skipped();
                                trace!("output [{}] still transmitting, frame skipped", line.id);
                            }
                            Err(TrySendError::Disconnected(_)) => {}
                        }
                    }

                    let elapsed = cycle_start.elapsed();
                    if elapsed > tick {
                        warn!(
                            "worker cycle overrun by {:.2}ms",
                            (elapsed - tick).as_secs_f64() * 1000.0
                        );
                    }
                }

                // Closing the frame channels lets every line finish its
                // in-flight frame, black out and exit.
                drop(lines);
                info!("output worker stopped");
            })
            .map_err(GpioError::Spawn)?;

        Ok(Self {
            tick_thread: Some(tick_thread),
            line_threads,
        })
    }

    /// True while the tick thread is still running
    pub fn is_alive(&self) -> bool {
        self.tick_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for every worker thread to finish, bounded by `timeout`.
    ///
    /// Returns `false` if a thread had to be abandoned; its handle is
    /// dropped, detaching it.
    pub fn join(mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut clean = true;

        let handles: Vec<JoinHandle<()>> = self
            .tick_thread
            .take()
            .into_iter()
            .chain(self.line_threads.drain(..))
            .collect();

        for handle in handles {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                clean &= handle.join().is_ok();
            } else {
                warn!(
                    "worker thread [{}] did not stop in time, abandoning it",
                    handle.thread().name().unwrap_or("unnamed")
                );
                clean = false;
            }
        }
        clean
    }
}
