//! Unicast sACN receive loop
//!
//! One blocking loop: receive a datagram, decode, validate against the
//! fixture map, arbitrate, publish into the universe store. The loop never
//! blocks on the output worker; the handoff channel only carries paced wake
//! triggers and drops them under backpressure.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::Sender;
use tracing::{info, trace, warn};

use ledflow_core::{BridgeStats, DropReason, FixtureMap, FrameTrigger, UniverseFrame, UniverseStore};

use crate::arbitration::{Admission, SourceArbiter};
use crate::packet::{parse_data_frame, DataFrame, ACN_SDT_PORT};
use crate::Result;

/// Poll interval for the stop flag between datagrams
const SOCKET_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Largest datagram worth reading; E1.31 data frames are at most 638 bytes
const RECV_BUFFER_LEN: usize = 1024;

/// Receiver settings
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Local IPv4 address to bind
    pub bind_addr: Ipv4Addr,
    /// UDP port, normally [`ACN_SDT_PORT`]
    pub port: u16,
    /// Output worker tick period; paces wake triggers
    pub tick: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: Ipv4Addr::UNSPECIFIED,
            port: ACN_SDT_PORT,
            tick: Duration::from_millis(25),
        }
    }
}

/// Receives, validates and arbitrates sACN data frames
pub struct SacnReceiver {
    socket: UdpSocket,
    map: Arc<FixtureMap>,
    store: Arc<UniverseStore>,
    stats: Arc<BridgeStats>,
    trigger_tx: Sender<FrameTrigger>,
    arbiter: SourceArbiter,
    trigger_interval: Duration,
    last_trigger: Option<Instant>,
}

impl SacnReceiver {
    /// Bind the unicast listener. A bind failure is fatal to the run.
    pub fn bind(
        config: &ReceiverConfig,
        map: Arc<FixtureMap>,
        store: Arc<UniverseStore>,
        stats: Arc<BridgeStats>,
        trigger_tx: Sender<FrameTrigger>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(config.bind_addr, config.port))?;
        socket.set_read_timeout(Some(SOCKET_READ_TIMEOUT))?;
        info!("sACN receiver bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            map,
            store,
            stats,
            trigger_tx,
            arbiter: SourceArbiter::new(),
            // Trigger slightly below the tick rate so a fast sender cannot
            // flood the handoff channel.
            trigger_interval: config.tick.mul_f32(0.9),
            last_trigger: None,
        })
    }

    /// Address the socket actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking receive loop; returns once `stop` is raised.
    pub fn run(mut self, stop: Arc<AtomicBool>) {
        let mut buf = [0u8; RECV_BUFFER_LEN];
        info!("sACN receive loop started");

        while !stop.load(Ordering::Relaxed) {
            let len = match self.socket.recv_from(&mut buf) {
                Ok((len, _peer)) => len,
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(err) => {
                    warn!("socket receive error: {err}");
                    continue;
                }
            };
            self.handle_datagram(&buf[..len]);
        }

        info!("sACN receive loop stopped");
    }

    fn handle_datagram(&mut self, raw: &[u8]) {
        let frame = match parse_data_frame(raw) {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.record_dropped(DropReason::Malformed);
                trace!("dropped undecodable datagram: {err}");
                return;
            }
        };

        if !self.map.contains_universe(frame.universe) {
            // No strip sources from it: nothing to do.
            self.stats.record_dropped(DropReason::UnknownUniverse);
            trace!("dropped packet for unpatched universe [{}]", frame.universe);
            return;
        }

        if frame.preview {
            self.stats.record_dropped(DropReason::Preview);
            trace!("dropped preview packet for universe [{}]", frame.universe);
            return;
        }

        if frame.stream_terminated {
            if self.arbiter.release(frame.universe, &frame.cid) {
                info!(
                    "source [{}] left universe [{}]",
                    frame.source_name, frame.universe
                );
            }
            self.stats.record_dropped(DropReason::StreamTerminated);
            return;
        }

        match self.arbiter.admit(&frame, Instant::now()) {
            Admission::AcceptedNewSource => {
                info!(
                    "universe [{}] now driven by [{}] at priority [{}]",
                    frame.universe, frame.source_name, frame.priority
                );
                self.accept(frame);
            }
            Admission::Accepted => self.accept(frame),
            Admission::Rejected(reason) => {
                self.stats.record_dropped(reason);
                trace!(
                    "dropped packet for universe [{}]: {reason:?}",
                    frame.universe
                );
            }
        }
    }

    fn accept(&mut self, frame: DataFrame) {
        self.store.publish(into_universe_frame(frame));
        self.stats.record_accepted();
        self.wake_worker();
    }

    /// Nudge the output worker, at most once per trigger interval. A full
    /// channel is not an error: the worker picks up the latest store
    /// content on its own tick regardless.
    fn wake_worker(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < self.trigger_interval {
                return;
            }
        }
        self.last_trigger = Some(now);

        if self.trigger_tx.try_send(FrameTrigger).is_err() {
            self.stats.record_trigger_dropped();
        }
    }
}

fn into_universe_frame(frame: DataFrame) -> UniverseFrame {
    UniverseFrame {
        universe: frame.universe,
        payload: frame.channels,
        sequence: frame.sequence,
        priority: frame.priority,
        source_name: frame.source_name,
        source_cid: frame.cid,
        received_at: Utc::now(),
    }
}
