//! Loopback integration tests for the receive loop

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use ledflow_core::{
    BridgeStats, FixtureMap, FrameTrigger, GpioPin, OutputId, OutputLine, PixelKind, Strip,
    UniverseStore, DMX_UNIVERSE_SIZE,
};
use ledflow_sacn::{encode_data_frame, DataFrame, ReceiverConfig, SacnReceiver};

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    addr: SocketAddr,
    store: Arc<UniverseStore>,
    stats: Arc<BridgeStats>,
    stop: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
    sender: UdpSocket,
}

fn start_receiver() -> Harness {
    let map = Arc::new(
        FixtureMap::new(vec![OutputLine {
            id: OutputId::Out1,
            gpio: GpioPin::new(18).unwrap(),
            kind: PixelKind::Rgb8,
            strips: vec![Strip {
                label: "loopback".to_string(),
                pixel_count: 10,
                universe: 1,
                start_channel: 1,
                kind: PixelKind::Rgb8,
            }],
        }])
        .unwrap(),
    );
    let store = Arc::new(UniverseStore::for_universes(map.universes()));
    let stats = Arc::new(BridgeStats::new([OutputId::Out1]));
    let (trigger_tx, _trigger_rx) = bounded::<FrameTrigger>(4);

    let config = ReceiverConfig {
        bind_addr: Ipv4Addr::LOCALHOST,
        port: 0,
        ..ReceiverConfig::default()
    };
    let receiver = SacnReceiver::bind(
        &config,
        map,
        store.clone(),
        stats.clone(),
        trigger_tx,
    )
    .unwrap();
    let addr = receiver.local_addr().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let run_stop = stop.clone();
    let thread = thread::spawn(move || receiver.run(run_stop));

    let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    Harness {
        addr,
        store,
        stats,
        stop,
        thread,
        sender,
    }
}

impl Harness {
    fn send(&self, frame: &DataFrame) {
        self.sender
            .send_to(&encode_data_frame(frame), self.addr)
            .unwrap();
    }

    fn wait_until(&self, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.thread.join().unwrap();
    }
}

fn data_frame(universe: u16, sequence: u8, first_channel: u8) -> DataFrame {
    let mut channels = [0u8; DMX_UNIVERSE_SIZE];
    channels[0] = first_channel;
    DataFrame {
        cid: [0x42; 16],
        source_name: "loopback-console".to_string(),
        priority: 100,
        sequence,
        preview: false,
        stream_terminated: false,
        universe,
        channels,
        channel_count: 512,
    }
}

#[test]
fn accepted_packet_lands_in_store() {
    let harness = start_receiver();

    harness.send(&data_frame(1, 10, 0x55));
    assert!(harness.wait_until(|| harness.store.frame(1).is_some()));

    let frame = harness.store.frame(1).unwrap();
    assert_eq!(frame.payload[0], 0x55);
    assert_eq!(frame.sequence, 10);
    assert_eq!(frame.source_name, "loopback-console");
    assert_eq!(harness.stats.snapshot().packets_accepted, 1);

    harness.shutdown();
}

#[test]
fn replayed_sequence_keeps_previous_payload() {
    let harness = start_receiver();

    harness.send(&data_frame(1, 10, 0xaa));
    assert!(harness.wait_until(|| harness.store.frame(1).is_some()));

    // same sequence from the same source: stale, payload untouched
    harness.send(&data_frame(1, 10, 0xbb));
    assert!(harness.wait_until(|| {
        harness.stats.snapshot().packets_dropped.stale_sequence == 1
    }));
    assert_eq!(harness.store.frame(1).unwrap().payload[0], 0xaa);

    // next sequence replaces it
    harness.send(&data_frame(1, 11, 0xcc));
    assert!(harness.wait_until(|| harness.store.frame(1).unwrap().payload[0] == 0xcc));

    harness.shutdown();
}

#[test]
fn unpatched_universe_and_garbage_are_counted() {
    let harness = start_receiver();

    harness.send(&data_frame(9, 0, 0x11));
    harness
        .sender
        .send_to(b"not a lighting packet", harness.addr)
        .unwrap();

    assert!(harness.wait_until(|| {
        let dropped = harness.stats.snapshot().packets_dropped;
        dropped.unknown_universe == 1 && dropped.malformed == 1
    }));
    assert!(harness.store.frame(9).is_none());
    assert_eq!(harness.stats.snapshot().packets_accepted, 0);

    harness.shutdown();
}

#[test]
fn preview_packets_are_never_rendered() {
    let harness = start_receiver();

    let mut frame = data_frame(1, 0, 0x77);
    frame.preview = true;
    harness.send(&frame);

    assert!(harness.wait_until(|| harness.stats.snapshot().packets_dropped.preview == 1));
    assert!(harness.store.frame(1).is_none());

    harness.shutdown();
}

#[test]
fn terminated_stream_releases_the_universe() {
    let harness = start_receiver();

    harness.send(&data_frame(1, 5, 0x10));
    assert!(harness.wait_until(|| harness.store.frame(1).is_some()));

    let mut goodbye = data_frame(1, 6, 0);
    goodbye.stream_terminated = true;
    harness.send(&goodbye);
    assert!(harness.wait_until(|| {
        harness.stats.snapshot().packets_dropped.stream_terminated == 1
    }));

    // a fresh source with an arbitrary counter takes over at once
    let mut newcomer = data_frame(1, 200, 0x99);
    newcomer.cid = [0x43; 16];
    harness.send(&newcomer);
    assert!(harness.wait_until(|| harness.store.frame(1).unwrap().payload[0] == 0x99));

    harness.shutdown();
}

#[test]
fn stop_flag_terminates_the_loop() {
    let harness = start_receiver();
    let started = Instant::now();
    harness.shutdown();
    assert!(started.elapsed() < WAIT);
}
