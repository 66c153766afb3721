//! Full-run integration tests: supervisor + receiver + worker in-process

use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ledflow::supervisor::{RunState, Supervisor};
use ledflow_core::{LogConfig, OutputId, DMX_UNIVERSE_SIZE};
use ledflow_gpio::{PixelTransmitter, TransmitError};
use ledflow_io::{BridgeConfig, InputConfig, OutputConfig, StripConfig};
use ledflow_sacn::{encode_data_frame, DataFrame};

const WAIT: Duration = Duration::from_secs(3);

#[derive(Clone, Default)]
struct RecordingTransmitter {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl PixelTransmitter for RecordingTransmitter {
    fn transmit(&mut self, _output: OutputId, pixels: &[u8]) -> Result<(), TransmitError> {
        self.frames.lock().unwrap().push(pixels.to_vec());
        Ok(())
    }
}

fn test_config(port: u16) -> BridgeConfig {
    let mut outputs = BTreeMap::new();
    outputs.insert(
        OutputId::Out1,
        OutputConfig {
            gpio: 18,
            pixel_type: ledflow_core::PixelKind::Rgb8,
            strips: vec![StripConfig {
                label: "bench strip".to_string(),
                pixel_count: 4,
                universe: 1,
                start_channel: 1,
            }],
        },
    );
    BridgeConfig {
        version: "1.0".to_string(),
        input: InputConfig {
            ipv4: Ipv4Addr::LOCALHOST,
            port,
            refresh_rate_hz: 100,
        },
        outputs,
        log: LogConfig::default(),
    }
}

fn recording_transmitters() -> (RecordingTransmitter, HashMap<OutputId, Box<dyn PixelTransmitter>>) {
    let recorder = RecordingTransmitter::default();
    let mut transmitters: HashMap<OutputId, Box<dyn PixelTransmitter>> = HashMap::new();
    transmitters.insert(OutputId::Out1, Box::new(recorder.clone()));
    (recorder, transmitters)
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn packets_flow_end_to_end() {
    let (recorder, transmitters) = recording_transmitters();
    let supervisor = Supervisor::start(&test_config(0), transmitters).unwrap();
    assert_eq!(supervisor.state(), RunState::Running);

    let mut channels = [0u8; DMX_UNIVERSE_SIZE];
    channels[..12].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    let frame = DataFrame {
        cid: [0x07; 16],
        source_name: "integration".to_string(),
        priority: 100,
        sequence: 1,
        preview: false,
        stream_terminated: false,
        universe: 1,
        channels,
        channel_count: 512,
    };

    let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    sender
        .send_to(&encode_data_frame(&frame), supervisor.local_addr())
        .unwrap();

    let stats = supervisor.stats();
    assert!(wait_until(|| stats.snapshot().packets_accepted == 1));
    assert!(wait_until(|| {
        recorder
            .frames
            .lock()
            .unwrap()
            .iter()
            .any(|frame| frame[..12] == [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12])
    }));

    // clean stop afterwards
    let stop = supervisor.stop_flag();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::Relaxed);
    });
    supervisor.run().unwrap();
    stopper.join().unwrap();
}

#[test]
fn stop_flag_shuts_the_run_down_within_the_timeout() {
    let (_recorder, transmitters) = recording_transmitters();
    let supervisor = Supervisor::start(&test_config(0), transmitters).unwrap();
    let stop = supervisor.stop_flag();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        stop.store(true, Ordering::Relaxed);
    });

    let started = Instant::now();
    supervisor.run().unwrap();
    assert!(started.elapsed() < WAIT);
    stopper.join().unwrap();
}

#[test]
fn occupied_port_fails_startup() {
    let holder = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = holder.local_addr().unwrap().port();

    let (_recorder, transmitters) = recording_transmitters();
    let result = Supervisor::start(&test_config(port), transmitters);
    assert!(result.is_err());
    let message = format!("{:#}", result.err().unwrap());
    assert!(message.contains("socket bind failed"), "{message}");
}

#[test]
fn missing_transmitter_fails_startup() {
    let transmitters: HashMap<OutputId, Box<dyn PixelTransmitter>> = HashMap::new();
    let result = Supervisor::start(&test_config(0), transmitters);
    assert!(result.is_err());
}
