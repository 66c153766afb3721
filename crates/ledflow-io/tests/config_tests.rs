use std::io::Write;

use ledflow_io::{load_config, ConfigError};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const VALID: &str = r#"
version = "1.0"

[input]
ipv4 = "127.0.0.1"
port = 5568
refresh_rate_hz = 40

[log]
level = "debug"
console_output = true
file_output = false

[outputs.out1]
gpio = 18
pixel_type = "rgb8"

[[outputs.out1.strips]]
label = "window"
pixel_count = 60
universe = 3
start_channel = 10
"#;

#[test]
fn valid_file_loads() {
    let file = write_config(VALID);
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.input.ipv4.to_string(), "127.0.0.1");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.outputs.len(), 1);
}

#[test]
fn missing_file_is_a_read_error() {
    let result = load_config(std::path::Path::new("/nonexistent/ledflow.toml"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn wrong_version_is_rejected() {
    let file = write_config(&VALID.replace("\"1.0\"", "\"2.0\""));
    let result = load_config(file.path());
    assert!(
        matches!(result, Err(ConfigError::UnsupportedVersion(version)) if version == "2.0")
    );
}

#[test]
fn fixture_violations_surface_at_load_time() {
    // 60 pixels from channel 400 would end at channel 579
    let file = write_config(&VALID.replace("start_channel = 10", "start_channel = 400"));
    let result = load_config(file.path());
    assert!(matches!(result, Err(ConfigError::Fixture(_))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("version = ");
    let result = load_config(file.path());
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}
