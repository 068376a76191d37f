//! Whole-bridge runs over recorded captures

use groundlink::{Bridge, BridgeConfig};
use tokio_util::sync::CancellationToken;

fn frame(number: u8, packet: u8, count: u8, payload: &str) -> Vec<u8> {
    let mut bytes = vec![number, packet, count];
    bytes.extend_from_slice(payload.as_bytes());
    bytes.push(b'@');
    bytes
}

fn capture() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend(frame(0, 0, 1, "LOOP lastLoopStart=2000000"));
    bytes.extend(frame(1, 0, 2, "GPS lat=1"));
    bytes.extend(frame(1, 1, 2, "\tlon=2"));
    // Packet 1 of 3 lost on the radio
    bytes.extend(frame(2, 0, 3, "IMU ax=1"));
    bytes.extend(frame(2, 2, 3, "\taz=3"));
    bytes.extend(b"\x05@");
    // Transmission number equal to the delimiter
    bytes.extend(frame(b'@', 0, 1, "LOG at sign"));
    bytes.extend(frame(3, 0, 1, "BEACON 42"));
    bytes
}

async fn run(config: BridgeConfig) -> groundlink::BridgeReport {
    Bridge::new(config).unwrap().start(CancellationToken::new()).await.unwrap().wait().await
}

#[tokio::test]
async fn capture_with_damage_is_logged_in_order() {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir().unwrap();
    let replay = dir.path().join("flight.bin");
    std::fs::write(&replay, capture()).unwrap();
    let log_file = dir.path().join("flight.log");

    let config = BridgeConfig {
        replay: Some(replay),
        log_file: log_file.clone(),
        web_port: 0,
        poll_interval_ms: 1,
        ..Default::default()
    };
    let report = run(config).await;

    assert_eq!(report.driver.reassembly.completed, 4);
    assert_eq!(report.driver.reassembly.sequence_errors, 1);
    assert_eq!(report.driver.framing_errors, 1);
    assert_eq!(report.logged, 4);

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert_eq!(
        log,
        "[0]\t(LOOP)\tlastLoopStart=2000000\n\
         [1]\t(GPS)\tlat=1\tlon=2\n\
         [64]\t(LOG)\tat sign\n\
         [3]\t(BEACON)\t42\n"
    );
}

#[tokio::test]
async fn overwrite_off_appends_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let replay = dir.path().join("short.bin");
    std::fs::write(&replay, frame(9, 0, 1, "LOG boot")).unwrap();
    let log_file = dir.path().join("flight.log");
    std::fs::write(&log_file, "previous session\n").unwrap();

    let config = BridgeConfig {
        replay: Some(replay),
        log_file: log_file.clone(),
        overwrite: false,
        web_port: 0,
        poll_interval_ms: 1,
        ..Default::default()
    };
    run(config.clone()).await;
    run(config).await;

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert_eq!(log, "previous session\n[9]\t(LOG)\tboot\n[9]\t(LOG)\tboot\n");
}

#[tokio::test]
async fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let replay = dir.path().join("flight.bin");
    std::fs::write(&replay, capture()).unwrap();
    let log_file = dir.path().join("from-config.log");

    let yaml = format!(
        "replay: {}\nlog_file: {}\nweb_port: 0\npoll_interval_ms: 2\n",
        replay.display(),
        log_file.display()
    );
    let config_path = dir.path().join("groundlink.yaml");
    std::fs::write(&config_path, yaml).unwrap();

    let report = run(BridgeConfig::from_yaml_file(&config_path).unwrap()).await;
    assert_eq!(report.logged, 4);
    assert!(log_file.exists());
}
