//! Configuration loading tests.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use bitunix_ticker::TickerError;
use bitunix_ticker::config::{AcquisitionMode, AppConfig};
use bitunix_ticker::display::{DisplayMode, MissingBaseline};
use bitunix_ticker::models::Channel;

/// Helper to get the path to test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_valid_config_loads() {
    let config = AppConfig::load(&fixtures_dir().join("config.json")).expect("Failed to load config");

    assert_eq!(config.normalized_symbols(), vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    assert_eq!(config.acquisition, AcquisitionMode::Hybrid);
    assert_eq!(config.display.mode, DisplayMode::Rotate);
    assert_eq!(config.display.visible_for(), Duration::from_secs(4));
    assert_eq!(config.display.fade(), Duration::from_millis(500));
    assert!(!config.display.show_change_percent);
    assert_eq!(config.display.missing_baseline, MissingBaseline::Unknown);
    assert_eq!(config.rest.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.websocket.channels, vec![Channel::Ticker, Channel::DepthBook1]);
    // unspecified fields keep their defaults
    assert_eq!(config.websocket.heartbeat_interval(), Duration::from_secs(3));
    tokio_test::assert_ok!(config.validate());
}

#[test]
fn test_legacy_field_names_are_accepted() {
    let config =
        AppConfig::load(&fixtures_dir().join("legacy_config.json")).expect("Failed to load config");

    assert_eq!(config.normalized_symbols(), vec!["BTCUSDT", "ETHUSDT"]);
    assert_eq!(config.display.visible_for(), Duration::from_secs(3));
    assert_eq!(config.display.fade(), Duration::from_millis(1500));
    assert_eq!(config.websocket.reconnect_delay(), Duration::from_secs(5));
    assert_eq!(config.acquisition, AcquisitionMode::Rest);
}

#[test]
fn test_config_file_not_found() {
    let err = AppConfig::load(&fixtures_dir().join("nonexistent.json")).unwrap_err();

    assert!(matches!(err, TickerError::Config(_)));
}

#[test]
fn test_malformed_config_is_json_error() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(file, "{{\"symbols\": [\"btc\",").expect("Failed to write temp file");

    let err = AppConfig::load(file.path()).unwrap_err();

    assert!(matches!(err, TickerError::Json(_)));
}

#[test]
fn test_config_without_symbols_fails_validation() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(file, r#"{{"symbols": ["  "], "display": {{"visible_secs": 2}}}}"#)
        .expect("Failed to write temp file");

    let config = AppConfig::load(file.path()).expect("Failed to load config");

    assert!(matches!(config.validate(), Err(TickerError::EmptySymbols)));
}

#[test]
fn test_websocket_mode_requires_channels() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"{{"symbols": ["btc"], "acquisition": "websocket", "websocket": {{"channels": []}}}}"#
    )
    .expect("Failed to write temp file");

    let config = AppConfig::load(file.path()).expect("Failed to load config");

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("websocket.channels"));
}
