//! Layered configuration loading from files and environment

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use perfscope::config::ReadinessMode;
use perfscope::{Config, Error};

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_overrides_defaults() {
    let file = toml_file(
        r#"
[api]
base_url = "http://trace-host:9000/api"

[session]
capture_window = "20s"
readiness = "confirm"

[logging]
format = "json"
"#,
    );

    let config = Config::from_sources(Some(file.path()), Some(HashMap::new())).unwrap();
    assert_eq!(config.api.base_url, "http://trace-host:9000/api");
    assert_eq!(config.session.capture_window, Duration::from_secs(20));
    assert_eq!(config.session.readiness, ReadinessMode::Confirm);
    assert_eq!(config.logging.format, "json");
    // Untouched sections keep their defaults
    assert_eq!(config.jobs.poll_interval, Duration::from_secs(2));
    assert_eq!(config.api.request_timeout, Duration::from_secs(30));
}

#[test]
fn environment_wins_over_file() {
    let file = toml_file("[jobs]\npoll_interval = \"5s\"\n");
    let env = HashMap::from([(
        "PERFSCOPE__JOBS__POLL_INTERVAL".to_string(),
        "750ms".to_string(),
    )]);

    let config = Config::from_sources(Some(file.path()), Some(env)).unwrap();
    assert_eq!(config.jobs.poll_interval, Duration::from_millis(750));
}

#[test]
fn zero_duration_in_file_is_rejected() {
    let file = toml_file("[notifications]\nauto_hide = \"0s\"\n");
    let err = Config::from_sources(Some(file.path()), Some(HashMap::new())).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("notifications.auto_hide"));
}

#[test]
fn unknown_format_is_rejected() {
    let file = toml_file("[logging]\nformat = \"xml\"\n");
    assert!(Config::from_sources(Some(file.path()), Some(HashMap::new())).is_err());
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(Config::load(Some(&missing)).is_err());
}

#[test]
fn log_directory_honours_setting() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.logging.directory = Some(dir.path().to_path_buf());
    assert_eq!(config.log_directory(), dir.path());
}
