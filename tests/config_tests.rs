//! Configuration system tests
//!
//! Tests configuration loading, validation, and collapsing of layered values

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use proxy_executor::config::DispatchConfig;
use proxy_executor::{Error, ProxyExecutor, ProxyOptions};

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn validate(&self) -> assert_cmd::assert::Assert {
        Command::cargo_bin("proxy-executor")
            .unwrap()
            .current_dir(self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env_remove("PROXY_EXECUTOR_EXECUTOR")
            .env_remove("PROXY_EXECUTOR_LOG_LEVEL")
            .env_remove("PROXY_EXECUTOR_DATA_DIR")
            .args(["config", "validate", "--config", self.path()])
            .assert()
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]

[logging]

[storage]
"#,
    );

    fixture.validate().success();
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]
driver_name = "zookeeper"
executor = "greenthreading"

[logging]
level = "debug"
file = "/tmp/proxy-executor.log"
max_file_size_mb = 50
max_files = 3
json_format = true

[storage]
data_dir = "/tmp/proxy-executor/data"
"#,
    );

    fixture.validate().success();
}

#[test]
fn test_list_valued_executor_collapses_to_last() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]
executor = ["bogus", "sync"]
"#,
    );

    fixture.validate().success();

    let config = DispatchConfig::load(Some(fixture.path())).unwrap();
    assert_eq!(config.dispatch.executor, "sync");
}

#[test]
fn test_empty_list_falls_back_to_default() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]
executor = []
"#,
    );

    let config = DispatchConfig::parse(&fs::read_to_string(fixture.path()).unwrap()).unwrap();
    assert_eq!(config.dispatch.executor, "threaded");
}

#[test]
fn test_settings_drive_proxy_build() {
    let config = DispatchConfig::parse(
        r#"
[dispatch]
driver_name = "etcd3"
executor = "synchronous"
"#,
    )
    .unwrap();

    let driver = config.dispatch.driver_name();
    let proxy =
        ProxyExecutor::build(&driver, ProxyOptions::from_settings(&config.dispatch)).unwrap();
    proxy.start().unwrap();
    assert!(proxy.submit(|| ()).unwrap().is_done());
    proxy.stop();
    assert_eq!(proxy.driver_name(), "etcd3");
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_executor() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]
executor = "eventlet"
"#,
    );

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("Unknown executor 'eventlet'"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "invalid_level"
"#,
    );

    fixture.validate().failure();
}

#[test]
fn test_empty_driver_name() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]
driver_name = ""
"#,
    );

    fixture.validate().failure();
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch
executor = "sync"
"#,
    );

    fixture
        .validate()
        .failure()
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_non_table_dispatch_section() {
    let err = DispatchConfig::parse("dispatch = 3").unwrap_err();
    assert!(matches!(err, Error::ConfigValidation { .. }));
}

// ─────────────────────────────────────────────────────────────────
// Config Show Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_custom() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dispatch]
driver_name = "zake"
executor = ["threaded", "greenthread"]
"#,
    );

    Command::cargo_bin("proxy-executor")
        .unwrap()
        .current_dir(fixture.temp_dir.path())
        .env_remove("PROXY_EXECUTOR_EXECUTOR")
        .env_remove("PROXY_EXECUTOR_DRIVER_NAME")
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("driver_name = \"zake\""))
        .stdout(predicate::str::contains("executor = \"greenthread\""));
}
