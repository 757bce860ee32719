use super::settings::{DispatchMode, Settings};
use super::load_config_from;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.hub.dispatch, DispatchMode::Runtime);
    assert_eq!(settings.hub.failure_capacity, 64);
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let cfg = load_config_from(tmp.path().join("absent")).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [hub]
        dispatch = "thread"
        failure_capacity = 8

        [logging]
        level = "debug"
    "#;
    fs::write(tmp.path().join("default.toml"), toml).expect("write config file");

    let cfg = load_config_from(tmp.path().join("default")).expect("load_config failed");
    assert_eq!(cfg.hub.dispatch, DispatchMode::Thread);
    assert_eq!(cfg.hub.failure_capacity, 8);
    assert_eq!(cfg.logging.level, "debug");
}

#[test]
#[serial]
fn partial_file_keeps_remaining_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(tmp.path().join("partial.toml"), "[logging]\nlevel = \"warn\"\n")
        .expect("write config file");

    let cfg = load_config_from(tmp.path().join("partial")).expect("load_config failed");
    assert_eq!(cfg.logging.level, "warn");
    assert_eq!(cfg.hub, Settings::default().hub);
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(
        tmp.path().join("default.toml"),
        "[hub]\ndispatch = \"runtime\"\n\n[logging]\nlevel = \"debug\"\n",
    )
    .expect("write config file");

    temp_env::with_vars(
        [
            ("BROADCAST__HUB__DISPATCH", Some("thread")),
            ("BROADCAST__LOGGING__LEVEL", Some("error")),
        ],
        || {
            let cfg = load_config_from(tmp.path().join("default")).expect("load_config failed");
            assert_eq!(cfg.hub.dispatch, DispatchMode::Thread);
            assert_eq!(cfg.logging.level, "error");
        },
    );
}
