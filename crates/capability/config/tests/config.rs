use devsim_config::{AppConfig, ConfigError, DEFAULT_LOG_SEVERITY, DeviceFile};
use domain::{ParameterType, RawValue};
use std::fs;

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("DEVSIM_NUMBER", "3");
        std::env::set_var("DEVSIM_LOG_SEVERITY", "2");
        std::env::set_var("DEVSIM_PORTFILE", "/tmp/ports");
        std::env::remove_var("DEVSIM_SOURCE");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.number, 3);
    assert_eq!(config.log_severity, 2);
    assert_eq!(config.portfile.as_deref(), Some(std::path::Path::new("/tmp/ports")));
    assert!(config.source.is_none());
    assert!(config.has_devices());

    unsafe {
        std::env::set_var("DEVSIM_NUMBER", "many");
    }
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::Invalid(_, _))));

    unsafe {
        std::env::remove_var("DEVSIM_NUMBER");
        std::env::remove_var("DEVSIM_LOG_SEVERITY");
        std::env::remove_var("DEVSIM_PORTFILE");
    }
}

#[test]
fn default_config_has_nothing_to_do() {
    let config = AppConfig::default();
    assert_eq!(config.log_severity, DEFAULT_LOG_SEVERITY);
    assert_eq!(DEFAULT_LOG_SEVERITY, devsim_telemetry::DEFAULT_LOG_SEVERITY);
    assert!(!config.has_devices());
}

#[test]
fn source_params_are_merged_with_inline_params() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("meter_params.yaml"),
        "Params:\n  - { name: flow, type: a, init: 2 }\n  - { name: tag, type: s, init: base }\n",
    )
    .expect("write params");
    let devices = dir.path().join("devices.yaml");
    fs::write(
        &devices,
        "Devices:\n  meter:\n    source: meter_params.yaml\n    Params:\n      tag: { type: s, init: override }\n",
    )
    .expect("write devices");

    let file = DeviceFile::load(&devices).expect("load");
    let definitions = file.definitions();
    assert_eq!(definitions.len(), 1);
    let (name, definition) = &definitions[0];
    assert_eq!(name, "meter");
    let params = definition.as_ref().expect("definition").parameters.clone().expect("params");
    assert_eq!(params.len(), 2);
    let tag = params.iter().find(|p| p.name == "tag").expect("tag");
    assert_eq!(tag.initial, Some(RawValue::Text("override".to_string())));
    let flow = params.iter().find(|p| p.name == "flow").expect("flow");
    assert_eq!(flow.kind, Some(ParameterType::Analog));
}

#[test]
fn missing_source_fails_only_that_device() {
    let dir = tempfile::tempdir().expect("tempdir");
    let devices = dir.path().join("devices.yaml");
    fs::write(
        &devices,
        "Devices:\n  broken:\n    source: nowhere.yaml\n  fine:\n    port: 9100\n",
    )
    .expect("write devices");

    let file = DeviceFile::load(&devices).expect("load");
    let definitions = file.definitions();
    let broken = definitions.iter().find(|(name, _)| name == "broken").expect("broken");
    assert!(matches!(broken.1, Err(ConfigError::Read { .. })));
    let fine = definitions.iter().find(|(name, _)| name == "fine").expect("fine");
    assert_eq!(fine.1.as_ref().expect("fine").port, Some(9100));
}

#[test]
fn json_device_files_are_supported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let devices = dir.path().join("devices.json");
    fs::write(
        &devices,
        r#"{"Devices": {"valve": {"log": 1, "Params": {"open": {"type": "b", "init": false}}}}}"#,
    )
    .expect("write devices");

    let file = DeviceFile::load(&devices).expect("load");
    let definition = file
        .definition("valve", &file.devices["valve"])
        .expect("definition");
    assert_eq!(definition.log_severity, Some(1));
    let params = definition.parameters.expect("params");
    assert_eq!(params[0].initial, Some(RawValue::Bool(false)));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let devices = dir.path().join("devices.yaml");
    fs::write(&devices, "Devices:\n  d:\n    port: not_a_port\n").expect("write devices");
    assert!(matches!(DeviceFile::load(&devices), Err(ConfigError::Parse { .. })));
}
