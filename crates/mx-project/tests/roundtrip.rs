use mx_project::schema::*;
use mx_project::{load_json, load_yaml, save_json, save_yaml, validate_config};
use std::path::Path;

#[test]
fn roundtrip_yaml_default_config() {
    let config = ProcessConfig::default();
    validate_config(&config).unwrap();

    let path = std::env::temp_dir().join("mx_project_roundtrip_default.yaml");
    save_yaml(&path, &config).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn roundtrip_json_modified_config() {
    let mut config = ProcessConfig {
        name: "Cold batch".to_string(),
        ..ProcessConfig::default()
    };
    config.operator.target_c = 35.0;
    config.plant.feed_b.initial_temperature_c = 70.0;
    config.pid.kp = 10.0;

    let path = std::env::temp_dir().join("mx_project_roundtrip_modified.json");
    save_json(&path, &config).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn save_refuses_invalid_config() {
    let mut config = ProcessConfig::default();
    config.plant.pump_speed = 0.0;
    let path = std::env::temp_dir().join("mx_project_roundtrip_invalid.yaml");
    assert!(save_yaml(&path, &config).is_err());
}

#[test]
fn shipped_default_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/batch_default.yaml");
    let config = load_yaml(&path).unwrap_or_else(|e| panic!("Failed to load: {}", e));
    assert_eq!(config.to_settings(), ProcessConfig::default().to_settings());
    let controller = config.build_controller().unwrap();
    assert_eq!(controller.plant().mixer.capacity(), 200.0);
}
