use argus::config::{Config, DataType, PointConfig, PointType, SlaveConfig};
use std::fs;

fn slave_with_point() -> SlaveConfig {
    let yaml = r#"
name: plc01
slave_id: 1
polling_interval_ms: 1000
points:
  - name: temperature
    point_type: holding
    offset: 10
    data_type: INT16
    scaling: 10.0
"#;
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.modbus.ip = "10.0.0.5".to_string();
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();
    cfg.slaves.push(slave_with_point());

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.modbus.ip, "10.0.0.5");
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert_eq!(loaded.slaves.len(), 1);
    assert_eq!(loaded.slaves[0].points[0].name, "temperature");
    assert_eq!(loaded.slaves[0].points[0].data_type, DataType::Int16);
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    // Invalid IP
    cfg.modbus.ip.clear();
    assert!(cfg.validate().is_err());

    // Invalid port
    cfg = Config::default();
    cfg.modbus.port = 0;
    assert!(cfg.validate().is_err());

    // Poll interval zero
    cfg = Config::default();
    let mut slave = slave_with_point();
    slave.polling_interval_ms = 0;
    cfg.slaves.push(slave);
    assert!(cfg.validate().is_err());

    // Zero scaling on a point
    cfg = Config::default();
    let mut slave = slave_with_point();
    slave.points[0].scaling = 0.0;
    cfg.slaves.push(slave);
    assert!(cfg.validate().is_err());

    // Bit index beyond one register
    cfg = Config::default();
    let mut slave = slave_with_point();
    slave.points[0].bit = Some(16);
    cfg.slaves.push(slave);
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn point_type_and_data_type_spellings() {
    let point: PointConfig = serde_yaml::from_str(
        r#"
name: flags
point_type: discrete
offset: 3
data_type: BOOLEAN
"#,
    )
    .unwrap();
    assert_eq!(point.point_type, PointType::Discrete);
    assert_eq!(point.data_type, DataType::Boolean);

    let point: PointConfig = serde_yaml::from_str(
        r#"
name: meter
point_type: input
offset: 40
data_type: UINT32M10KSWAP
"#,
    )
    .unwrap();
    assert_eq!(point.data_type, DataType::Uint32M10kSwap);
}
