use argus::error::ArgusError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        ArgusError::config("x"),
        ArgusError::Config { .. }
    ));
    assert!(matches!(
        ArgusError::modbus("x"),
        ArgusError::Modbus { .. }
    ));
    assert!(matches!(
        ArgusError::exception("x"),
        ArgusError::Exception { .. }
    ));
    assert!(matches!(
        ArgusError::registry("x"),
        ArgusError::Registry { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    let ser = ArgusError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, ArgusError::Serialization { .. }));
    assert!(matches!(ArgusError::io("x"), ArgusError::Io { .. }));
    assert!(matches!(
        ArgusError::validation("f", "m"),
        ArgusError::Validation { .. }
    ));
    assert!(matches!(
        ArgusError::timeout("x"),
        ArgusError::Timeout { .. }
    ));
    assert!(matches!(
        ArgusError::generic("x"),
        ArgusError::Generic { .. }
    ));
}

#[test]
fn display_messages() {
    let e = ArgusError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = ArgusError::exception("IllegalFunction");
    assert!(format!("{}", e).contains("Device exception"));
}

#[test]
fn transport_classification() {
    assert!(ArgusError::modbus("x").is_transport_error());
    assert!(ArgusError::timeout("x").is_transport_error());
    assert!(!ArgusError::exception("x").is_transport_error());
}
