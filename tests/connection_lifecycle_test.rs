use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use argus::config::{ModbusConfig, SlaveConfig};
use argus::connection::ModbusConnection;
use argus::modbus::ModbusClient;
use argus::poller::transport_like::SharedTransport;
use argus::registry::{DeviceRegistry, MemoryRegistry, SlaveStatus};

fn local_modbus_config() -> ModbusConfig {
    // Nothing listens here; connects are refused immediately
    ModbusConfig {
        ip: "127.0.0.1".to_string(),
        port: 1,
        connect_timeout_ms: 100,
        operation_timeout_ms: 100,
        max_retry_attempts: 1,
        retry_delay_ms: 10,
    }
}

fn slave(name: &str) -> SlaveConfig {
    serde_yaml::from_str(&format!(
        r#"
name: {}
slave_id: 1
polling_interval_ms: 20
"#,
        name
    ))
    .unwrap()
}

fn connection_without_transport(registry: Arc<MemoryRegistry>) -> ModbusConnection {
    let registry_dyn: Arc<dyn DeviceRegistry> = registry;
    let client = ModbusClient::new(&local_modbus_config());
    let transport: SharedTransport = Arc::new(Mutex::new(Box::new(client)));
    ModbusConnection::from_parts(transport, registry_dyn, 1, Duration::from_millis(10))
}

#[tokio::test]
async fn attached_slave_reports_conn_down_without_transport() {
    let registry = Arc::new(MemoryRegistry::new());
    let connection = connection_without_transport(registry.clone());

    connection.add_slave(&slave("plc01")).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.status("plc01"), Some(SlaveStatus::ConnDown));

    connection.shutdown().await.unwrap();
}

#[tokio::test]
async fn duplicate_slave_names_are_rejected() {
    let registry = Arc::new(MemoryRegistry::new());
    let connection = connection_without_transport(registry);

    connection.add_slave(&slave("plc01")).unwrap();
    assert!(connection.add_slave(&slave("plc01")).is_err());

    connection.shutdown().await.unwrap();
}

#[tokio::test]
async fn remove_slave_stops_its_task() {
    let registry = Arc::new(MemoryRegistry::new());
    let connection = connection_without_transport(registry);

    connection.add_slave(&slave("plc01")).unwrap();
    connection.remove_slave("plc01").await.unwrap();
    assert!(connection.remove_slave("plc01").await.is_err());

    // The name is free again after removal
    connection.add_slave(&slave("plc01")).unwrap();
    connection.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_completes_with_multiple_slaves() {
    let registry = Arc::new(MemoryRegistry::new());
    let connection = connection_without_transport(registry.clone());

    for name in ["plc01", "plc02", "plc03"] {
        connection.add_slave(&slave(name)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    connection.shutdown().await.unwrap();

    for name in ["plc01", "plc02", "plc03"] {
        assert_eq!(registry.status(name), Some(SlaveStatus::ConnDown));
    }
}
