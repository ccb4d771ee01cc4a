use anyhow::Result;
use argus::registry::{MemoryRegistry, RegistryEvent};
use argus::{Config, ModbusConnection};
use std::sync::Arc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    argus::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Argus Modbus fleet poller {} starting up",
        env!("APP_VERSION")
    );

    let registry = Arc::new(MemoryRegistry::new());

    // Mirror registry traffic into the log for downstream visibility
    let mut events = registry.subscribe();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RegistryEvent::Value { slave, point, value, .. } => {
                    debug!("{}/{} = {}", slave, point, value);
                }
                RegistryEvent::Status { slave, status } => {
                    info!("{} status: {}", slave, status);
                }
                RegistryEvent::Kind { slave, point, kind } => {
                    debug!("{}/{} kind: {:?}", slave, point, kind);
                }
                RegistryEvent::Renamed { old, new } => {
                    info!("slave renamed: {} -> {}", old, new);
                }
            }
        }
    });

    let connection = ModbusConnection::connect(&config.modbus, registry.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to set up connection: {}", e))?;

    for slave in &config.slaves {
        if let Err(e) = connection.add_slave(slave) {
            error!("Failed to attach slave '{}': {}", slave.name, e);
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    connection
        .shutdown()
        .await
        .map_err(|e| anyhow::anyhow!("Shutdown failed: {}", e))?;
    event_task.abort();

    info!("Shutdown complete");
    Ok(())
}
