//! Modbus TCP client for slave fleet communication
//!
//! This module provides async Modbus TCP communication with the device
//! fleet sharing one connection. The unit id is selected per call, so any
//! number of slaves can be polled over a single transport; exclusivity is
//! enforced one level up by the connection's transport lock.

use crate::config::ModbusConfig;
use crate::error::{ArgusError, Result};
use crate::logging::get_logger;
use crate::poller::transport_like::ModbusTransport;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

/// Modbus TCP client for the shared fleet connection
pub struct ModbusClient {
    /// Modbus TCP client connection
    client: Option<tokio_modbus::client::Context>,

    /// Configuration
    config: ModbusConfig,

    /// Connection timeout
    connection_timeout: Duration,

    /// Operation timeout
    operation_timeout: Duration,

    /// Logger
    logger: crate::logging::StructuredLogger,
}

impl ModbusClient {
    /// Create a new Modbus client
    pub fn new(config: &ModbusConfig) -> Self {
        let logger = get_logger("modbus");
        Self {
            client: None,
            config: config.clone(),
            connection_timeout: Duration::from_millis(config.connect_timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            logger,
        }
    }

    /// Connect to the Modbus server
    pub async fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.config.ip, self.config.port);

        self.logger
            .info(&format!("Connecting to Modbus server at {}", address));

        let socket_addr: std::net::SocketAddr = address
            .parse()
            .map_err(|e| ArgusError::modbus(format!("Invalid socket address: {}", e)))?;

        match timeout(self.connection_timeout, tcp::connect(socket_addr)).await {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.info("Successfully connected to Modbus server");
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to connect to Modbus server: {}", e);
                self.logger.error(&error_msg);
                Err(ArgusError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Connection timeout".to_string();
                self.logger.error(&error_msg);
                Err(ArgusError::timeout(error_msg))
            }
        }
    }

    /// Disconnect from the Modbus server
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut client) = self.client.take() {
            self.logger.info("Disconnecting from Modbus server");
            if let Err(e) = client.disconnect().await {
                self.logger
                    .debug(&format!("Error during Modbus disconnect: {}", e));
            }
        }
        Ok(())
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Read coils
    pub async fn read_coils(&mut self, slave_id: u8, address: u16, count: u16) -> Result<Vec<bool>> {
        let timeout_duration = self.operation_timeout;

        self.logger.debug(&format!(
            "Reading {} coils from address {} on slave {}",
            count, address, slave_id
        ));

        let client = self.get_client(slave_id)?;
        let request = client.read_coils(address, count);

        Self::finish_read(timeout(timeout_duration, request).await, "read coils")
    }

    /// Read discrete inputs
    pub async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>> {
        let timeout_duration = self.operation_timeout;

        self.logger.debug(&format!(
            "Reading {} discrete inputs from address {} on slave {}",
            count, address, slave_id
        ));

        let client = self.get_client(slave_id)?;
        let request = client.read_discrete_inputs(address, count);

        Self::finish_read(timeout(timeout_duration, request).await, "read discrete inputs")
    }

    /// Read holding registers
    pub async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let timeout_duration = self.operation_timeout;

        self.logger.debug(&format!(
            "Reading {} registers from address {} on slave {}",
            count, address, slave_id
        ));

        let client = self.get_client(slave_id)?;
        let request = client.read_holding_registers(address, count);

        Self::finish_read(timeout(timeout_duration, request).await, "read holding registers")
    }

    /// Read input registers
    pub async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let timeout_duration = self.operation_timeout;

        self.logger.debug(&format!(
            "Reading {} input registers from address {} on slave {}",
            count, address, slave_id
        ));

        let client = self.get_client(slave_id)?;
        let request = client.read_input_registers(address, count);

        Self::finish_read(timeout(timeout_duration, request).await, "read input registers")
    }

    /// Map the layered read outcome (timeout, transport error, device
    /// exception) into one `Result`
    fn finish_read<T>(
        outcome: std::result::Result<
            std::result::Result<std::result::Result<T, tokio_modbus::ExceptionCode>, tokio_modbus::Error>,
            tokio::time::error::Elapsed,
        >,
        what: &str,
    ) -> Result<T> {
        match outcome {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(code))) => Err(ArgusError::exception(format!("{:?}", code))),
            Ok(Err(e)) => Err(ArgusError::modbus(format!("Failed to {}: {}", what, e))),
            Err(_) => Err(ArgusError::timeout(format!("{} timeout", what))),
        }
    }

    /// Get client reference with the unit id applied, or error if not connected
    fn get_client(&mut self, slave_id: u8) -> Result<&mut tokio_modbus::client::Context> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| ArgusError::modbus("Not connected to Modbus server"))?;
        client.set_slave(Slave(slave_id));
        Ok(client)
    }
}

#[async_trait::async_trait]
impl ModbusTransport for ModbusClient {
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn is_connected(&self) -> bool {
        ModbusClient::is_connected(self)
    }

    async fn connect(&mut self) -> Result<()> {
        ModbusClient::connect(self).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        ModbusClient::disconnect(self).await
    }

    async fn read_coils(&mut self, slave_id: u8, address: u16, count: u16) -> Result<Vec<bool>> {
        ModbusClient::read_coils(self, slave_id, address, count).await
    }

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>> {
        ModbusClient::read_discrete_inputs(self, slave_id, address, count).await
    }

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        ModbusClient::read_holding_registers(self, slave_id, address, count).await
    }

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        ModbusClient::read_input_registers(self, slave_id, address, count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModbusConfig;

    #[test]
    fn test_modbus_config() {
        let config = ModbusConfig::default();
        assert_eq!(config.port, 502);
        assert_eq!(config.connect_timeout_ms, 5000);
        assert_eq!(config.operation_timeout_ms, 2000);
    }

    #[test]
    fn test_modbus_client_creation() {
        let config = ModbusConfig::default();
        let client = ModbusClient::new(&config);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_read_without_connect_errors() {
        let config = ModbusConfig::default();
        let mut client = ModbusClient::new(&config);
        let err = client.read_holding_registers(1, 0, 2).await.unwrap_err();
        assert!(err.to_string().contains("Not connected"));
    }
}
