use crate::error::Result;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Read side of a Modbus transport, mockable for tests.
///
/// All four read ranges take the unit id per call; the shared connection is
/// serialized by [`SharedTransport`]'s mutex, one in-flight request at a time.
#[async_trait::async_trait]
pub trait ModbusTransport: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether the underlying transport is currently established
    fn is_connected(&self) -> bool;

    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    async fn read_coils(&mut self, slave_id: u8, address: u16, count: u16) -> Result<Vec<bool>>;

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>>;

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;
}

/// One transport lock per connection, shared by every slave polled over it.
/// Held for the duration of each read operation, batched or single.
pub type SharedTransport = Arc<Mutex<Box<dyn ModbusTransport>>>;
