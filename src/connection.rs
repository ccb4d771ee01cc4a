//! Shared connection management
//!
//! One `ModbusConnection` owns the transport shared by a fleet of slaves:
//! it spawns and stops the per-slave polling tasks, serializes all transport
//! access through a single lock, and runs the health supervisor that
//! reconnects the transport and reinitializes the slaves after an outage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::{ModbusConfig, SlaveConfig};
use crate::error::{ArgusError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::modbus::ModbusClient;
use crate::poller::transport_like::SharedTransport;
use crate::poller::{EditParams, SlaveCommand, SlavePoller};
use crate::registry::DeviceRegistry;

/// Handle to one running slave poller task
pub struct SlaveHandle {
    commands: mpsc::UnboundedSender<SlaveCommand>,
    task: JoinHandle<()>,
}

impl SlaveHandle {
    /// Send a command to the poller; applied between its cycles
    pub fn send(&self, command: SlaveCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ArgusError::generic("Slave poller is no longer running"))
    }
}

type SlaveMap = Arc<StdMutex<HashMap<String, SlaveHandle>>>;

/// A fleet of slaves polled over one shared Modbus transport
pub struct ModbusConnection {
    transport: SharedTransport,
    registry: Arc<dyn DeviceRegistry>,
    slaves: SlaveMap,
    health_tx: mpsc::UnboundedSender<()>,
    health_task: JoinHandle<()>,
    logger: StructuredLogger,
}

impl ModbusConnection {
    /// Establish the shared transport and start the health supervisor.
    ///
    /// A failed initial connect is not fatal: slaves report Connection Down
    /// and the supervisor keeps retrying on their health-check requests.
    pub async fn connect(
        config: &ModbusConfig,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Result<Self> {
        let logger = get_logger("connection");

        let mut client = ModbusClient::new(config);
        if let Err(e) = client.connect().await {
            logger.warn(&format!(
                "Initial Modbus connect failed, continuing without transport: {}",
                e
            ));
        }

        let transport: SharedTransport = Arc::new(Mutex::new(Box::new(client)));
        Ok(Self::from_parts(
            transport,
            registry,
            config.max_retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        ))
    }

    /// Assemble a connection around an existing transport. Used by
    /// [`Self::connect`] and by tests that substitute a mock transport.
    pub fn from_parts(
        transport: SharedTransport,
        registry: Arc<dyn DeviceRegistry>,
        max_retry_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        let logger = get_logger("connection");
        let slaves: SlaveMap = Arc::new(StdMutex::new(HashMap::new()));

        let (health_tx, health_rx) = mpsc::unbounded_channel();
        let health_task = tokio::spawn(Self::health_supervisor(
            transport.clone(),
            health_rx,
            slaves.clone(),
            max_retry_attempts,
            retry_delay,
            logger.clone(),
        ));

        Self {
            transport,
            registry,
            slaves,
            health_tx,
            health_task,
            logger,
        }
    }

    /// Spawn the polling task for a slave
    pub fn add_slave(&self, config: &SlaveConfig) -> Result<()> {
        let mut slaves = self
            .slaves
            .lock()
            .map_err(|_| ArgusError::generic("Slave map lock poisoned"))?;
        if slaves.contains_key(&config.name) {
            return Err(ArgusError::config(format!(
                "Slave '{}' already attached",
                config.name
            )));
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let poller = SlavePoller::new(
            config,
            self.transport.clone(),
            self.registry.clone(),
            self.health_tx.clone(),
            commands_rx,
        );
        let task = tokio::spawn(poller.run());

        slaves.insert(
            config.name.clone(),
            SlaveHandle {
                commands: commands_tx,
                task,
            },
        );
        self.logger
            .info(&format!("Attached slave '{}'", config.name));
        Ok(())
    }

    /// Stop one slave's polling task; its next cycle never starts
    pub async fn remove_slave(&self, name: &str) -> Result<()> {
        let handle = {
            let mut slaves = self
                .slaves
                .lock()
                .map_err(|_| ArgusError::generic("Slave map lock poisoned"))?;
            slaves.remove(name)
        };
        let Some(handle) = handle else {
            return Err(ArgusError::config(format!("Unknown slave '{}'", name)));
        };
        let _ = handle.send(SlaveCommand::Shutdown);
        let _ = handle.task.await;
        self.logger.info(&format!("Detached slave '{}'", name));
        Ok(())
    }

    /// Registry edit entrypoint: full attribute replace, applied between
    /// cycles. A changed name rekeys the handle; the poller delegates the
    /// structural move to the registry itself.
    pub fn edit_slave(&self, name: &str, params: EditParams) -> Result<()> {
        let mut slaves = self
            .slaves
            .lock()
            .map_err(|_| ArgusError::generic("Slave map lock poisoned"))?;

        let new_name = params.name.clone();
        {
            let handle = slaves
                .get(name)
                .ok_or_else(|| ArgusError::config(format!("Unknown slave '{}'", name)))?;
            handle.send(SlaveCommand::Edit(params))?;
        }

        if new_name != name
            && let Some(handle) = slaves.remove(name)
        {
            slaves.insert(new_name, handle);
        }
        Ok(())
    }

    /// Add a point to a slave's subscribed set
    pub fn subscribe_point(&self, slave: &str, point: crate::config::PointConfig) -> Result<()> {
        self.with_slave(slave, SlaveCommand::Subscribe(point))
    }

    /// Remove a point from a slave's subscribed set
    pub fn unsubscribe_point(&self, slave: &str, point: &str) -> Result<()> {
        self.with_slave(slave, SlaveCommand::Unsubscribe(point.to_string()))
    }

    fn with_slave(&self, name: &str, command: SlaveCommand) -> Result<()> {
        let slaves = self
            .slaves
            .lock()
            .map_err(|_| ArgusError::generic("Slave map lock poisoned"))?;
        let handle = slaves
            .get(name)
            .ok_or_else(|| ArgusError::config(format!("Unknown slave '{}'", name)))?;
        handle.send(command)
    }

    /// Request an asynchronous connection-health recheck
    pub fn request_health_check(&self) {
        let _ = self.health_tx.send(());
    }

    /// Stop every slave task, then release the transport
    pub async fn shutdown(self) -> Result<()> {
        self.logger.info("Stopping connection");

        let handles: Vec<SlaveHandle> = {
            let mut slaves = self
                .slaves
                .lock()
                .map_err(|_| ArgusError::generic("Slave map lock poisoned"))?;
            slaves.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            let _ = handle.send(SlaveCommand::Shutdown);
        }
        for handle in handles {
            let _ = handle.task.await;
        }

        self.health_task.abort();

        let mut transport = self.transport.lock().await;
        transport.disconnect().await?;
        self.logger.info("Connection stopped");
        Ok(())
    }

    /// Reconnects the shared transport on request and reinitializes the
    /// slaves once it is back
    async fn health_supervisor(
        transport: SharedTransport,
        mut health_rx: mpsc::UnboundedReceiver<()>,
        slaves: SlaveMap,
        max_retry_attempts: u32,
        retry_delay: Duration,
        logger: StructuredLogger,
    ) {
        while health_rx.recv().await.is_some() {
            // Coalesce the burst of requests one failed cycle produces
            while health_rx.try_recv().is_ok() {}

            let reconnected = {
                let mut transport = transport.lock().await;
                if transport.is_connected() {
                    false
                } else {
                    let mut attempts = 0;
                    loop {
                        match transport.connect().await {
                            Ok(()) => break true,
                            Err(e) => {
                                attempts += 1;
                                logger.warn(&format!(
                                    "Connection attempt {} failed: {}",
                                    attempts, e
                                ));
                                if attempts >= max_retry_attempts {
                                    break false;
                                }
                                sleep(retry_delay).await;
                            }
                        }
                    }
                }
            };

            if reconnected {
                logger.info("Transport reconnected, reinitializing slaves");
                let commands: Vec<_> = slaves
                    .lock()
                    .map(|map| map.values().map(|h| h.commands.clone()).collect())
                    .unwrap_or_default();
                for tx in commands {
                    let _ = tx.send(SlaveCommand::Reinitialize);
                }
            }
        }
    }
}
