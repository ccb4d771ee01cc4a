//! Per-slave poll scheduling and value publishing
//!
//! One `SlavePoller` task runs per slave device: it wakes on the configured
//! interval, probes reachability when needed, reads the subscribed points
//! (batched or individually) through the shared transport lock, decodes raw
//! registers, and republishes values to the device registry subject to the
//! change-suppression policy. External mutations (attribute edits,
//! subscription changes, shutdown) arrive on a command channel and are
//! applied between cycles, so cycles for one slave never overlap.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::{PingType, PointConfig, SlaveConfig};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::registry::{DeviceRegistry, SlaveStatus, Value, ValueKind};

pub(crate) mod batch;
mod cycle;
pub mod decode;
pub mod locator;
mod probe;
pub(crate) mod suppress;
pub mod transport_like;


use transport_like::SharedTransport;

/// Attribute set applied atomically by the registry's edit entrypoint.
/// Durations arrive in seconds and are converted to milliseconds internally.
#[derive(Debug, Clone)]
pub struct EditParams {
    pub name: String,
    pub slave_id: u8,
    pub polling_interval_secs: f64,
    pub zero_on_failed_poll: bool,
    pub use_batch_polling: bool,
    pub contiguous_batch_requests_only: bool,
    pub suppress_non_cov_duration_secs: f64,
    pub ping_type: PingType,
    pub ping_register: u16,
}

/// Commands accepted by a slave poller from external components
#[derive(Debug, Clone)]
pub enum SlaveCommand {
    Edit(EditParams),
    Subscribe(PointConfig),
    Unsubscribe(String),
    /// Transport came back after an outage; start over from Setting up
    Reinitialize,
    Shutdown,
}

/// Periodic poller for one slave device
pub struct SlavePoller {
    /// Registry node name
    name: String,

    /// Modbus unit identifier
    slave_id: u8,

    /// Polling interval in milliseconds
    interval_in_ms: u64,

    /// Substitute type-appropriate zeros on failed polls
    zero_on_failed_poll: bool,

    /// Combine the working set into batched requests
    use_batch_polling: bool,

    /// Restrict batched requests to contiguous address ranges
    contiguous_batch_requests_only: bool,

    /// Minimum time between republishing an unchanged value
    suppress_non_cov_duration: Duration,

    /// Probe address
    ping_type: PingType,
    ping_register: u16,

    /// Shared transport, serialized with every other slave on the connection
    transport: SharedTransport,

    /// Registry receiving values and status transitions
    registry: Arc<dyn DeviceRegistry>,

    /// Connection-health recheck requests
    health_tx: mpsc::UnboundedSender<()>,

    /// Most recent probe/read outcome
    status: SlaveStatus,

    /// Currently subscribed points, iterated in name order
    subscribed: BTreeMap<String, PointConfig>,

    /// Registry representation kind per point
    point_kinds: HashMap<String, ValueKind>,

    /// Last published value per point
    last_values: HashMap<String, Value>,

    /// Last publish timestamp per point
    last_updates: HashMap<String, Instant>,

    /// Command receiver for external control
    commands_rx: mpsc::UnboundedReceiver<SlaveCommand>,

    /// Logger with slave context
    logger: StructuredLogger,
}

impl SlavePoller {
    /// Create a poller for one slave; points flagged for subscription in the
    /// configuration form the initial working set.
    pub fn new(
        config: &SlaveConfig,
        transport: SharedTransport,
        registry: Arc<dyn DeviceRegistry>,
        health_tx: mpsc::UnboundedSender<()>,
        commands_rx: mpsc::UnboundedReceiver<SlaveCommand>,
    ) -> Self {
        let logger =
            get_logger_with_context(LogContext::new("poller").with_slave(config.name.clone()));

        let mut poller = Self {
            name: config.name.clone(),
            slave_id: config.slave_id,
            interval_in_ms: config.polling_interval_ms,
            zero_on_failed_poll: config.zero_on_failed_poll,
            use_batch_polling: config.use_batch_polling,
            contiguous_batch_requests_only: config.contiguous_batch_requests_only,
            suppress_non_cov_duration: Duration::from_millis(config.suppress_non_cov_duration_ms),
            ping_type: config.ping_type,
            ping_register: config.ping_register,
            transport,
            registry,
            health_tx,
            status: SlaveStatus::SettingUp,
            subscribed: BTreeMap::new(),
            point_kinds: HashMap::new(),
            last_values: HashMap::new(),
            last_updates: HashMap::new(),
            commands_rx,
            logger,
        };

        for point in &config.points {
            if point.subscribe {
                poller.add_to_sub(point.clone());
            }
        }

        poller
    }

    /// Run the poller main loop until shutdown
    pub async fn run(mut self) {
        self.logger.info(&format!(
            "Starting poller (interval: {} ms, batch: {})",
            self.interval_in_ms, self.use_batch_polling
        ));

        self.registry.update_status(&self.name, self.status).await;
        self.probe().await;

        let mut ticker = interval(Duration::from_millis(self.interval_in_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_cycle().await;
                }
                cmd = self.commands_rx.recv() => {
                    match cmd {
                        Some(SlaveCommand::Edit(params)) => {
                            let old_interval = self.interval_in_ms;
                            self.apply_edit(params).await;
                            if self.interval_in_ms != old_interval {
                                ticker =
                                    interval(Duration::from_millis(self.interval_in_ms.max(1)));
                                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            }
                        }
                        Some(SlaveCommand::Subscribe(point)) => self.add_to_sub(point),
                        Some(SlaveCommand::Unsubscribe(name)) => self.remove_from_sub(&name),
                        Some(SlaveCommand::Reinitialize) => {
                            self.set_status(SlaveStatus::SettingUp).await;
                            self.probe().await;
                        }
                        Some(SlaveCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        self.logger.info("Poller stopped");
    }

    /// Replace the slave's attribute set; a changed name is delegated to the
    /// registry as a structural move.
    pub(crate) async fn apply_edit(&mut self, params: EditParams) {
        self.slave_id = params.slave_id;
        self.interval_in_ms = (params.polling_interval_secs * 1000.0) as u64;
        self.zero_on_failed_poll = params.zero_on_failed_poll;
        self.use_batch_polling = params.use_batch_polling;
        self.contiguous_batch_requests_only = params.contiguous_batch_requests_only;
        self.suppress_non_cov_duration =
            Duration::from_millis((params.suppress_non_cov_duration_secs * 1000.0) as u64);
        self.ping_type = params.ping_type;
        self.ping_register = params.ping_register;

        if params.name != self.name {
            self.registry.rename_slave(&self.name, &params.name).await;
            self.logger
                .info(&format!("Renamed slave {} -> {}", self.name, params.name));
            self.name = params.name;
            self.logger =
                get_logger_with_context(LogContext::new("poller").with_slave(self.name.clone()));
        }

        self.probe().await;
    }

    /// Add a point to the subscribed set, effective next cycle
    pub(crate) fn add_to_sub(&mut self, point: PointConfig) {
        self.point_kinds
            .entry(point.name.clone())
            .or_insert_with(|| decode::default_kind(point.data_type));
        self.subscribed.insert(point.name.clone(), point);
    }

    /// Remove a point from the subscribed set, effective next cycle
    pub(crate) fn remove_from_sub(&mut self, name: &str) {
        self.subscribed.remove(name);
    }

    pub(crate) fn none_subscribed(&self) -> bool {
        self.subscribed.is_empty()
    }

    /// Current status from the most recent probe/read outcome
    pub fn status(&self) -> SlaveStatus {
        self.status
    }

    /// Registry node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a status transition and publish it to the registry
    pub(crate) async fn set_status(&mut self, status: SlaveStatus) {
        if self.status != status {
            self.status = status;
            self.registry.update_status(&self.name, status).await;
        }
    }
}
