//! Device registry interface
//!
//! The registry is the external collaborator that owns the supervisory node
//! tree: it holds slave/point configuration, persists decoded values, and
//! republishes them to downstream subscribers. The core only writes values,
//! value kinds, and status transitions through the [`DeviceRegistry`] trait.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use tokio::sync::broadcast;

/// A decoded point value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Bit expansion of a boolean-typed whole-register read, little end first
    Bits(Vec<bool>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::Bits(_) => ValueKind::Bits,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bits(bits) => {
                let s: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
                write!(f, "{}", s)
            }
        }
    }
}

/// Representation kind of a point value in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    Text,
    Bits,
}

/// Reachability status of a slave device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveStatus {
    SettingUp,
    Ready,
    PingFailed,
    ConnDown,
}

impl fmt::Display for SlaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlaveStatus::SettingUp => "Setting up",
            SlaveStatus::Ready => "Ready",
            SlaveStatus::PingFailed => "Ping Failed",
            SlaveStatus::ConnDown => "Connection Down",
        };
        write!(f, "{}", s)
    }
}

/// Writes from the core into the registry
#[async_trait::async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Publish a decoded or fallback value for a point
    async fn update_value(&self, slave: &str, point: &str, value: Value);

    /// Change the representation kind of a point ahead of a value write
    async fn update_value_kind(&self, slave: &str, point: &str, kind: ValueKind);

    /// Publish a slave status transition
    async fn update_status(&self, slave: &str, status: SlaveStatus);

    /// Structural move of a slave node; values are untouched
    async fn rename_slave(&self, old: &str, new: &str);
}

/// Events republished to downstream subscribers
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Value {
        slave: String,
        point: String,
        value: Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Kind {
        slave: String,
        point: String,
        kind: ValueKind,
    },
    Status {
        slave: String,
        status: SlaveStatus,
    },
    Renamed {
        old: String,
        new: String,
    },
}

/// In-memory registry with a broadcast event stream
///
/// Stands in for the supervisory node tree in the binary and in tests;
/// persists the latest value/kind/status per node and fans every write out
/// to subscribers.
pub struct MemoryRegistry {
    values: RwLock<HashMap<(String, String), Value>>,
    kinds: RwLock<HashMap<(String, String), ValueKind>>,
    statuses: RwLock<HashMap<String, SlaveStatus>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            values: RwLock::new(HashMap::new()),
            kinds: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to the registry event stream
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Latest published value for a point, if any
    pub fn value(&self, slave: &str, point: &str) -> Option<Value> {
        self.values
            .read()
            .ok()?
            .get(&(slave.to_string(), point.to_string()))
            .cloned()
    }

    /// Latest representation kind for a point, if any
    pub fn kind(&self, slave: &str, point: &str) -> Option<ValueKind> {
        self.kinds
            .read()
            .ok()?
            .get(&(slave.to_string(), point.to_string()))
            .copied()
    }

    /// Latest status for a slave, if any
    pub fn status(&self, slave: &str) -> Option<SlaveStatus> {
        self.statuses.read().ok()?.get(slave).copied()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceRegistry for MemoryRegistry {
    async fn update_value(&self, slave: &str, point: &str, value: Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert((slave.to_string(), point.to_string()), value.clone());
        }
        let _ = self.events.send(RegistryEvent::Value {
            slave: slave.to_string(),
            point: point.to_string(),
            value,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn update_value_kind(&self, slave: &str, point: &str, kind: ValueKind) {
        if let Ok(mut kinds) = self.kinds.write() {
            kinds.insert((slave.to_string(), point.to_string()), kind);
        }
        let _ = self.events.send(RegistryEvent::Kind {
            slave: slave.to_string(),
            point: point.to_string(),
            kind,
        });
    }

    async fn update_status(&self, slave: &str, status: SlaveStatus) {
        if let Ok(mut statuses) = self.statuses.write() {
            statuses.insert(slave.to_string(), status);
        }
        let _ = self.events.send(RegistryEvent::Status {
            slave: slave.to_string(),
            status,
        });
    }

    async fn rename_slave(&self, old: &str, new: &str) {
        if let Ok(mut values) = self.values.write() {
            let moved: Vec<_> = values
                .keys()
                .filter(|(s, _)| s == old)
                .cloned()
                .collect();
            for key in moved {
                if let Some(v) = values.remove(&key) {
                    values.insert((new.to_string(), key.1), v);
                }
            }
        }
        if let Ok(mut kinds) = self.kinds.write() {
            let moved: Vec<_> = kinds.keys().filter(|(s, _)| s == old).cloned().collect();
            for key in moved {
                if let Some(k) = kinds.remove(&key) {
                    kinds.insert((new.to_string(), key.1), k);
                }
            }
        }
        if let Ok(mut statuses) = self.statuses.write()
            && let Some(status) = statuses.remove(old)
        {
            statuses.insert(new.to_string(), status);
        }
        let _ = self.events.send(RegistryEvent::Renamed {
            old: old.to_string(),
            new: new.to_string(),
        });
    }
}
