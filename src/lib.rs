//! # Argus - Modbus Fleet Poller
//!
//! A Rust bridge between a fleet of Modbus slave devices and a supervisory
//! device registry, periodically polling registers and coils and
//! republishing decoded values only when they materially change.
//!
//! ## Features
//!
//! - **Async-first**: one polling task per slave on the Tokio runtime
//! - **Shared transport**: any number of slaves over one Modbus TCP
//!   connection, strictly serialized by a single transport lock
//! - **Batch or per-point reads**: working sets merge into as few wire
//!   requests as possible, optionally restricted to contiguous ranges
//! - **Rich decoding**: native integer/float/string codecs, bit expansion,
//!   and the packed base-10000 (M10K) register-pair encodings
//! - **Change suppression**: unchanged values republish only after a
//!   configurable heartbeat duration
//! - **Failure handling**: probes, status transitions, zero fallbacks, and
//!   supervised reconnection; a failed poll never crashes a cycle
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of
//! concerns:
//!
//! - `config`: configuration management and validation
//! - `logging`: structured logging and tracing
//! - `modbus`: Modbus TCP client for the shared fleet connection
//! - `connection`: transport ownership, slave task lifecycle, reconnection
//! - `poller`: per-slave scheduling, locators, decoding, suppression
//! - `registry`: the device-registry seam values are published through

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod poller;
pub mod registry;

// Re-export commonly used types
pub use config::Config;
pub use connection::ModbusConnection;
pub use error::{ArgusError, Result};
pub use poller::SlavePoller;
pub use registry::{DeviceRegistry, MemoryRegistry};
