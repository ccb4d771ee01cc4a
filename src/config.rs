//! Configuration management for Argus
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files: the shared Modbus connection, the slave
//! devices polled over it, and the points mapped on each slave.

use crate::error::{ArgusError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_scaling() -> f64 {
    1.0
}

fn default_register_count() -> u16 {
    1
}

fn default_polling_interval_ms() -> u64 {
    5000
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Modbus TCP connection configuration
    pub modbus: ModbusConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Slave devices polled over the shared connection
    #[serde(default)]
    pub slaves: Vec<SlaveConfig>,
}

/// Modbus TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// IP address or hostname of the Modbus gateway
    pub ip: String,

    /// TCP port (typically 502)
    pub port: u16,

    /// Connection timeout in milliseconds
    #[serde(default = "ModbusConfig::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-operation read timeout in milliseconds
    #[serde(default = "ModbusConfig::default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Max reconnect attempts per health check
    #[serde(default = "ModbusConfig::default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Delay between reconnect attempts in milliseconds
    #[serde(default = "ModbusConfig::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl ModbusConfig {
    fn default_connect_timeout_ms() -> u64 {
        5000
    }

    fn default_operation_timeout_ms() -> u64 {
        2000
    }

    fn default_max_retry_attempts() -> u32 {
        3
    }

    fn default_retry_delay_ms() -> u64 {
        500
    }
}

/// One Modbus slave device under poll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveConfig {
    /// Display name, also the registry node name
    pub name: String,

    /// Modbus unit identifier
    pub slave_id: u8,

    /// Polling interval in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Substitute a type-appropriate zero when a poll fails
    #[serde(default)]
    pub zero_on_failed_poll: bool,

    /// Combine the working set into batched read requests
    #[serde(default = "default_true")]
    pub use_batch_polling: bool,

    /// Restrict batched requests to contiguous address ranges
    #[serde(default)]
    pub contiguous_batch_requests_only: bool,

    /// Minimum time between republishing an unchanged value, in
    /// milliseconds; 0 disables suppression
    #[serde(default)]
    pub suppress_non_cov_duration_ms: u64,

    /// Register range probed to assess reachability
    #[serde(default)]
    pub ping_type: PingType,

    /// Register offset probed to assess reachability
    #[serde(default)]
    pub ping_register: u16,

    /// Points mapped on this slave
    #[serde(default)]
    pub points: Vec<PointConfig>,
}

/// One register/coil mapped to a typed value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    /// Display name, also the registry node name
    pub name: String,

    /// Read range this point lives in
    pub point_type: PointType,

    /// Register offset; a point without an offset is never polled
    #[serde(default)]
    pub offset: Option<u16>,

    /// Register count for string-typed points
    #[serde(default = "default_register_count")]
    pub number_of_registers: u16,

    /// Bit index within the register, None for the whole register
    #[serde(default)]
    pub bit: Option<u8>,

    /// Declared data type
    pub data_type: DataType,

    /// Raw values are divided by this factor before publishing
    #[serde(default = "default_scaling")]
    pub scaling: f64,

    /// Added to the scaled value before publishing
    #[serde(default)]
    pub scaling_offset: f64,

    /// Whether the point participates in polling from startup
    #[serde(default = "default_true")]
    pub subscribe: bool,
}

/// Modbus read range of a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    Coil,
    Discrete,
    Holding,
    Input,
}

impl PointType {
    /// Whether this range natively reads single bits
    pub fn is_bit_range(&self) -> bool {
        matches!(self, PointType::Coil | PointType::Discrete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointType::Coil => "coil",
            PointType::Discrete => "discrete",
            PointType::Holding => "holding",
            PointType::Input => "input",
        }
    }
}

/// Register range used by the connectivity probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PingType {
    #[default]
    #[serde(rename = "HOLDING")]
    Holding,
    #[serde(rename = "INPUT")]
    Input,
}

/// Declared data type of a point
///
/// The M10K family is a nonstandard packed form: a 32-bit register pair
/// encoding two base-10000 digit groups, optionally pair-swapped. It has no
/// native transport mapping and is decoded from a 4-byte signed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "INT8")]
    Int8,
    #[serde(rename = "UINT8")]
    Uint8,
    #[serde(rename = "INT16")]
    Int16,
    #[serde(rename = "UINT16")]
    Uint16,
    #[serde(rename = "INT32")]
    Int32,
    #[serde(rename = "UINT32")]
    Uint32,
    #[serde(rename = "FLOAT32")]
    Float32,
    #[serde(rename = "CHARSTRING")]
    CharString,
    #[serde(rename = "INT32M10K")]
    Int32M10k,
    #[serde(rename = "INT32M10KSWAP")]
    Int32M10kSwap,
    #[serde(rename = "UINT32M10K")]
    Uint32M10k,
    #[serde(rename = "UINT32M10KSWAP")]
    Uint32M10kSwap,
}

impl DataType {
    /// Whether the type decodes to a string value
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::CharString)
    }

    /// Whether the type is one of the packed base-10000 forms
    pub fn is_m10k(&self) -> bool {
        matches!(
            self,
            DataType::Int32M10k
                | DataType::Int32M10kSwap
                | DataType::Uint32M10k
                | DataType::Uint32M10kSwap
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level override
    #[serde(default)]
    pub console_level: Option<String>,

    /// Optional file-specific level override
    #[serde(default)]
    pub file_level: Option<String>,

    /// Path to log file or directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            ip: "192.168.1.100".to_string(),
            port: 502,
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            operation_timeout_ms: Self::default_operation_timeout_ms(),
            max_retry_attempts: Self::default_max_retry_attempts(),
            retry_delay_ms: Self::default_retry_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/argus.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            logging: LoggingConfig::default(),
            slaves: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with validation
    pub fn load() -> Result<Self> {
        // Try to load from default locations
        let default_paths = [
            "argus_config.yaml",
            "/data/argus_config.yaml",
            "/etc/argus/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.modbus.ip.is_empty() {
            return Err(ArgusError::validation(
                "modbus.ip",
                "IP address cannot be empty",
            ));
        }

        if self.modbus.port == 0 {
            return Err(ArgusError::validation(
                "modbus.port",
                "Port must be greater than 0",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for slave in &self.slaves {
            if slave.name.is_empty() {
                return Err(ArgusError::validation(
                    "slaves.name",
                    "Slave name cannot be empty",
                ));
            }
            if !seen.insert(slave.name.as_str()) {
                return Err(ArgusError::validation(
                    "slaves.name",
                    "Slave names must be unique",
                ));
            }
            if slave.polling_interval_ms == 0 {
                return Err(ArgusError::validation(
                    "slaves.polling_interval_ms",
                    "Must be greater than 0",
                ));
            }
            for point in &slave.points {
                if point.name.is_empty() {
                    return Err(ArgusError::validation(
                        "points.name",
                        "Point name cannot be empty",
                    ));
                }
                if point.scaling == 0.0 {
                    return Err(ArgusError::validation(
                        "points.scaling",
                        "Scaling factor must be nonzero",
                    ));
                }
                if point.data_type.is_string() && point.number_of_registers == 0 {
                    return Err(ArgusError::validation(
                        "points.number_of_registers",
                        "String points need at least one register",
                    ));
                }
                if let Some(bit) = point.bit
                    && bit > 15
                {
                    return Err(ArgusError::validation(
                        "points.bit",
                        "Bit index must be within a 16-bit register",
                    ));
                }
            }
        }

        Ok(())
    }
}
