//! Error types and handling for Argus
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Argus operations
pub type Result<T> = std::result::Result<T, ArgusError>;

/// Main error type for Argus
#[derive(Debug, Error)]
pub enum ArgusError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Modbus transport errors (connection loss, malformed response)
    #[error("Modbus error: {message}")]
    Modbus { message: String },

    /// Device-reported protocol exception responses
    #[error("Device exception: {message}")]
    Exception { message: String },

    /// Device registry errors
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl ArgusError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ArgusError::Config {
            message: message.into(),
        }
    }

    /// Create a new Modbus transport error
    pub fn modbus<S: Into<String>>(message: S) -> Self {
        ArgusError::Modbus {
            message: message.into(),
        }
    }

    /// Create a new device-exception error
    pub fn exception<S: Into<String>>(message: S) -> Self {
        ArgusError::Exception {
            message: message.into(),
        }
    }

    /// Create a new registry error
    pub fn registry<S: Into<String>>(message: S) -> Self {
        ArgusError::Registry {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ArgusError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ArgusError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        ArgusError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        ArgusError::Generic {
            message: message.into(),
        }
    }

    /// Whether this error indicates the transport itself failed (as opposed
    /// to a device-level exception response)
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            ArgusError::Modbus { .. } | ArgusError::Timeout { .. } | ArgusError::Io { .. }
        )
    }
}

impl From<std::io::Error> for ArgusError {
    fn from(err: std::io::Error) -> Self {
        ArgusError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ArgusError {
    fn from(err: serde_yaml::Error) -> Self {
        ArgusError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ArgusError {
    fn from(err: serde_json::Error) -> Self {
        ArgusError::Serialization {
            message: err.to_string(),
        }
    }
}
