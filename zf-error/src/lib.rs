//! Unified error handling for Zonefan
//!
//! This crate provides the single error type used across all Zonefan components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using ZonefanError
pub type Result<T> = std::result::Result<T, ZonefanError>;

/// Unified error type for all Zonefan operations
#[derive(thiserror::Error, Debug)]
pub enum ZonefanError {
    // ============================================================================
    // I/O and Subprocess Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to run {tool}: {source}")]
    CommandSpawn {
        tool: String,
        source: io::Error,
    },

    #[error("{tool} exited with an error: {detail}")]
    CommandFailed {
        tool: String,
        detail: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Invalid fan percentage: {value} (must be 0.0-100.0)")]
    InvalidPercentage {
        value: f64,
    },

    #[error("Invalid temperature threshold: {value}°C")]
    InvalidThreshold {
        value: f64,
    },

    // ============================================================================
    // Control Lifecycle Errors
    // ============================================================================
    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Temperature sampling failed: {0}")]
    Sample(String),

    #[error("Fan duty write failed on zones {zones:?}: {reason}")]
    ActuatorWrite {
        zones: Vec<u8>,
        reason: String,
    },

    #[error("Failed to restore default fan preset: {0}")]
    Restore(String),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),
}

impl ZonefanError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an initialization error from a string
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a sampling error from a string
    pub fn sample(msg: impl Into<String>) -> Self {
        Self::Sample(msg.into())
    }

    /// Create a preset-restore error from a string
    pub fn restore(msg: impl Into<String>) -> Self {
        Self::Restore(msg.into())
    }
}
