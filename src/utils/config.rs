//! Session configuration with JSON file round-trip

use crate::core::constants::{
    DEFAULT_HOST_TTL_SECONDS, MAX_HOST_TTL_SECONDS, MIN_HOST_TTL_SECONDS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Plane detection behavior requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaneFindingMode {
    Disabled,
    Horizontal,
    Vertical,
    HorizontalAndVertical,
}

/// Depth estimation behavior requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DepthMode {
    /// Use depth when the device supports it
    Automatic,
    Disabled,
}

/// Tunable parameters for an anchor session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Time-to-live applied to hosted anchors (seconds)
    pub host_ttl_seconds: u32,
    /// Plane detection mode
    pub plane_finding: PlaneFindingMode,
    /// Whether earth-relative localization is requested
    pub geospatial_enabled: bool,
    /// Whether cloud anchor hosting/resolving is requested
    pub cloud_anchors_enabled: bool,
    /// Depth estimation mode
    pub depth_mode: DepthMode,
    /// Optional watchdog for outstanding cloud requests (seconds)
    pub request_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host_ttl_seconds: DEFAULT_HOST_TTL_SECONDS,
            plane_finding: PlaneFindingMode::Horizontal,
            geospatial_enabled: true,
            cloud_anchors_enabled: true,
            depth_mode: DepthMode::Automatic,
            request_timeout_secs: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: SessionConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    /// Check that every parameter is inside its supported range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_HOST_TTL_SECONDS..=MAX_HOST_TTL_SECONDS).contains(&self.host_ttl_seconds) {
            return Err(ConfigError::InvalidParameter {
                parameter: "host_ttl_seconds".to_string(),
                value: self.host_ttl_seconds.to_string(),
                reason: format!(
                    "ttl must be between {} and {} seconds",
                    MIN_HOST_TTL_SECONDS, MAX_HOST_TTL_SECONDS
                ),
            });
        }

        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "watchdog timeout must be positive; omit it to disable".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Parameter outside its supported range
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// Configuration file I/O error
    IoError { message: String },
    /// JSON serialization/deserialization error
    SerializationError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::IoError { message } => write!(f, "I/O error: {}", message),
            ConfigError::SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
