// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Registry configuration.
//!
//! ## Environment Variables
//!
//! - `DENGWW_NAMESPACE` - Operator namespace (default `dengww`)
//! - `DENGWW_MEMORY_LIMIT` - Output allocation budget in bytes (0 = unlimited)
//! - plus the device variables read by [`DeviceConfig::from_env`]

use crate::device::DeviceConfig;
use crate::error::{CoreError, Result};
use crate::traits::ValidatableConfig;

/// Namespace the built-in operators are registered under.
pub const DEFAULT_NAMESPACE: &str = "dengww";

/// Environment variable overriding the namespace.
pub const NAMESPACE_ENV: &str = "DENGWW_NAMESPACE";
/// Environment variable setting the memory budget.
pub const MEMORY_LIMIT_ENV: &str = "DENGWW_MEMORY_LIMIT";

/// Configuration for an [`OpRegistry`](crate::OpRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpsConfig {
    /// Namespace prefix of qualified operator names (`namespace::op`).
    pub namespace: String,
    /// Device selection behind [`OpRegistry::device`](crate::OpRegistry::device).
    pub device: DeviceConfig,
    /// Output allocation budget in bytes (0 = unlimited).
    pub memory_limit: usize,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            device: DeviceConfig::default(),
            memory_limit: 0,
        }
    }
}

impl OpsConfig {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operator namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the device configuration.
    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Set the output allocation budget in bytes.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Build configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if `DENGWW_MEMORY_LIMIT` is not an
    /// integer or the resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            device: DeviceConfig::from_env(),
            ..Self::default()
        };

        if let Ok(namespace) = std::env::var(NAMESPACE_ENV) {
            config.namespace = namespace;
        }

        if let Ok(limit) = std::env::var(MEMORY_LIMIT_ENV) {
            config.memory_limit = limit.trim().parse().map_err(|_| {
                CoreError::invalid_config(format!("{MEMORY_LIMIT_ENV} must be a byte count, got {limit:?}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ValidatableConfig for OpsConfig {
    fn validate(&self) -> Result<()> {
        let mut chars = self.namespace.chars();
        let Some(first) = chars.next() else {
            return Err(CoreError::invalid_config("namespace must not be empty"));
        };
        if !(first.is_ascii_alphabetic() || first == '_')
            || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CoreError::invalid_config(format!(
                "namespace must be an identifier ([A-Za-z_][A-Za-z0-9_]*), got {:?}",
                self.namespace
            )));
        }
        Ok(())
    }
}
