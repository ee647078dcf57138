// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Device selection with environment variable overrides.
//!
//! The fused kernels run natively on CPU and through candle's device kernels
//! on CUDA (with the `cuda` feature). GPU is preferred when available.
//!
//! ## Environment Variables
//!
//! - `DENGWW_FORCE_CPU` - Set to `1` or `true` to force CPU execution
//! - `DENGWW_CUDA_DEVICE` - Set to device ordinal (e.g., `0`, `1`) to select GPU
//!
//! ## Example
//!
//! ```rust
//! use dengww_ops::{get_device, DeviceConfig};
//!
//! let config = DeviceConfig::new().with_force_cpu(true);
//! let device = get_device(&config)?;
//! assert!(device.is_cpu());
//! # Ok::<(), dengww_ops::CoreError>(())
//! ```

use crate::error::Result;
use candle_core::{Device, DeviceLocation};

/// Environment variable forcing CPU execution.
pub const FORCE_CPU_ENV: &str = "DENGWW_FORCE_CPU";
/// Environment variable selecting the CUDA ordinal.
pub const CUDA_DEVICE_ENV: &str = "DENGWW_CUDA_DEVICE";

/// Configuration for device selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Preferred CUDA device ordinal.
    pub cuda_device: usize,
    /// Force CPU execution (disables GPU).
    pub force_cpu: bool,
}

impl DeviceConfig {
    /// Create a new device configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preferred CUDA device ordinal.
    #[must_use]
    pub fn with_cuda_device(mut self, ordinal: usize) -> Self {
        self.cuda_device = ordinal;
        self
    }

    /// Force CPU execution.
    #[must_use]
    pub fn with_force_cpu(mut self, force: bool) -> Self {
        self.force_cpu = force;
        self
    }

    /// Build configuration from `DENGWW_FORCE_CPU` and `DENGWW_CUDA_DEVICE`.
    ///
    /// Unparseable values are ignored and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(FORCE_CPU_ENV) {
            config.force_cpu = val == "1" || val.eq_ignore_ascii_case("true");
        }

        if let Ok(val) = std::env::var(CUDA_DEVICE_ENV) {
            match val.parse::<usize>() {
                Ok(ordinal) => config.cuda_device = ordinal,
                Err(_) => tracing::warn!(
                    target: "dengww::config",
                    value = %val,
                    "ignoring unparseable {CUDA_DEVICE_ENV}"
                ),
            }
        }

        config
    }
}

/// Get a device according to configuration, preferring CUDA.
///
/// 1. If `force_cpu` is set, returns the CPU device
/// 2. Otherwise, attempts to get the CUDA device at the configured ordinal
/// 3. Falls back to CPU if CUDA is unavailable (or the `cuda` feature is off)
///
/// # Errors
///
/// Returns error only if device creation fails entirely (rare).
pub fn get_device(config: &DeviceConfig) -> Result<Device> {
    if config.force_cpu {
        tracing::info!(target: "dengww::device", "CPU device forced via configuration");
        return Ok(Device::Cpu);
    }

    match Device::cuda_if_available(config.cuda_device) {
        Ok(Device::Cuda(cuda)) => {
            tracing::info!(
                target: "dengww::device",
                ordinal = config.cuda_device,
                "using CUDA device"
            );
            Ok(Device::Cuda(cuda))
        }
        Ok(Device::Cpu) | Err(_) => {
            tracing::info!(
                target: "dengww::device",
                "CUDA not available, running native CPU kernels"
            );
            Ok(Device::Cpu)
        }
        Ok(device) => Ok(device),
    }
}

/// Short label for a device location ("cpu", "cuda:0", "metal:0"), used as a
/// structured logging field.
#[must_use]
pub fn location_label(location: DeviceLocation) -> String {
    match location {
        DeviceLocation::Cpu => "cpu".to_string(),
        DeviceLocation::Cuda { gpu_id } => format!("cuda:{gpu_id}"),
        DeviceLocation::Metal { gpu_id } => format!("metal:{gpu_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_config_default() {
        let config = DeviceConfig::default();
        assert_eq!(config.cuda_device, 0);
        assert!(!config.force_cpu);
    }

    #[test]
    fn test_device_config_builder() {
        let config = DeviceConfig::new().with_cuda_device(1).with_force_cpu(true);
        assert_eq!(config.cuda_device, 1);
        assert!(config.force_cpu);
    }

    #[test]
    fn test_force_cpu_returns_cpu() {
        let config = DeviceConfig::new().with_force_cpu(true);
        let device = get_device(&config).unwrap();
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_location_label() {
        assert_eq!(location_label(DeviceLocation::Cpu), "cpu");
        assert_eq!(location_label(DeviceLocation::Cuda { gpu_id: 2 }), "cuda:2");
    }
}
