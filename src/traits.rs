// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Shared traits for configuration and kernel dispatch.
//!
//! - [`ValidatableConfig`] - Configuration validation interface
//! - [`GpuDispatchable`] - Route a kernel to its CPU or GPU implementation

use crate::error::Result;
use candle_core::Device;

/// Configuration validation trait.
///
/// # Example
///
/// ```rust
/// use dengww_ops::{CoreError, Result, ValidatableConfig};
///
/// #[derive(Clone)]
/// struct ScaleConfig {
///     factor: f64,
/// }
///
/// impl ValidatableConfig for ScaleConfig {
///     fn validate(&self) -> Result<()> {
///         if !self.factor.is_finite() {
///             return Err(CoreError::invalid_config("factor must be finite"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(ScaleConfig { factor: 2.0 }.validate().is_ok());
/// ```
pub trait ValidatableConfig: Clone + Send + Sync {
    /// Validate the configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if validation fails.
    fn validate(&self) -> Result<()>;
}

/// CPU/GPU dispatch for kernels with both implementations.
///
/// The CPU path runs the crate's native loops; the GPU path composes candle's
/// device kernels. [`GpuDispatchable::dispatch`] picks one from the device the
/// inputs live on.
pub trait GpuDispatchable: Send + Sync {
    /// Input type for the operation.
    type Input;

    /// Output type for the operation.
    type Output;

    /// Execute on a CUDA or Metal device.
    ///
    /// # Errors
    ///
    /// Returns the underlying candle error if a device kernel fails.
    fn dispatch_gpu(&self, input: &Self::Input, device: &Device) -> Result<Self::Output>;

    /// Execute the native CPU implementation.
    ///
    /// # Errors
    ///
    /// Returns appropriate error if operation fails.
    fn dispatch_cpu(&self, input: &Self::Input, device: &Device) -> Result<Self::Output>;

    /// Dispatch to GPU or CPU based on device.
    ///
    /// # Errors
    ///
    /// Propagates errors from the selected implementation.
    fn dispatch(&self, input: &Self::Input, device: &Device) -> Result<Self::Output> {
        match device {
            Device::Cpu => self.dispatch_cpu(input, device),
            Device::Cuda(_) | Device::Metal(_) => self.dispatch_gpu(input, device),
        }
    }
}
