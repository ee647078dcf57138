// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! # dengww-ops
//!
//! Custom tensor operators for the `dengww` namespace, built on candle.
//!
//! - `mymuladd(a, b, c) = a * b + c` with a hand-written backward rule
//! - `mymul(a, b) = a * b`, the kernel that backward rule runs on
//! - `myadd_out(a, b, out)`, which writes `a + b` into `out` in place
//!
//! Each operator comes with an abstract kernel that derives the output
//! signature from shapes, dtypes and devices alone, so tracing and compilation
//! tools can plan a call without touching data.
//!
//! ## Modules
//!
//! - [`ops`] - Operator definitions and typed entry points
//! - [`registry`] - Explicit operator registration and dynamic dispatch
//! - [`kernels`] - Native CPU loops and GPU routing
//! - [`autograd`] - Gradient requests and saved contexts
//! - [`meta`] - Metadata-only tensor signatures
//! - [`error`] - Error types
//! - [`config`], [`device`], [`logging`], [`memory`] - Ambient plumbing
//!
//! ## Quick Start
//!
//! ```rust
//! use candle_core::{Device, Tensor};
//! use dengww_ops::{init_registry, mymuladd, OpsConfig, Result};
//!
//! fn main() -> Result<()> {
//!     let registry = init_registry(&OpsConfig::default())?;
//!     assert!(registry.contains("dengww::mymuladd"));
//!
//!     let a = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu)?;
//!     let b = Tensor::new(&[4f32, 5.0, 6.0], &Device::Cpu)?;
//!     let out = mymuladd(&a, &b, 10.0)?;
//!     assert_eq!(out.to_vec1::<f32>()?, vec![14.0, 20.0, 28.0]);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `cuda` - Enable CUDA tensors through candle
//! - `python` - Build the `dengww_ops` Python extension module

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autograd;
pub mod config;
pub mod device;
pub mod dtype;
pub mod error;
pub mod kernels;
pub mod logging;
pub mod memory;
pub mod meta;
pub mod ops;
pub mod registry;
pub mod traits;

#[cfg(feature = "python")]
pub mod python;

// Re-exports for convenience
pub use autograd::{GradientRequest, SavedContext};
pub use config::{OpsConfig, DEFAULT_NAMESPACE};
pub use device::{get_device, DeviceConfig};
pub use error::{CoreError, Result};
pub use logging::{init_logging, LogConfig, LogLevel};
pub use memory::{estimate_tensor_bytes, MemoryTracker};
pub use meta::TensorMeta;
pub use ops::{myadd_out, mymul, mymuladd, AddOutOp, ArgMeta, FusedOp, MulAddOp, MulOp, Value};
pub use registry::{global_registry, init_registry, GradCall, OpRegistry};
pub use traits::{GpuDispatchable, ValidatableConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
