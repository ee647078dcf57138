// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Error types for the `dengww` operator library.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CoreError
//! ├── ShapeMismatch          - Input shapes differ
//! ├── DtypeMismatch          - Input is not float32
//! ├── DeviceMismatch         - Inputs live on different devices
//! ├── NonContiguous          - Output buffer is not contiguous
//! ├── MissingSavedTensor     - Saved context does not hold a tensor backward needs
//! ├── UnknownOperator        - Registry lookup failed
//! ├── DuplicateOperator      - Operator name already registered
//! ├── InvalidArguments       - Wrong arity or argument kind in a dynamic call
//! ├── RegistryNotInitialized - Global registry used before `init_registry`
//! ├── InvalidConfig          - Configuration validation failures
//! ├── OutOfMemory            - Output allocation exceeds the memory budget
//! ├── NotImplemented         - No autograd rule / unsupported path
//! └── Candle                 - Underlying Candle errors
//! ```
//!
//! The first three are input-validation failures: they are raised before any
//! computation runs and retrying with the same inputs cannot succeed.
//! `MissingSavedTensor` signals a setup/backward pairing bug and is fatal.

use candle_core::{DType, DeviceLocation};
use thiserror::Error;

/// Result type alias for operator library calls.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by kernels, operators and the registry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Tensor shape mismatch.
    ///
    /// Raised when elementwise inputs (or the output buffer) do not share a shape.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape (the reference input's).
        expected: Vec<usize>,
        /// Actual shape received.
        actual: Vec<usize>,
    },

    /// Element type mismatch.
    ///
    /// The fused operators are defined for float32 tensors only.
    #[error("dtype mismatch: expected {expected:?}, got {actual:?}")]
    DtypeMismatch {
        /// Required dtype.
        expected: DType,
        /// Dtype received.
        actual: DType,
    },

    /// Device mismatch between tensors.
    #[error("device mismatch: expected {expected:?}, got {actual:?}")]
    DeviceMismatch {
        /// Device of the reference input.
        expected: DeviceLocation,
        /// Device of the offending tensor.
        actual: DeviceLocation,
    },

    /// In-place output buffer is not contiguous.
    #[error("{op}: output tensor must be contiguous")]
    NonContiguous {
        /// Operator that rejected the buffer.
        op: String,
    },

    /// Saved context lacks a tensor the backward rule needs.
    #[error("{op}: saved context is missing `{tensor}` required by backward")]
    MissingSavedTensor {
        /// Operator whose backward failed.
        op: String,
        /// Name of the missing saved input.
        tensor: &'static str,
    },

    /// No operator registered under this name.
    #[error("unknown operator: {name}")]
    UnknownOperator {
        /// Name that was looked up.
        name: String,
    },

    /// An operator with this name is already registered.
    #[error("operator already registered: {name}")]
    DuplicateOperator {
        /// Qualified operator name.
        name: String,
    },

    /// Arguments do not match the operator schema.
    #[error("{op}: invalid arguments: {message}")]
    InvalidArguments {
        /// Operator being invoked.
        op: String,
        /// Descriptive error message.
        message: String,
    },

    /// The process-wide registry has not been initialised yet.
    #[error("operator registry not initialised; call init_registry first")]
    RegistryNotInitialized,

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Out of memory.
    ///
    /// Raised when an output allocation would exceed the configured budget.
    #[error("out of memory: {message}")]
    OutOfMemory {
        /// Descriptive error message.
        message: String,
    },

    /// Feature not implemented.
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature.
        feature: String,
    },

    /// Underlying Candle error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

impl CoreError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: impl Into<Vec<usize>>, actual: impl Into<Vec<usize>>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a dtype mismatch error.
    pub fn dtype_mismatch(expected: DType, actual: DType) -> Self {
        Self::DtypeMismatch { expected, actual }
    }

    /// Create a device mismatch error.
    pub fn device_mismatch(expected: DeviceLocation, actual: DeviceLocation) -> Self {
        Self::DeviceMismatch { expected, actual }
    }

    /// Create a missing saved tensor error.
    pub fn missing_saved(op: impl Into<String>, tensor: &'static str) -> Self {
        Self::MissingSavedTensor {
            op: op.into(),
            tensor,
        }
    }

    /// Create an invalid arguments error.
    pub fn invalid_args(op: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArguments {
            op: op.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an out of memory error.
    pub fn oom(msg: impl Into<String>) -> Self {
        Self::OutOfMemory {
            message: msg.into(),
        }
    }

    /// Create a not implemented error.
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Whether this error reports invalid caller input (shape, dtype, device,
    /// layout or argument kind) rather than an internal failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. }
                | Self::DtypeMismatch { .. }
                | Self::DeviceMismatch { .. }
                | Self::NonContiguous { .. }
                | Self::InvalidArguments { .. }
        )
    }
}
