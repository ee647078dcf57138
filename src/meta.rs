// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Tensor metadata and the shared input validation routine.
//!
//! The abstract kernels used for tracing and the concrete kernels both funnel
//! through [`check_elementwise`], so the two paths cannot disagree about which
//! inputs are valid. Abstract kernels work on [`TensorMeta`] alone and never
//! touch element storage.

use crate::dtype::ensure_f32;
use crate::error::{CoreError, Result};
use candle_core::{DType, DeviceLocation, Shape, Tensor};

/// Shape, dtype and device of a tensor, without its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMeta {
    shape: Shape,
    dtype: DType,
    location: DeviceLocation,
}

impl TensorMeta {
    /// Build metadata directly, e.g. for tracing a graph before any tensor exists.
    ///
    /// ```rust
    /// use dengww_ops::TensorMeta;
    /// use candle_core::{DType, DeviceLocation};
    ///
    /// let meta = TensorMeta::new(vec![2, 3], DType::F32, DeviceLocation::Cpu);
    /// assert_eq!(meta.elem_count(), 6);
    /// ```
    pub fn new(shape: impl Into<Shape>, dtype: DType, location: DeviceLocation) -> Self {
        Self {
            shape: shape.into(),
            dtype,
            location,
        }
    }

    /// Read the metadata of an existing tensor.
    #[must_use]
    pub fn of(tensor: &Tensor) -> Self {
        Self {
            shape: tensor.shape().clone(),
            dtype: tensor.dtype(),
            location: tensor.device().location(),
        }
    }

    /// Tensor shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Tensor dimensions.
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Element type.
    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device placement.
    #[must_use]
    pub fn location(&self) -> DeviceLocation {
        self.location
    }

    /// Number of elements.
    #[must_use]
    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }
}

/// Validate the inputs of an elementwise operator against a reference input.
///
/// Checks run in a fixed order: every shape, then every dtype (reference first),
/// then every device. The first failing check is reported.
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch`.
pub fn check_elementwise(reference: &TensorMeta, others: &[&TensorMeta]) -> Result<()> {
    for other in others {
        if other.shape != reference.shape {
            return Err(CoreError::shape_mismatch(reference.dims(), other.dims()));
        }
    }

    ensure_f32(reference.dtype)?;
    for other in others {
        ensure_f32(other.dtype)?;
    }

    for other in others {
        if other.location != reference.location {
            return Err(CoreError::device_mismatch(
                reference.location,
                other.location,
            ));
        }
    }

    Ok(())
}

/// Abstract kernel for `mymuladd(a, b, c)`: the output signature equals `a`'s.
///
/// `c` does not influence the signature; it is accepted so the abstract call
/// mirrors the concrete one.
///
/// # Errors
///
/// Same as [`check_elementwise`].
pub fn mul_add_signature(a: &TensorMeta, b: &TensorMeta, _c: f64) -> Result<TensorMeta> {
    check_elementwise(a, &[b])?;
    Ok(a.clone())
}

/// Abstract kernel for `mymul(a, b)`.
///
/// # Errors
///
/// Same as [`check_elementwise`].
pub fn mul_signature(a: &TensorMeta, b: &TensorMeta) -> Result<TensorMeta> {
    check_elementwise(a, &[b])?;
    Ok(a.clone())
}

/// Abstract check for `myadd_out(a, b, out)`, which produces no new tensor.
///
/// # Errors
///
/// Same as [`check_elementwise`], applied to all three tensors.
pub fn add_out_check(a: &TensorMeta, b: &TensorMeta, out: &TensorMeta) -> Result<()> {
    check_elementwise(a, &[b, out])
}
