// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! `myadd_out(a, b, out)`: `out <- a + b` in place.

use super::{expect_arity, tensor_arg, tensor_meta_arg, ArgMeta, FusedOp, Value};
use crate::error::Result;
use crate::kernels::{self, MYADD_OUT};
use crate::meta::{self, TensorMeta};
use candle_core::Tensor;

/// In-place elementwise add. Mutates its third argument and returns nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOutOp;

impl FusedOp for AddOutOp {
    fn name(&self) -> &'static str {
        MYADD_OUT
    }

    fn schema(&self) -> &'static str {
        "myadd_out(Tensor a, Tensor b, Tensor(a!) out) -> ()"
    }

    fn arity(&self) -> usize {
        3
    }

    fn shape_check(&self, args: &[ArgMeta]) -> Result<Option<TensorMeta>> {
        expect_arity(MYADD_OUT, args, 3)?;
        let a = tensor_meta_arg(MYADD_OUT, args, 0)?;
        let b = tensor_meta_arg(MYADD_OUT, args, 1)?;
        let out = tensor_meta_arg(MYADD_OUT, args, 2)?;
        meta::add_out_check(a, b, out)?;
        Ok(None)
    }

    fn forward(&self, args: &[Value<'_>]) -> Result<Option<Tensor>> {
        expect_arity(MYADD_OUT, args, 3)?;
        let a = tensor_arg(MYADD_OUT, args, 0)?;
        let b = tensor_arg(MYADD_OUT, args, 1)?;
        let out = tensor_arg(MYADD_OUT, args, 2)?;
        kernels::add_out(a, b, out)?;
        Ok(None)
    }
}

/// Overwrite every element of `out` with `a + b`.
///
/// `out` may be the same tensor as `a` or `b`. On error `out` is untouched.
///
/// ```rust
/// use candle_core::{Device, Tensor};
///
/// let a = Tensor::new(&[1f32, 2.0], &Device::Cpu)?;
/// let b = Tensor::new(&[10f32, 20.0], &Device::Cpu)?;
/// let out = Tensor::zeros(2, candle_core::DType::F32, &Device::Cpu)?;
/// dengww_ops::myadd_out(&a, &b, &out)?;
/// assert_eq!(out.to_vec1::<f32>()?, vec![11.0, 22.0]);
/// # Ok::<(), dengww_ops::CoreError>(())
/// ```
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch` across the three
/// tensors, and `NonContiguous` if `out` is a strided view.
pub fn myadd_out(a: &Tensor, b: &Tensor, out: &Tensor) -> Result<()> {
    kernels::add_out(a, b, out)
}
