// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Native kernel library behind the `dengww` operators.
//!
//! Each kernel validates its inputs with the shared routine in [`crate::meta`],
//! makes its inputs contiguous and then dispatches on the device:
//!
//! - CPU: candle custom ops ([`CustomOp2`] / [`InplaceOp3`]) running the loops
//!   in [`cpu`] directly over the tensor storage.
//! - CUDA / Metal: the same arithmetic composed from candle's device kernels.
//!
//! Kernels record nothing on candle's autograd tape; gradients are the
//! business of [`crate::ops`].

pub mod cpu;

use crate::device::location_label;
use crate::error::{CoreError, Result};
use crate::logging::log_dispatch;
use crate::meta::{self, TensorMeta};
use crate::traits::GpuDispatchable;
use candle_core::{CpuStorage, CustomOp2, Device, InplaceOp3, Layout, Shape, Tensor};

/// Name of the fused multiply-add operator.
pub const MYMULADD: &str = "mymuladd";
/// Name of the elementwise multiply operator.
pub const MYMUL: &str = "mymul";
/// Name of the in-place add operator.
pub const MYADD_OUT: &str = "myadd_out";

fn f32_slice<'a>(
    op: &str,
    storage: &'a CpuStorage,
    layout: &Layout,
) -> candle_core::Result<&'a [f32]> {
    let CpuStorage::F32(data) = storage else {
        candle_core::bail!("{op}: expected f32 storage");
    };
    match layout.contiguous_offsets() {
        Some((start, end)) => Ok(&data[start..end]),
        None => candle_core::bail!("{op}: input is not contiguous"),
    }
}

fn binary_f32<'a>(
    op: &str,
    s1: &'a CpuStorage,
    l1: &Layout,
    s2: &'a CpuStorage,
    l2: &Layout,
) -> candle_core::Result<(&'a [f32], &'a [f32])> {
    let a = f32_slice(op, s1, l1)?;
    let b = f32_slice(op, s2, l2)?;
    if a.len() != b.len() {
        candle_core::bail!("{op}: length mismatch {} vs {}", a.len(), b.len());
    }
    Ok((a, b))
}

/// `a * b + c` kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MulAddKernel {
    c: f64,
}

impl MulAddKernel {
    /// Kernel adding the scalar `c` after the product.
    #[must_use]
    pub fn new(c: f64) -> Self {
        Self { c }
    }
}

impl CustomOp2 for MulAddKernel {
    fn name(&self) -> &'static str {
        MYMULADD
    }

    fn cpu_fwd(
        &self,
        s1: &CpuStorage,
        l1: &Layout,
        s2: &CpuStorage,
        l2: &Layout,
    ) -> candle_core::Result<(CpuStorage, Shape)> {
        let (a, b) = binary_f32(MYMULADD, s1, l1, s2, l2)?;
        let mut out = vec![0f32; a.len()];
        cpu::mul_add(a, b, self.c, &mut out);
        Ok((CpuStorage::F32(out), l1.shape().clone()))
    }
}

impl GpuDispatchable for MulAddKernel {
    type Input = (Tensor, Tensor);
    type Output = Tensor;

    fn dispatch_gpu(&self, (a, b): &(Tensor, Tensor), _device: &Device) -> Result<Tensor> {
        Ok(a.mul(b)?.affine(1.0, self.c)?)
    }

    fn dispatch_cpu(&self, (a, b): &(Tensor, Tensor), _device: &Device) -> Result<Tensor> {
        Ok(a.apply_op2_no_bwd(b, self)?)
    }
}

/// `a * b` kernel. The backward rule of `mymuladd` multiplies with this.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulKernel;

impl CustomOp2 for MulKernel {
    fn name(&self) -> &'static str {
        MYMUL
    }

    fn cpu_fwd(
        &self,
        s1: &CpuStorage,
        l1: &Layout,
        s2: &CpuStorage,
        l2: &Layout,
    ) -> candle_core::Result<(CpuStorage, Shape)> {
        let (a, b) = binary_f32(MYMUL, s1, l1, s2, l2)?;
        let mut out = vec![0f32; a.len()];
        cpu::mul(a, b, &mut out);
        Ok((CpuStorage::F32(out), l1.shape().clone()))
    }
}

impl GpuDispatchable for MulKernel {
    type Input = (Tensor, Tensor);
    type Output = Tensor;

    fn dispatch_gpu(&self, (a, b): &(Tensor, Tensor), _device: &Device) -> Result<Tensor> {
        Ok(a.mul(b)?)
    }

    fn dispatch_cpu(&self, (a, b): &(Tensor, Tensor), _device: &Device) -> Result<Tensor> {
        Ok(a.apply_op2_no_bwd(b, self)?)
    }
}

/// `out = a + b` kernel writing into an existing buffer.
///
/// Input order is `(a, b, out)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOutKernel;

impl InplaceOp3 for AddOutKernel {
    fn name(&self) -> &'static str {
        MYADD_OUT
    }

    fn cpu_fwd(
        &self,
        s_out: &mut CpuStorage,
        l_out: &Layout,
        s_a: &CpuStorage,
        l_a: &Layout,
        s_b: &CpuStorage,
        l_b: &Layout,
    ) -> candle_core::Result<()> {
        let (a, b) = binary_f32(MYADD_OUT, s_a, l_a, s_b, l_b)?;
        let Some((start, end)) = l_out.contiguous_offsets() else {
            candle_core::bail!("{MYADD_OUT}: output is not contiguous");
        };
        let CpuStorage::F32(out) = s_out else {
            candle_core::bail!("{MYADD_OUT}: expected f32 output storage");
        };
        let out = &mut out[start..end];
        if out.len() != a.len() {
            candle_core::bail!("{MYADD_OUT}: output length {} vs {}", out.len(), a.len());
        }
        cpu::add(a, b, out);
        Ok(())
    }
}

impl GpuDispatchable for AddOutKernel {
    type Input = (Tensor, Tensor, Tensor);
    type Output = ();

    fn dispatch_gpu(&self, (a, b, out): &(Tensor, Tensor, Tensor), _device: &Device) -> Result<()> {
        copy_into(out, &a.add(b)?)
    }

    fn dispatch_cpu(&self, (a, b, out): &(Tensor, Tensor, Tensor), _device: &Device) -> Result<()> {
        // `inplace_op3` write-locks `out` while read-locking the inputs, so an
        // aliased output goes through a temporary instead.
        if shares_storage(out, a) || shares_storage(out, b) {
            return copy_into(out, &a.add(b)?);
        }
        out.inplace_op3(a, b, self)?;
        Ok(())
    }
}

fn shares_storage(x: &Tensor, y: &Tensor) -> bool {
    let (sx, _) = x.storage_and_layout();
    let (sy, _) = y.storage_and_layout();
    std::ptr::eq(&*sx, &*sy)
}

/// Overwrite the contiguous `out` with `src` (same element count), in place.
fn copy_into(out: &Tensor, src: &Tensor) -> Result<()> {
    out.flatten_all()?.slice_set(&src.flatten_all()?, 0, 0)?;
    Ok(())
}

fn log_kernel(op: &str, t: &Tensor) {
    log_dispatch(op, &location_label(t.device().location()), t.elem_count());
}

/// Fused `a * b + c`, elementwise, into a newly allocated tensor.
///
/// ```rust
/// use candle_core::{Device, Tensor};
///
/// let a = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu)?;
/// let b = Tensor::new(&[4f32, 5.0, 6.0], &Device::Cpu)?;
/// let out = dengww_ops::kernels::mul_add(&a, &b, 10.0)?;
/// assert_eq!(out.to_vec1::<f32>()?, vec![14.0, 20.0, 28.0]);
/// # Ok::<(), dengww_ops::CoreError>(())
/// ```
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch` for invalid inputs.
pub fn mul_add(a: &Tensor, b: &Tensor, c: f64) -> Result<Tensor> {
    meta::mul_add_signature(&TensorMeta::of(a), &TensorMeta::of(b), c)?;
    log_kernel(MYMULADD, a);
    let input = (a.contiguous()?, b.contiguous()?);
    MulAddKernel::new(c).dispatch(&input, a.device())
}

/// Elementwise `a * b` into a newly allocated tensor.
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch` for invalid inputs.
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    meta::mul_signature(&TensorMeta::of(a), &TensorMeta::of(b))?;
    log_kernel(MYMUL, a);
    let input = (a.contiguous()?, b.contiguous()?);
    MulKernel.dispatch(&input, a.device())
}

/// Write `a + b` into `out` in place. Allocates no new output tensor.
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch` across all three
/// tensors, and `NonContiguous` if `out` is a strided view.
pub fn add_out(a: &Tensor, b: &Tensor, out: &Tensor) -> Result<()> {
    meta::add_out_check(&TensorMeta::of(a), &TensorMeta::of(b), &TensorMeta::of(out))?;
    if !out.is_contiguous() {
        return Err(CoreError::NonContiguous {
            op: MYADD_OUT.to_string(),
        });
    }
    log_kernel(MYADD_OUT, out);
    let input = (a.contiguous()?, b.contiguous()?, out.clone());
    AddOutKernel.dispatch(&input, out.device())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn t(data: &[f32]) -> Tensor {
        Tensor::new(data, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_mul_add_cpu() {
        let out = mul_add(&t(&[1.0, 2.0, 3.0]), &t(&[4.0, 5.0, 6.0]), 10.0).unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![14.0, 20.0, 28.0]);
        assert_eq!(out.dtype(), DType::F32);
    }

    #[test]
    fn test_mul_add_keeps_scalar_precision() {
        let c = 2f64.powi(-24) + 2f64.powi(-50);
        let out = mul_add(&t(&[1.0]), &t(&[1.0]), c).unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![1.0 + f32::EPSILON]);
    }

    #[test]
    fn test_mul_add_keeps_shape() {
        let a = Tensor::arange(0f32, 6.0, &Device::Cpu).unwrap().reshape((2, 3)).unwrap();
        let b = Tensor::ones((2, 3), DType::F32, &Device::Cpu).unwrap();
        let out = mul_add(&a, &b, 0.5).unwrap();
        assert_eq!(out.dims(), &[2, 3]);
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            vec![vec![0.5, 1.5, 2.5], vec![3.5, 4.5, 5.5]]
        );
    }

    #[test]
    fn test_mul_add_non_contiguous_input() {
        let a = Tensor::arange(0f32, 4.0, &Device::Cpu)
            .unwrap()
            .reshape((2, 2))
            .unwrap()
            .t()
            .unwrap();
        assert!(!a.is_contiguous());
        let b = Tensor::ones((2, 2), DType::F32, &Device::Cpu).unwrap();
        let out = mul_add(&a, &b, 0.0).unwrap();
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            vec![vec![0.0, 2.0], vec![1.0, 3.0]]
        );
    }

    #[test]
    fn test_mul_add_does_not_mutate_inputs() {
        let a = t(&[1.0, 2.0]);
        let b = t(&[3.0, 4.0]);
        let _ = mul_add(&a, &b, 1.0).unwrap();
        assert_eq!(a.to_vec1::<f32>().unwrap(), vec![1.0, 2.0]);
        assert_eq!(b.to_vec1::<f32>().unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_mul_cpu() {
        let out = mul(&t(&[2.0, 3.0]), &t(&[4.0, -1.0])).unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![8.0, -3.0]);
    }

    #[test]
    fn test_mul_rejects_shape_mismatch() {
        let a = Tensor::zeros((2, 2), DType::F32, &Device::Cpu).unwrap();
        let err = mul(&a, &t(&[1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_add_out_writes_in_place() {
        let out = Tensor::zeros(3, DType::F32, &Device::Cpu).unwrap();
        add_out(&t(&[1.0, 2.0, 3.0]), &t(&[10.0, 20.0, 30.0]), &out).unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![11.0, 22.0, 33.0]);
    }

    #[test]
    fn test_add_out_aliased_output() {
        let a = t(&[1.0, 2.0]);
        let b = t(&[5.0, 5.0]);
        add_out(&a, &b, &a).unwrap();
        assert_eq!(a.to_vec1::<f32>().unwrap(), vec![6.0, 7.0]);
    }

    #[test]
    fn test_add_out_rejects_strided_output() {
        let out = Tensor::zeros((2, 2), DType::F32, &Device::Cpu)
            .unwrap()
            .t()
            .unwrap();
        let a = Tensor::ones((2, 2), DType::F32, &Device::Cpu).unwrap();
        let err = add_out(&a, &a, &out).unwrap_err();
        assert!(matches!(err, CoreError::NonContiguous { .. }));
    }

    #[test]
    fn test_add_out_rejects_integer_out() {
        let out = Tensor::zeros(2, DType::U32, &Device::Cpu).unwrap();
        let err = add_out(&t(&[1.0, 2.0]), &t(&[1.0, 2.0]), &out).unwrap_err();
        assert!(matches!(err, CoreError::DtypeMismatch { .. }));
    }
}
