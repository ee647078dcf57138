// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! `mymuladd(a, b, c) = a * b + c` with a product-rule backward.

use super::{
    expect_arity, float_arg, float_meta_arg, tensor_arg, tensor_meta_arg, ArgMeta, FusedOp, Value,
};
use crate::autograd::{GradientRequest, SavedContext};
use crate::device::location_label;
use crate::error::Result;
use crate::kernels::{self, MulAddKernel, MYMULADD};
use crate::logging::log_dispatch;
use crate::meta::{self, TensorMeta};
use candle_core::{CpuStorage, CustomOp2, Device, Layout, Shape, Tensor};

const ARITY: usize = 3;
const SLOT_A: usize = 0;
const SLOT_B: usize = 1;

/// The fused multiply-add operator.
///
/// `c` is a plain scalar and is never differentiated: the third gradient
/// returned by [`FusedOp::backward`] is always `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulAddOp;

impl MulAddOp {
    /// Typed form of [`FusedOp::setup_context`].
    ///
    /// Keeps `b` only when `a` needs a gradient and `a` only when `b` does;
    /// nothing else is retained.
    ///
    /// # Errors
    ///
    /// Never fails for a three-slot context; the `Result` mirrors the trait.
    pub fn save_for_backward(
        &self,
        request: &GradientRequest,
        a: &Tensor,
        b: &Tensor,
    ) -> Result<SavedContext> {
        let mut ctx = SavedContext::new(MYMULADD, request.clone(), ARITY);
        // d(a*b + c)/da = b
        if request.needs(SLOT_A) {
            ctx.save(SLOT_B, b)?;
        }
        // d(a*b + c)/db = a
        if request.needs(SLOT_B) {
            ctx.save(SLOT_A, a)?;
        }
        Ok(ctx)
    }
}

impl FusedOp for MulAddOp {
    fn name(&self) -> &'static str {
        MYMULADD
    }

    fn schema(&self) -> &'static str {
        "mymuladd(Tensor a, Tensor b, float c) -> Tensor"
    }

    fn arity(&self) -> usize {
        ARITY
    }

    fn shape_check(&self, args: &[ArgMeta]) -> Result<Option<TensorMeta>> {
        expect_arity(MYMULADD, args, ARITY)?;
        let a = tensor_meta_arg(MYMULADD, args, 0)?;
        let b = tensor_meta_arg(MYMULADD, args, 1)?;
        let c = float_meta_arg(MYMULADD, args, 2)?;
        meta::mul_add_signature(a, b, c).map(Some)
    }

    fn forward(&self, args: &[Value<'_>]) -> Result<Option<Tensor>> {
        expect_arity(MYMULADD, args, ARITY)?;
        let a = tensor_arg(MYMULADD, args, 0)?;
        let b = tensor_arg(MYMULADD, args, 1)?;
        let c = float_arg(MYMULADD, args, 2)?;
        kernels::mul_add(a, b, c).map(Some)
    }

    fn differentiable_inputs(&self) -> usize {
        2
    }

    fn setup_context(
        &self,
        request: &GradientRequest,
        args: &[Value<'_>],
        _output: &Tensor,
    ) -> Result<SavedContext> {
        expect_arity(MYMULADD, args, ARITY)?;
        let a = tensor_arg(MYMULADD, args, 0)?;
        let b = tensor_arg(MYMULADD, args, 1)?;
        self.save_for_backward(request, a, b)
    }

    fn backward(&self, ctx: SavedContext, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        let request = ctx.request();
        let grad_a = if request.needs(SLOT_A) {
            Some(kernels::mul(grad_output, ctx.require(SLOT_B, "b")?)?)
        } else {
            None
        };
        let grad_b = if request.needs(SLOT_B) {
            Some(kernels::mul(grad_output, ctx.require(SLOT_A, "a")?)?)
        } else {
            None
        };
        Ok(vec![grad_a, grad_b, None])
    }
}

/// Candle custom op recording `mymuladd` on the autograd tape with the
/// hand-written backward rule.
struct TapeMulAdd {
    kernel: MulAddKernel,
}

impl CustomOp2 for TapeMulAdd {
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
        self.kernel.cpu_fwd(s1, l1, s2, l2)
    }

    fn bwd(
        &self,
        a: &Tensor,
        b: &Tensor,
        _res: &Tensor,
        grad_res: &Tensor,
    ) -> candle_core::Result<(Option<Tensor>, Option<Tensor>)> {
        let request = GradientRequest::from([a.track_op(), b.track_op(), false]);
        tracing::trace!(
            target: "dengww::ops",
            op = MYMULADD,
            needs_a = request.needs(SLOT_A),
            needs_b = request.needs(SLOT_B),
            "tape backward"
        );
        let ctx = MulAddOp
            .save_for_backward(&request, a, b)
            .map_err(candle_core::Error::wrap)?;
        let mut grads = MulAddOp
            .backward(ctx, grad_res)
            .map_err(candle_core::Error::wrap)?
            .into_iter();
        Ok((grads.next().flatten(), grads.next().flatten()))
    }
}

/// `a * b + c`, elementwise.
///
/// On CPU the call is recorded on candle's autograd tape with
/// [`MulAddOp`]'s backward rule, so `loss.backward()` yields `grad_a = grad * b`
/// and `grad_b = grad * a` for whichever inputs are tracked.
///
/// On CUDA and Metal the result is composed from candle's `mul` and `affine`,
/// so the tape records their built-in backward instead of [`MulAddOp`]'s rule.
/// The gradients are the same, but the hand-written rule (with its minimal
/// saving) runs on those devices only through
/// [`OpRegistry::call_with_grad`](crate::OpRegistry::call_with_grad) and
/// [`OpRegistry::call_backward`](crate::OpRegistry::call_backward).
///
/// ```rust
/// use candle_core::{Device, Tensor, Var};
///
/// let a = Var::new(&[2f32], &Device::Cpu)?;
/// let b = Tensor::new(&[3f32], &Device::Cpu)?;
/// let y = dengww_ops::mymuladd(a.as_tensor(), &b, 0.0)?;
/// let grads = y.sum_all()?.backward()?;
/// assert_eq!(grads.get(a.as_tensor()).unwrap().to_vec1::<f32>()?, vec![3.0]);
/// # Ok::<(), dengww_ops::CoreError>(())
/// ```
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch` for invalid inputs.
pub fn mymuladd(a: &Tensor, b: &Tensor, c: f64) -> Result<Tensor> {
    meta::mul_add_signature(&TensorMeta::of(a), &TensorMeta::of(b), c)?;
    match a.device() {
        Device::Cpu => {
            log_dispatch(MYMULADD, &location_label(a.device().location()), a.elem_count());
            let (a, b) = (a.contiguous()?, b.contiguous()?);
            let op = TapeMulAdd {
                kernel: MulAddKernel::new(c),
            };
            Ok(a.apply_op2(&b, op)?)
        }
        Device::Cuda(_) | Device::Metal(_) => kernels::mul_add(a, b, c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use candle_core::{DType, DeviceLocation, Var};

    fn t(data: &[f32]) -> Tensor {
        Tensor::new(data, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_forward_example() {
        let (a, b) = (t(&[1.0, 2.0, 3.0]), t(&[4.0, 5.0, 6.0]));
        let out = MulAddOp
            .forward(&[Value::from(&a), Value::from(&b), Value::from(10.0)])
            .unwrap()
            .unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![14.0, 20.0, 28.0]);
    }

    #[test]
    fn test_shape_check_matches_forward() {
        let a = Tensor::ones((2, 3), DType::F32, &Device::Cpu).unwrap();
        let b = Tensor::ones((2, 3), DType::F32, &Device::Cpu).unwrap();
        let args = [Value::from(&a), Value::from(&b), Value::from(1.5)];
        let metas: Vec<ArgMeta> = args.iter().map(Value::meta).collect();

        let signature = MulAddOp.shape_check(&metas).unwrap().unwrap();
        let out = MulAddOp.forward(&args).unwrap().unwrap();
        assert_eq!(signature, TensorMeta::of(&out));
    }

    #[test]
    fn test_shape_check_without_tensors() {
        let a = TensorMeta::new(vec![4], DType::F32, DeviceLocation::Cuda { gpu_id: 1 });
        let args = [a.clone().into(), a.clone().into(), ArgMeta::Float(0.0)];
        assert_eq!(MulAddOp.shape_check(&args).unwrap(), Some(a));
    }

    #[test]
    fn test_forward_rejects_bad_inputs() {
        let a = Tensor::zeros((2, 2), DType::F32, &Device::Cpu).unwrap();
        let err = MulAddOp
            .forward(&[Value::from(&a), Value::from(&t(&[1.0, 2.0, 3.0])), Value::from(0.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));

        let ints = Tensor::new(&[1i64, 2, 3], &Device::Cpu).unwrap();
        let err = MulAddOp
            .forward(&[Value::from(&ints), Value::from(&t(&[1.0, 2.0, 3.0])), Value::from(0.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::DtypeMismatch { .. }));
    }

    #[test]
    fn test_minimal_saving() {
        let (a, b) = (t(&[2.0]), t(&[3.0]));

        let ctx = MulAddOp
            .save_for_backward(&GradientRequest::from([true, false, false]), &a, &b)
            .unwrap();
        assert_eq!(ctx.saved_count(), 1);
        assert!(ctx.saved(SLOT_A).is_none());
        assert_eq!(ctx.saved(SLOT_B).unwrap().id(), b.id());

        let ctx = MulAddOp
            .save_for_backward(&GradientRequest::from([false, true, false]), &a, &b)
            .unwrap();
        assert_eq!(ctx.saved_count(), 1);
        assert_eq!(ctx.saved(SLOT_A).unwrap().id(), a.id());

        let ctx = MulAddOp
            .save_for_backward(&GradientRequest::none(3), &a, &b)
            .unwrap();
        assert_eq!(ctx.saved_count(), 0);
    }

    #[test]
    fn test_backward_example() {
        let (a, b) = (t(&[2.0]), t(&[3.0]));
        let args = [Value::from(&a), Value::from(&b), Value::from(0.0)];
        let out = MulAddOp.forward(&args).unwrap().unwrap();
        let ctx = MulAddOp
            .setup_context(&GradientRequest::all(2), &args, &out)
            .unwrap();

        let grads = MulAddOp.backward(ctx, &t(&[1.0])).unwrap();
        assert_eq!(grads.len(), 3);
        assert_eq!(grads[0].as_ref().unwrap().to_vec1::<f32>().unwrap(), vec![3.0]);
        assert_eq!(grads[1].as_ref().unwrap().to_vec1::<f32>().unwrap(), vec![2.0]);
        assert!(grads[2].is_none());
    }

    #[test]
    fn test_backward_only_a_without_a_retained() {
        let b = t(&[3.0, 4.0]);
        let ctx = {
            let a = t(&[2.0, 5.0]);
            MulAddOp
                .save_for_backward(&GradientRequest::from([true, false, false]), &a, &b)
                .unwrap()
        };
        let grads = MulAddOp.backward(ctx, &t(&[1.0, 2.0])).unwrap();
        assert_eq!(grads[0].as_ref().unwrap().to_vec1::<f32>().unwrap(), vec![3.0, 8.0]);
        assert!(grads[1].is_none());
    }

    #[test]
    fn test_backward_missing_saved_tensor() {
        // Context claims `b` needs a gradient but never saved `a`.
        let ctx = SavedContext::new(MYMULADD, GradientRequest::from([false, true, false]), ARITY);
        let err = MulAddOp.backward(ctx, &t(&[1.0])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingSavedTensor { tensor: "a", .. }
        ));
    }

    #[test]
    fn test_tape_gradients() {
        let a = Var::new(&[1f32, 2.0, 3.0], &Device::Cpu).unwrap();
        let b = Var::new(&[4f32, 5.0, 6.0], &Device::Cpu).unwrap();
        let y = mymuladd(a.as_tensor(), b.as_tensor(), 10.0).unwrap();
        assert_eq!(y.to_vec1::<f32>().unwrap(), vec![14.0, 20.0, 28.0]);

        let grads = y.sum_all().unwrap().backward().unwrap();
        let grad_a = grads.get(a.as_tensor()).unwrap();
        let grad_b = grads.get(b.as_tensor()).unwrap();
        assert_eq!(grad_a.to_vec1::<f32>().unwrap(), vec![4.0, 5.0, 6.0]);
        assert_eq!(grad_b.to_vec1::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_tape_skips_untracked_input() {
        let a = Var::new(&[2f32], &Device::Cpu).unwrap();
        let b = t(&[3.0]);
        let y = mymuladd(a.as_tensor(), &b, 0.0).unwrap();
        let grads = y.sum_all().unwrap().backward().unwrap();
        assert_eq!(
            grads.get(a.as_tensor()).unwrap().to_vec1::<f32>().unwrap(),
            vec![3.0]
        );
        assert!(grads.get(&b).is_none());
    }
}
