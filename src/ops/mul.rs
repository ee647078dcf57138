// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! `mymul(a, b) = a * b`, the kernel the `mymuladd` backward rule runs on.

use super::{expect_arity, tensor_arg, tensor_meta_arg, ArgMeta, FusedOp, Value};
use crate::error::Result;
use crate::kernels::{self, MYMUL};
use crate::meta::{self, TensorMeta};
use candle_core::Tensor;

/// Elementwise multiply. Has no autograd rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulOp;

impl FusedOp for MulOp {
    fn name(&self) -> &'static str {
        MYMUL
    }

    fn schema(&self) -> &'static str {
        "mymul(Tensor a, Tensor b) -> Tensor"
    }

    fn arity(&self) -> usize {
        2
    }

    fn shape_check(&self, args: &[ArgMeta]) -> Result<Option<TensorMeta>> {
        expect_arity(MYMUL, args, 2)?;
        let a = tensor_meta_arg(MYMUL, args, 0)?;
        let b = tensor_meta_arg(MYMUL, args, 1)?;
        meta::mul_signature(a, b).map(Some)
    }

    fn forward(&self, args: &[Value<'_>]) -> Result<Option<Tensor>> {
        expect_arity(MYMUL, args, 2)?;
        let a = tensor_arg(MYMUL, args, 0)?;
        let b = tensor_arg(MYMUL, args, 1)?;
        kernels::mul(a, b).map(Some)
    }
}

/// `a * b`, elementwise, into a new tensor.
///
/// # Errors
///
/// `ShapeMismatch`, `DtypeMismatch` or `DeviceMismatch` for invalid inputs.
pub fn mymul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    kernels::mul(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::GradientRequest;
    use crate::error::CoreError;
    use candle_core::{DType, Device};

    #[test]
    fn test_mymul() {
        let a = Tensor::new(&[2f32, -1.0, 0.5], &Device::Cpu).unwrap();
        let b = Tensor::new(&[3f32, 4.0, 8.0], &Device::Cpu).unwrap();
        let out = mymul(&a, &b).unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![6.0, -4.0, 4.0]);
    }

    #[test]
    fn test_forward_and_shape_check_agree() {
        let a = Tensor::ones((3, 2), DType::F32, &Device::Cpu).unwrap();
        let args = [Value::from(&a), Value::from(&a)];
        let metas: Vec<ArgMeta> = args.iter().map(Value::meta).collect();
        let signature = MulOp.shape_check(&metas).unwrap().unwrap();
        let out = MulOp.forward(&args).unwrap().unwrap();
        assert_eq!(signature, TensorMeta::of(&out));
    }

    #[test]
    fn test_rejects_float_argument() {
        let a = Tensor::ones(2, DType::F32, &Device::Cpu).unwrap();
        let err = MulOp
            .forward(&[Value::from(&a), Value::from(2.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArguments { .. }));
    }

    #[test]
    fn test_no_autograd_rule() {
        let a = Tensor::ones(2, DType::F32, &Device::Cpu).unwrap();
        assert_eq!(MulOp.differentiable_inputs(), 0);
        let err = MulOp
            .setup_context(&GradientRequest::all(2), &[Value::from(&a), Value::from(&a)], &a)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented { .. }));
    }
}
