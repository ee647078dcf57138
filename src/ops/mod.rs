// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Operator definitions for the `dengww` namespace.
//!
//! Every operator implements [`FusedOp`]: a schema, an abstract kernel
//! ([`FusedOp::shape_check`]) that derives the output signature from metadata
//! only, a concrete [`FusedOp::forward`], and optionally an autograd rule made
//! of [`FusedOp::setup_context`] and [`FusedOp::backward`].
//!
//! | Operator | Schema | Autograd |
//! |----------|--------|----------|
//! | [`MulAddOp`] | `mymuladd(Tensor a, Tensor b, float c) -> Tensor` | a, b |
//! | [`MulOp`] | `mymul(Tensor a, Tensor b) -> Tensor` | none |
//! | [`AddOutOp`] | `myadd_out(Tensor a, Tensor b, Tensor(a!) out) -> ()` | none |
//!
//! The typed functions [`mymuladd`], [`mymul`] and [`myadd_out`] are the
//! direct entry points; [`crate::OpRegistry`] reaches the same operators by name.

mod add_out;
mod mul;
mod muladd;

pub use add_out::{myadd_out, AddOutOp};
pub use mul::{mymul, MulOp};
pub use muladd::{mymuladd, MulAddOp};

use crate::autograd::{GradientRequest, SavedContext};
use crate::error::{CoreError, Result};
use crate::meta::TensorMeta;
use candle_core::Tensor;

/// One argument of a dynamic operator call.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    /// Borrowed tensor argument.
    Tensor(&'a Tensor),
    /// Scalar float argument.
    Float(f64),
}

impl Value<'_> {
    /// The metadata mirror of this argument, for abstract kernels.
    #[must_use]
    pub fn meta(&self) -> ArgMeta {
        match self {
            Value::Tensor(t) => ArgMeta::Tensor(TensorMeta::of(t)),
            Value::Float(f) => ArgMeta::Float(*f),
        }
    }
}

impl<'a> From<&'a Tensor> for Value<'a> {
    fn from(t: &'a Tensor) -> Self {
        Value::Tensor(t)
    }
}

impl From<f64> for Value<'_> {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Argument of an abstract (metadata-only) operator call.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgMeta {
    /// Tensor signature.
    Tensor(TensorMeta),
    /// Scalar float argument.
    Float(f64),
}

impl From<TensorMeta> for ArgMeta {
    fn from(meta: TensorMeta) -> Self {
        ArgMeta::Tensor(meta)
    }
}

/// A registrable operator.
///
/// Implementations are stateless; invocation data arrives through the
/// argument slices so one instance can serve concurrent calls.
pub trait FusedOp: Send + Sync {
    /// Unqualified operator name, e.g. `mymuladd`.
    fn name(&self) -> &'static str;

    /// Schema string in the `name(Type arg, ...) -> Ret` form.
    fn schema(&self) -> &'static str;

    /// Number of arguments.
    fn arity(&self) -> usize;

    /// Abstract kernel: validate argument metadata and return the output
    /// signature, or `None` for operators that return nothing.
    ///
    /// # Errors
    ///
    /// The same validation errors the concrete path raises for these inputs.
    fn shape_check(&self, args: &[ArgMeta]) -> Result<Option<TensorMeta>>;

    /// Concrete kernel. Returns `None` for operators that return nothing.
    ///
    /// # Errors
    ///
    /// Validation errors, or a wrapped candle error from the kernel.
    fn forward(&self, args: &[Value<'_>]) -> Result<Option<Tensor>>;

    /// Number of leading inputs the autograd rule can differentiate
    /// (0 when the operator has no autograd rule).
    fn differentiable_inputs(&self) -> usize {
        0
    }

    /// Save what [`FusedOp::backward`] needs, right after a forward call.
    ///
    /// # Errors
    ///
    /// `NotImplemented` for operators without an autograd rule.
    fn setup_context(
        &self,
        _request: &GradientRequest,
        _args: &[Value<'_>],
        _output: &Tensor,
    ) -> Result<SavedContext> {
        Err(CoreError::not_implemented(format!(
            "autograd rule for {}",
            self.name()
        )))
    }

    /// Gradients for every input (`None` where not requested or not
    /// differentiable), consuming the saved context.
    ///
    /// # Errors
    ///
    /// `NotImplemented` for operators without an autograd rule,
    /// `MissingSavedTensor` when the context lacks a needed tensor.
    fn backward(&self, _ctx: SavedContext, _grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        Err(CoreError::not_implemented(format!(
            "autograd rule for {}",
            self.name()
        )))
    }
}

pub(crate) fn expect_arity<T>(op: &str, args: &[T], arity: usize) -> Result<()> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(CoreError::invalid_args(
            op,
            format!("expected {arity} arguments, got {}", args.len()),
        ))
    }
}

pub(crate) fn tensor_arg<'a>(op: &str, args: &[Value<'a>], index: usize) -> Result<&'a Tensor> {
    match args.get(index) {
        Some(&Value::Tensor(t)) => Ok(t),
        Some(Value::Float(_)) => Err(CoreError::invalid_args(
            op,
            format!("argument {index} must be a tensor"),
        )),
        None => Err(CoreError::invalid_args(op, format!("missing argument {index}"))),
    }
}

pub(crate) fn float_arg(op: &str, args: &[Value<'_>], index: usize) -> Result<f64> {
    match args.get(index) {
        Some(&Value::Float(f)) => Ok(f),
        Some(Value::Tensor(_)) => Err(CoreError::invalid_args(
            op,
            format!("argument {index} must be a float"),
        )),
        None => Err(CoreError::invalid_args(op, format!("missing argument {index}"))),
    }
}

pub(crate) fn tensor_meta_arg<'a>(op: &str, args: &'a [ArgMeta], index: usize) -> Result<&'a TensorMeta> {
    match args.get(index) {
        Some(ArgMeta::Tensor(m)) => Ok(m),
        Some(ArgMeta::Float(_)) => Err(CoreError::invalid_args(
            op,
            format!("argument {index} must be a tensor"),
        )),
        None => Err(CoreError::invalid_args(op, format!("missing argument {index}"))),
    }
}

pub(crate) fn float_meta_arg(op: &str, args: &[ArgMeta], index: usize) -> Result<f64> {
    match args.get(index) {
        Some(ArgMeta::Float(f)) => Ok(*f),
        Some(ArgMeta::Tensor(_)) => Err(CoreError::invalid_args(
            op,
            format!("argument {index} must be a float"),
        )),
        None => Err(CoreError::invalid_args(op, format!("missing argument {index}"))),
    }
}
