// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Gradient requests and saved contexts for hand-written backward rules.
//!
//! An operator's autograd rule is split in two: `setup_context` runs right
//! after the forward pass and keeps only the tensors the backward formula will
//! read, and `backward` consumes that context exactly once. [`SavedContext`] is
//! moved into `backward`, so a context cannot be replayed.

use crate::error::{CoreError, Result};
use candle_core::Tensor;

/// Per-input flags saying which operator inputs need a gradient.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GradientRequest {
    flags: Vec<bool>,
}

impl GradientRequest {
    /// Build a request from one flag per operator input.
    pub fn new(flags: impl Into<Vec<bool>>) -> Self {
        Self {
            flags: flags.into(),
        }
    }

    /// Request gradients for all `arity` inputs.
    #[must_use]
    pub fn all(arity: usize) -> Self {
        Self::new(vec![true; arity])
    }

    /// Request no gradients.
    #[must_use]
    pub fn none(arity: usize) -> Self {
        Self::new(vec![false; arity])
    }

    /// Whether input `index` needs a gradient. Out-of-range indices do not.
    #[must_use]
    pub fn needs(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Whether any input needs a gradient.
    #[must_use]
    pub fn any(&self) -> bool {
        self.flags.iter().any(|&f| f)
    }

    /// Number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the request has no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// The raw flags.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }
}

impl<const N: usize> From<[bool; N]> for GradientRequest {
    fn from(flags: [bool; N]) -> Self {
        Self::new(flags.to_vec())
    }
}

/// Tensors retained between one forward call and its backward call.
///
/// Slots are indexed by operator input position. A slot is filled only when
/// the backward formula of some requested gradient reads that input.
#[derive(Debug)]
pub struct SavedContext {
    op: &'static str,
    request: GradientRequest,
    slots: Vec<Option<Tensor>>,
}

impl SavedContext {
    /// Empty context for `op` with one slot per input.
    #[must_use]
    pub fn new(op: &'static str, request: GradientRequest, arity: usize) -> Self {
        Self {
            op,
            request,
            slots: vec![None; arity],
        }
    }

    /// Operator that created this context.
    #[must_use]
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The gradient request captured at setup time.
    #[must_use]
    pub fn request(&self) -> &GradientRequest {
        &self.request
    }

    /// Keep `tensor` for input slot `index`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidArguments` if `index` is not an input slot.
    pub fn save(&mut self, index: usize, tensor: &Tensor) -> Result<()> {
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            CoreError::invalid_args(self.op, format!("no input slot {index} to save"))
        })?;
        *slot = Some(tensor.clone());
        Ok(())
    }

    /// Saved tensor for input slot `index`, if any.
    #[must_use]
    pub fn saved(&self, index: usize) -> Option<&Tensor> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Saved tensor for input slot `index`, named `name` in the error.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingSavedTensor` if the slot is empty.
    pub fn require(&self, index: usize, name: &'static str) -> Result<&Tensor> {
        self.saved(index)
            .ok_or_else(|| CoreError::missing_saved(self.op, name))
    }

    /// Number of tensors actually retained.
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
