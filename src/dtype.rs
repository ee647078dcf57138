// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Data type helpers for the fused operators.
//!
//! Every operator in the `dengww` namespace is defined on float32 tensors only.
//! There are no implicit conversions: an integer or half-precision input is
//! rejected with [`CoreError::DtypeMismatch`] rather than cast.

use crate::error::{CoreError, Result};
use candle_core::DType;

/// The element type every fused operator requires.
pub const REQUIRED_DTYPE: DType = DType::F32;

/// Fail with [`CoreError::DtypeMismatch`] unless `dtype` is [`REQUIRED_DTYPE`].
///
/// # Errors
///
/// Returns `CoreError::DtypeMismatch` for any other dtype.
pub fn ensure_f32(dtype: DType) -> Result<()> {
    if dtype == REQUIRED_DTYPE {
        Ok(())
    } else {
        Err(CoreError::dtype_mismatch(REQUIRED_DTYPE, dtype))
    }
}
