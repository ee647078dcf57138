// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Native CPU loops over contiguous `f32` buffers.
//!
//! All slices passed to one call have the same length; the callers in
//! [`super`] guarantee it after validation.

/// `out[i] = a[i] * b[i] + c`
///
/// The product is taken in `f32`; the add happens in `f64` and is narrowed
/// once, so `c` is never rounded to `f32` on its own.
#[allow(clippy::cast_possible_truncation)]
pub fn mul_add(a: &[f32], b: &[f32], c: f64, out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && b.len() == out.len());
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = (f64::from(x * y) + c) as f32;
    }
}

/// `out[i] = a[i] * b[i]`
pub fn mul(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && b.len() == out.len());
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x * y;
    }
}

/// `out[i] = a[i] + b[i]`
pub fn add(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && b.len() == out.len());
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x + y;
    }
}
