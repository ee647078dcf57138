// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Output allocation accounting for operator dispatch.
//!
//! The registry charges the size of every output tensor it is about to
//! allocate to a [`MemoryTracker`] before running the kernel. With a budget
//! configured, an operator whose output would exceed it fails with
//! `CoreError::OutOfMemory` before any work is done. In-place operators such
//! as `myadd_out` charge nothing.
//!
//! Outputs are owned by the caller once returned, so the registry releases the
//! charge when the kernel finishes. `allocated_bytes` is what is in flight
//! right now; `peak_bytes` is the high-water mark since the last
//! [`MemoryTracker::reset`].

use crate::error::{CoreError, Result};
use candle_core::DType;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bytes needed to store a tensor with the given shape and dtype.
///
/// ## Example
///
/// ```rust
/// use dengww_ops::estimate_tensor_bytes;
/// use candle_core::DType;
///
/// assert_eq!(estimate_tensor_bytes(&[2, 3], DType::F32), 24);
/// ```
#[must_use]
pub fn estimate_tensor_bytes(shape: &[usize], dtype: DType) -> usize {
    let numel: usize = shape.iter().product();
    numel * dtype.size_in_bytes()
}

/// Thread-safe allocation counter with an optional budget.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    allocated: AtomicUsize,
    peak: AtomicUsize,
    /// 0 = unlimited.
    limit: AtomicUsize,
}

impl MemoryTracker {
    /// Create a new memory tracker with no limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker with a memory limit (0 = unlimited).
    #[must_use]
    pub fn with_limit(limit_bytes: usize) -> Self {
        Self {
            allocated: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            limit: AtomicUsize::new(limit_bytes),
        }
    }

    /// Record an allocation.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OutOfMemory` if the allocation would exceed the
    /// limit; the tracker is left unchanged in that case.
    pub fn allocate(&self, bytes: usize) -> Result<()> {
        let limit = self.limit.load(Ordering::SeqCst);
        let mut current = self.allocated.load(Ordering::SeqCst);
        loop {
            let new_allocated = current.saturating_add(bytes);
            if limit > 0 && new_allocated > limit {
                return Err(CoreError::oom(format!(
                    "allocation of {bytes} bytes would exceed limit of {limit} bytes \
                     (current: {current} bytes)"
                )));
            }
            match self.allocated.compare_exchange_weak(
                current,
                new_allocated,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(new_allocated, Ordering::SeqCst);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Record a deallocation.
    pub fn deallocate(&self, bytes: usize) {
        // Saturate instead of wrapping if a caller releases more than it charged.
        let _ = self
            .allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(bytes))
            });
    }

    /// Currently allocated bytes.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    /// Peak allocation during tracker lifetime.
    #[must_use]
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Configured memory limit (0 = unlimited).
    #[must_use]
    pub fn limit_bytes(&self) -> usize {
        self.limit.load(Ordering::SeqCst)
    }

    /// Reset the counters (the limit is kept).
    pub fn reset(&self) {
        self.allocated.store(0, Ordering::SeqCst);
        self.peak.store(0, Ordering::SeqCst);
    }
}
