// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Python bindings for dengww-ops.
//!
//! Exposes the three operators on a small `Tensor` wrapper so Python code can
//! exercise the same kernels and error mapping as Rust callers. New tensors
//! land on the device of the registry built by `init_registry()`, or on the
//! device selected by `DENGWW_FORCE_CPU` / `DENGWW_CUDA_DEVICE` before that.
//!
//! # Python Usage
//!
//! ```python
//! from dengww_ops import Tensor, mymuladd, myadd_out, init_registry
//!
//! init_registry()
//! a = Tensor([1.0, 2.0, 3.0])
//! b = Tensor([4.0, 5.0, 6.0])
//! print(mymuladd(a, b, 10.0).tolist())   # [14.0, 20.0, 28.0]
//!
//! out = Tensor.zeros([3])
//! myadd_out(a, b, out)
//! print(out.tolist())                    # [5.0, 7.0, 9.0]
//! ```
//!
//! Validation failures (shape, dtype, device, bad arguments) raise
//! `ValueError`; everything else raises `RuntimeError`.

#![allow(clippy::useless_conversion)] // PyO3 macro generates these
#![allow(clippy::missing_errors_doc)] // Python bindings - errors are documented in docstrings
#![allow(clippy::needless_pass_by_value)] // PyO3 requires owned types for Python arguments

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use candle_core::{DType, Device, Tensor};

use crate::device::{get_device, location_label, DeviceConfig};

use crate::config::OpsConfig;
use crate::error::CoreError;
use crate::logging::{init_logging as rust_init_logging, LogConfig, LogLevel};
use crate::{ops, registry};

// =============================================================================
// TENSOR WRAPPER
// =============================================================================

/// `f32` tensor handle.
#[pyclass(name = "Tensor")]
#[derive(Clone)]
pub struct PyTensor {
    inner: Tensor,
}

#[pymethods]
impl PyTensor {
    /// Build a tensor from flat data and an optional shape (default: 1-D).
    #[new]
    #[pyo3(signature = (data, shape=None))]
    fn new(data: Vec<f32>, shape: Option<Vec<usize>>) -> PyResult<Self> {
        let shape = shape.unwrap_or_else(|| vec![data.len()]);
        let inner = Tensor::from_vec(data, shape, &default_device()?)
            .map_err(|e| to_py_err(CoreError::from(e)))?;
        Ok(Self { inner })
    }

    /// Zero-filled tensor of the given shape.
    #[staticmethod]
    fn zeros(shape: Vec<usize>) -> PyResult<Self> {
        let inner = Tensor::zeros(shape, DType::F32, &default_device()?)
            .map_err(|e| to_py_err(CoreError::from(e)))?;
        Ok(Self { inner })
    }

    /// Dimension sizes.
    #[getter]
    fn shape(&self) -> Vec<usize> {
        self.inner.dims().to_vec()
    }

    /// Elements in row-major order.
    fn tolist(&self) -> PyResult<Vec<f32>> {
        self.inner
            .flatten_all()
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| to_py_err(CoreError::from(e)))
    }

    /// Device label, e.g. "cpu" or "cuda:0".
    #[getter]
    fn device(&self) -> String {
        location_label(self.inner.device().location())
    }

    fn __repr__(&self) -> String {
        format!(
            "Tensor(shape={:?}, dtype={:?}, device={})",
            self.inner.dims(),
            self.inner.dtype(),
            self.device()
        )
    }
}

// =============================================================================
// OPERATORS
// =============================================================================

/// `a * b + c`, elementwise.
#[pyfunction]
fn mymuladd(a: &PyTensor, b: &PyTensor, c: f64) -> PyResult<PyTensor> {
    let inner = ops::mymuladd(&a.inner, &b.inner, c).map_err(to_py_err)?;
    Ok(PyTensor { inner })
}

/// `a * b`, elementwise.
#[pyfunction]
fn mymul(a: &PyTensor, b: &PyTensor) -> PyResult<PyTensor> {
    let inner = ops::mymul(&a.inner, &b.inner).map_err(to_py_err)?;
    Ok(PyTensor { inner })
}

/// Write `a + b` into `out`.
#[pyfunction]
fn myadd_out(a: &PyTensor, b: &PyTensor, out: &PyTensor) -> PyResult<()> {
    ops::myadd_out(&a.inner, &b.inner, &out.inner).map_err(to_py_err)
}

// =============================================================================
// REGISTRY AND LOGGING
// =============================================================================

/// Build the process-wide registry and return its qualified operator names.
#[pyfunction]
#[pyo3(signature = (namespace="dengww"))]
fn init_registry(namespace: &str) -> PyResult<Vec<String>> {
    let config = OpsConfig::new()
        .with_namespace(namespace)
        .with_device(DeviceConfig::from_env());
    let registry = registry::init_registry(&config).map_err(to_py_err)?;
    Ok(registry.operator_names())
}

/// Qualified operator names of the process-wide registry.
///
/// Raises `RuntimeError` before `init_registry()`.
#[pyfunction]
fn registered_operators() -> PyResult<Vec<String>> {
    let registry = registry::global_registry().map_err(to_py_err)?;
    Ok(registry.operator_names())
}

/// Install the tracing subscriber.
///
/// # Arguments
/// * `level` - One of "trace", "debug", "info", "warn", "error"
/// * `timestamps` - Include timestamps
/// * `ansi` - Colorize output
#[pyfunction]
#[pyo3(signature = (level="info", timestamps=true, ansi=true))]
fn init_logging(level: &str, timestamps: bool, ansi: bool) -> PyResult<()> {
    let log_level: LogLevel = level.parse().map_err(to_py_err)?;
    let config = LogConfig::new()
        .with_level(log_level)
        .with_timestamps(timestamps)
        .with_ansi(ansi);
    rust_init_logging(&config);
    Ok(())
}

/// Package version.
#[pyfunction]
fn version() -> &'static str {
    crate::VERSION
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn default_device() -> PyResult<Device> {
    match registry::global_registry() {
        Ok(registry) => registry.device(),
        Err(_) => get_device(&DeviceConfig::from_env()),
    }
    .map_err(to_py_err)
}

fn to_py_err(err: CoreError) -> PyErr {
    if err.is_validation() || matches!(err, CoreError::InvalidConfig(_)) {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

// =============================================================================
// PYTHON MODULE DEFINITION
// =============================================================================

/// Python module for dengww-ops.
#[pymodule]
pub fn dengww_ops(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTensor>()?;

    // Operators
    m.add_function(wrap_pyfunction!(mymuladd, m)?)?;
    m.add_function(wrap_pyfunction!(mymul, m)?)?;
    m.add_function(wrap_pyfunction!(myadd_out, m)?)?;

    // Registry and logging
    m.add_function(wrap_pyfunction!(init_registry, m)?)?;
    m.add_function(wrap_pyfunction!(registered_operators, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    // Utilities
    m.add_function(wrap_pyfunction!(version, m)?)?;

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
