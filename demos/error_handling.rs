//! Example: Error Handling
//!
//! Shows which `CoreError` each invalid operator call produces, and how a
//! downstream crate can wrap `CoreError` in its own error type.
//!
//! Run with:
//! ```bash
//! cargo run --example error_handling
//! ```

use candle_core::{DType, Device, DeviceLocation, Tensor};
use dengww_ops::{
    myadd_out, mymuladd, ArgMeta, CoreError, FusedOp, GradientRequest, MulAddOp, OpRegistry,
    OpsConfig, Result, SavedContext, TensorMeta,
};

/// Example of a domain-specific error that wraps `CoreError`.
#[derive(Debug, thiserror::Error)]
enum LayerError {
    #[error("layer {0} has no weights")]
    Empty(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn scale_and_shift(name: &str, x: &Tensor, w: &Tensor, bias: f64) -> std::result::Result<Tensor, LayerError> {
    if w.elem_count() == 0 {
        return Err(LayerError::Empty(name.to_string()));
    }
    Ok(mymuladd(x, w, bias)?) // CoreError auto-converts to LayerError
}

fn report<T>(label: &str, result: Result<T>) {
    match result {
        Ok(_) => println!("   {label}: ok"),
        Err(e) => println!(
            "   {label}: {e}{}",
            if e.is_validation() { "  [validation]" } else { "" }
        ),
    }
}

fn main() -> Result<()> {
    println!("=== Error Handling Example ===\n");
    let cpu = Device::Cpu;
    let a = Tensor::new(&[1f32, 2.0, 3.0], &cpu)?;

    println!("1. Validation errors from the typed operators:");
    let wrong_shape = Tensor::zeros((2, 2), DType::F32, &cpu)?;
    report("shape", mymuladd(&a, &wrong_shape, 0.0));
    let wrong_dtype = Tensor::new(&[1i64, 2, 3], &cpu)?;
    report("dtype", mymuladd(&a, &wrong_dtype, 0.0));
    let square = Tensor::zeros((3, 3), DType::F32, &cpu)?;
    report("out view", myadd_out(&square, &square, &square.t()?));
    println!();

    println!("2. Device mismatch, checked on metadata only:");
    let registry = OpRegistry::with_builtin_ops(&OpsConfig::default())?;
    let on_cpu = TensorMeta::new(vec![3], DType::F32, DeviceLocation::Cpu);
    let on_gpu = TensorMeta::new(vec![3], DType::F32, DeviceLocation::Cuda { gpu_id: 0 });
    report(
        "device",
        registry.call_abstract("mymuladd", &[on_cpu.into(), on_gpu.into(), ArgMeta::Float(0.0)]),
    );
    println!();

    println!("3. Registry errors:");
    report("unknown", registry.call("dengww::mydiv", &[]));
    report("foreign namespace", registry.call("other::mymul", &[]));
    println!();

    println!("4. Backward with a context that never saved `a`:");
    let ctx = SavedContext::new("mymuladd", GradientRequest::from([false, true, false]), 3);
    report("backward", MulAddOp.backward(ctx, &a));
    println!();

    println!("5. Domain-specific wrapper:");
    let empty = Tensor::zeros(0, DType::F32, &cpu)?;
    match scale_and_shift("proj", &a, &empty, 1.0) {
        Ok(_) => println!("   ok"),
        Err(e) => println!("   {e}"),
    }
    match scale_and_shift("proj", &a, &wrong_shape, 1.0) {
        Ok(_) => println!("   ok"),
        Err(e) => println!("   {e}"),
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
