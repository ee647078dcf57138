//! Example: Operator Registry
//!
//! Initializes the process-wide registry, lists the operators, runs the
//! abstract kernel on metadata only, and calls each operator by name.
//!
//! Run with:
//! ```bash
//! cargo run --example registry_tour
//! DENGWW_NAMESPACE=lab cargo run --example registry_tour
//! ```

use candle_core::{DType, DeviceLocation, Tensor};
use dengww_ops::{
    init_registry, ArgMeta, GradientRequest, OpsConfig, Result, TensorMeta, Value,
};

fn main() -> Result<()> {
    let config = OpsConfig::from_env()?;
    let registry = init_registry(&config)?;

    println!("=== Registered operators ===");
    for name in registry.operator_names() {
        let op = registry.lookup(&name)?;
        println!("  {name:<24} {}", op.schema());
    }

    // Abstract call: nothing is allocated, the device need not exist.
    let meta = TensorMeta::new(vec![1024, 1024], DType::F32, DeviceLocation::Cuda { gpu_id: 0 });
    let out = registry.call_abstract(
        "mymuladd",
        &[meta.clone().into(), meta.into(), ArgMeta::Float(1.0)],
    )?;
    println!("\nabstract mymuladd -> {out:?}");

    // Concrete calls on the configured device (DENGWW_FORCE_CPU, DENGWW_CUDA_DEVICE).
    let device = registry.device()?;
    println!("device: {device:?}");
    let a = Tensor::new(&[1f32, 2.0, 3.0], &device)?;
    let b = Tensor::new(&[4f32, 5.0, 6.0], &device)?;
    let muladd = registry.qualified_name("mymuladd");
    if let Some(out) = registry.call(&muladd, &[Value::from(&a), Value::from(&b), Value::from(10.0)])? {
        println!("{muladd} -> {:?}", out.to_vec1::<f32>()?);
    }

    let out = Tensor::zeros(3, DType::F32, &device)?;
    registry.call("myadd_out", &[Value::from(&a), Value::from(&b), Value::from(&out)])?;
    println!("myadd_out wrote {:?}", out.to_vec1::<f32>()?);

    // Explicit autograd round trip.
    let call = registry.call_with_grad(
        "mymuladd",
        &[Value::from(&a), Value::from(&b), Value::from(0.0)],
        &GradientRequest::from([true, false, false]),
    )?;
    println!("saved tensors for grad_a only: {}", call.ctx.saved_count());
    let grads = registry.call_backward(call.ctx, &Tensor::ones(3, DType::F32, &device)?)?;
    if let Some(grad_a) = &grads[0] {
        println!("grad_a = {:?}", grad_a.to_vec1::<f32>()?);
    }

    let memory = registry.memory();
    let budget = match memory.limit_bytes() {
        0 => "unlimited".to_string(),
        limit => format!("{limit} bytes"),
    };
    println!(
        "\nlargest output charged: {} bytes (in flight now: {}, budget: {budget})",
        memory.peak_bytes(),
        memory.allocated_bytes()
    );

    // Start a fresh high-water mark for the next phase.
    memory.reset();
    let big = Tensor::ones(1024, DType::F32, &device)?;
    registry.call("mymul", &[Value::from(&big), Value::from(&big)])?;
    println!("peak after reset and one 1024-element call: {} bytes", memory.peak_bytes());
    Ok(())
}
