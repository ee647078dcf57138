//! Example: Fitting with `mymuladd`
//!
//! Fits `y = w * x + 0.5` by gradient descent, with `mymuladd` in the forward
//! pass and its hand-written backward rule supplying `dloss/dw`.
//!
//! Run with:
//! ```bash
//! cargo run --example muladd_training
//! ```

use candle_core::{Device, Tensor, Var};
use dengww_ops::{init_logging, mymuladd, LogConfig, Result};

fn main() -> Result<()> {
    init_logging(&LogConfig::default());

    let device = Device::Cpu;
    let x = Tensor::new(&[1.0f32, 2.0, 3.0, 4.0, 5.0], &device)?;
    let target = Tensor::new(&[3.5f32, 6.5, 9.5, 12.5, 15.5], &device)?; // w = 3

    let w = Var::ones(5, candle_core::DType::F32, &device)?;
    let lr = 0.01;

    for step in 0..200 {
        let y = mymuladd(w.as_tensor(), &x, 0.5)?;
        let loss = y.sub(&target)?.sqr()?.mean_all()?;
        let grads = loss.backward()?;
        let Some(grad_w) = grads.get(w.as_tensor()) else {
            break;
        };
        w.set(&w.as_tensor().sub(&grad_w.affine(lr, 0.0)?)?)?;

        if step % 50 == 0 {
            println!("step {step:3}  loss {:.5}", loss.to_scalar::<f32>()?);
        }
    }

    println!("learned w = {:?}", w.as_tensor().to_vec1::<f32>()?);
    Ok(())
}
