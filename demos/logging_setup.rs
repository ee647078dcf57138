//! Example: Logging Setup
//!
//! Configures the tracing subscriber and shows the structured events the
//! operators emit under the `dengww::*` targets.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example logging_setup
//! RUST_LOG=dengww=trace cargo run --example logging_setup
//! ```

use candle_core::{Device, Tensor};
use dengww_ops::{
    init_logging, init_registry, mymuladd, LogConfig, LogLevel, OpsConfig, Result, Value,
};
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    println!("=== Logging Setup Example ===\n");

    // 1. Preset configurations
    println!("1. Preset configurations:");
    let _dev = LogConfig::development();
    println!("   LogConfig::development() - Debug level, file/line, colors");
    let _prod = LogConfig::production();
    println!("   LogConfig::production() - Info level, no colors");
    let _test = LogConfig::testing();
    println!("   LogConfig::testing() - Warn level, no decorations\n");

    // 2. Builder pattern; the level also parses from a string
    let level: LogLevel = std::env::var("DEMO_LEVEL")
        .unwrap_or_else(|_| "debug".to_string())
        .parse()?;
    let config = LogConfig::new().with_level(level).with_timestamps(false);
    println!("2. Initializing logging at {level:?} (output appears on stderr)\n");
    init_logging(&config);

    // 3. Registry events (target dengww::registry)
    let registry = init_registry(&OpsConfig::default())?;
    info!(ops = registry.operator_names().len(), "registry ready");

    // 4. Dispatch and allocation events (targets dengww::ops, dengww::memory)
    let a = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu)?;
    let out = registry.call("mymuladd", &[Value::from(&a), Value::from(&a), Value::from(1.0)])?;
    debug!(?out, "registry call finished");

    // 5. Tape backward event (trace level)
    let var = candle_core::Var::new(&[2f32], &Device::Cpu)?;
    let y = mymuladd(var.as_tensor(), &Tensor::new(&[3f32], &Device::Cpu)?, 0.0)?;
    let grads = y.sum_all()?.backward()?;
    if grads.get(var.as_tensor()).is_none() {
        warn!("no gradient recorded for var");
    }

    println!("\n3. Environment variable configuration:");
    println!("     RUST_LOG=dengww::ops=debug      - dispatch events");
    println!("     RUST_LOG=dengww::memory=trace   - allocation accounting");
    println!("     RUST_LOG=dengww=trace           - everything, including tape backward");

    println!("\n=== Example Complete ===");
    Ok(())
}
