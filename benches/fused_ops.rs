//! Benchmarks for the fused operators against their candle compositions.

use candle_core::{DType, Device, Tensor};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dengww_ops::{myadd_out, mymuladd, OpRegistry, OpsConfig, TensorMeta, Value};
use std::hint::black_box;

/// Fused kernel versus `mul` + `affine`.
fn bench_muladd(c: &mut Criterion) {
    let mut group = c.benchmark_group("muladd");

    for len in [1_024usize, 65_536, 1_048_576] {
        let a = Tensor::rand(0f32, 1.0, len, &Device::Cpu).unwrap();
        let b = Tensor::rand(0f32, 1.0, len, &Device::Cpu).unwrap();

        group.bench_with_input(BenchmarkId::new("fused", len), &len, |bench, _| {
            bench.iter(|| black_box(mymuladd(&a, &b, 0.5).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("mul_affine", len), &len, |bench, _| {
            bench.iter(|| black_box(a.mul(&b).unwrap().affine(1.0, 0.5).unwrap()));
        });
    }

    group.finish();
}

/// In-place add versus allocating add.
fn bench_add_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_out");
    let len = 65_536;
    let a = Tensor::rand(0f32, 1.0, len, &Device::Cpu).unwrap();
    let b = Tensor::rand(0f32, 1.0, len, &Device::Cpu).unwrap();
    let out = Tensor::zeros(len, DType::F32, &Device::Cpu).unwrap();

    group.bench_function("in_place", |bench| {
        bench.iter(|| myadd_out(&a, &b, &out).unwrap());
    });
    group.bench_function("allocating", |bench| {
        bench.iter(|| black_box(a.add(&b).unwrap()));
    });

    group.finish();
}

/// Registry dispatch overhead, abstract and concrete.
fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let registry = OpRegistry::with_builtin_ops(&OpsConfig::default()).unwrap();
    let a = Tensor::ones(16, DType::F32, &Device::Cpu).unwrap();
    let args = [Value::from(&a), Value::from(&a), Value::from(1.0)];
    let metas: Vec<_> = args.iter().map(Value::meta).collect();

    group.bench_function("call_abstract", |bench| {
        bench.iter(|| black_box(registry.call_abstract("dengww::mymuladd", &metas).unwrap()));
    });
    group.bench_function("meta_of", |bench| {
        bench.iter(|| black_box(TensorMeta::of(&a)));
    });
    group.bench_function("call", |bench| {
        bench.iter(|| black_box(registry.call("dengww::mymuladd", &args).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_muladd, bench_add_out, bench_registry);
criterion_main!(benches);
