// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Process-wide registry lifecycle. Kept in its own test binary so no other
//! test can initialize the registry first.

use candle_core::{Device, Tensor};
use dengww_ops::{global_registry, init_registry, CoreError, OpsConfig, Value};

#[test]
fn test_global_registry_lifecycle() {
    assert!(matches!(
        global_registry().unwrap_err(),
        CoreError::RegistryNotInitialized
    ));

    let registry = init_registry(&OpsConfig::default()).unwrap();
    assert_eq!(registry.namespace(), "dengww");

    // A second init keeps the first registry.
    let again = init_registry(&OpsConfig::new().with_namespace("other")).unwrap();
    assert_eq!(again.namespace(), "dengww");

    let global = global_registry().unwrap();
    assert!(std::ptr::eq(global, registry));

    let a = Tensor::new(&[2f32, 3.0], &Device::Cpu).unwrap();
    let out = global
        .call("dengww::mymul", &[Value::from(&a), Value::from(&a)])
        .unwrap()
        .unwrap();
    assert_eq!(out.to_vec1::<f32>().unwrap(), vec![4.0, 9.0]);
}
