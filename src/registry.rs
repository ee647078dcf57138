// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Named operator registry.
//!
//! Operators are registered explicitly under a namespace (`dengww` by default)
//! and reached by qualified (`dengww::mymuladd`) or bare (`mymuladd`) name.
//! Nothing registers itself at load time: a process either builds an
//! [`OpRegistry`] directly or calls [`init_registry`] once and then uses
//! [`global_registry`].
//!
//! Every concrete call runs the operator's abstract kernel first, charges the
//! output bytes to the registry's [`MemoryTracker`] for the duration of the
//! kernel, and releases them once the kernel returns. The budget therefore
//! caps the largest single output, and `peak_bytes` reports the largest
//! output charged so far (or the sum of overlapping calls across threads).
//!
//! ```rust
//! use candle_core::{Device, Tensor};
//! use dengww_ops::{OpRegistry, OpsConfig, Value};
//!
//! let registry = OpRegistry::with_builtin_ops(&OpsConfig::default())?;
//! let a = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu)?;
//! let b = Tensor::new(&[4f32, 5.0, 6.0], &Device::Cpu)?;
//! let out = registry
//!     .call("dengww::mymuladd", &[Value::from(&a), Value::from(&b), Value::from(10.0)])?
//!     .expect("mymuladd returns a tensor");
//! assert_eq!(out.to_vec1::<f32>()?, vec![14.0, 20.0, 28.0]);
//! # Ok::<(), dengww_ops::CoreError>(())
//! ```

use crate::autograd::{GradientRequest, SavedContext};
use crate::config::OpsConfig;
use crate::device::{get_device, location_label, DeviceConfig};
use crate::error::{CoreError, Result};
use crate::logging::log_allocation;
use crate::memory::{estimate_tensor_bytes, MemoryTracker};
use crate::meta::TensorMeta;
use crate::ops::{AddOutOp, ArgMeta, FusedOp, MulAddOp, MulOp, Value};
use crate::traits::ValidatableConfig;
use candle_core::{Device, Tensor};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<OpRegistry> = OnceLock::new();

/// Result of a concrete call that also captured an autograd context.
#[derive(Debug)]
pub struct GradCall {
    /// Forward output.
    pub output: Tensor,
    /// Context to hand to [`OpRegistry::call_backward`].
    pub ctx: SavedContext,
}

/// Operator table for one namespace.
pub struct OpRegistry {
    namespace: String,
    ops: HashMap<String, Arc<dyn FusedOp>>,
    device: DeviceConfig,
    tracker: MemoryTracker,
}

impl std::fmt::Debug for OpRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpRegistry")
            .field("namespace", &self.namespace)
            .field("ops", &self.operator_names())
            .field("device", &self.device)
            .field("tracker", &self.tracker)
            .finish()
    }
}

impl OpRegistry {
    /// Empty registry.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if `config` fails validation.
    pub fn new(config: &OpsConfig) -> Result<Self> {
        config.validate()?;
        let tracker = if config.memory_limit > 0 {
            MemoryTracker::with_limit(config.memory_limit)
        } else {
            MemoryTracker::new()
        };
        Ok(Self {
            namespace: config.namespace.clone(),
            ops: HashMap::new(),
            device: config.device.clone(),
            tracker,
        })
    }

    /// Registry holding `mymuladd`, `mymul` and `myadd_out`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if `config` fails validation.
    pub fn with_builtin_ops(config: &OpsConfig) -> Result<Self> {
        let mut registry = Self::new(config)?;
        registry.register(Arc::new(MulAddOp))?;
        registry.register(Arc::new(MulOp))?;
        registry.register(Arc::new(AddOutOp))?;
        Ok(registry)
    }

    /// Add an operator under `namespace::name`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateOperator` if the name is taken.
    pub fn register(&mut self, op: Arc<dyn FusedOp>) -> Result<()> {
        let qualified = self.qualified_name(op.name());
        if self.ops.contains_key(op.name()) {
            return Err(CoreError::DuplicateOperator { name: qualified });
        }
        tracing::debug!(
            target: "dengww::registry",
            op = %qualified,
            schema = op.schema(),
            "registered operator"
        );
        self.ops.insert(op.name().to_string(), op);
        Ok(())
    }

    /// The registry namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace::name`.
    #[must_use]
    pub fn qualified_name(&self, name: &str) -> String {
        format!("{}::{name}", self.namespace)
    }

    /// Find an operator by qualified or bare name.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownOperator` if no operator matches, including
    /// names qualified with another namespace.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn FusedOp>> {
        let bare = match name.split_once("::") {
            Some((namespace, bare)) if namespace == self.namespace => bare,
            Some(_) => return Err(unknown(name)),
            None => name,
        };
        self.ops.get(bare).ok_or_else(|| unknown(name))
    }

    /// Whether `name` resolves to a registered operator.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Sorted qualified names of every registered operator.
    #[must_use]
    pub fn operator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ops.keys().map(|n| self.qualified_name(n)).collect();
        names.sort();
        names
    }

    /// Default device for tensors built on behalf of this registry, resolved
    /// from the configured [`DeviceConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured CUDA device cannot be opened.
    pub fn device(&self) -> Result<Device> {
        get_device(&self.device)
    }

    /// Output-allocation accounting for concrete calls.
    #[must_use]
    pub fn memory(&self) -> &MemoryTracker {
        &self.tracker
    }

    /// Run the abstract kernel only. Touches no tensor data and allocates nothing.
    ///
    /// # Errors
    ///
    /// `UnknownOperator`, or the operator's validation error.
    pub fn call_abstract(&self, name: &str, args: &[ArgMeta]) -> Result<Option<TensorMeta>> {
        let op = self.lookup(name)?;
        op.shape_check(args)
    }

    /// Run an operator on concrete arguments.
    ///
    /// # Errors
    ///
    /// `UnknownOperator`, the operator's validation error, `OutOfMemory` if the
    /// output would exceed the memory budget, or a kernel error.
    pub fn call(&self, name: &str, args: &[Value<'_>]) -> Result<Option<Tensor>> {
        let op = self.lookup(name)?;
        self.run(op.as_ref(), args)
    }

    /// Run a differentiable operator and capture its autograd context.
    ///
    /// `request` carries one flag per operator argument; only the leading
    /// [`FusedOp::differentiable_inputs`] flags may be set.
    ///
    /// # Errors
    ///
    /// As [`OpRegistry::call`], plus `InvalidArguments` for a malformed request
    /// and `NotImplemented` for operators without an autograd rule.
    pub fn call_with_grad(
        &self,
        name: &str,
        args: &[Value<'_>],
        request: &GradientRequest,
    ) -> Result<GradCall> {
        let op = self.lookup(name)?;
        if op.differentiable_inputs() == 0 {
            return Err(CoreError::not_implemented(format!(
                "autograd rule for {}",
                self.qualified_name(op.name())
            )));
        }
        if request.len() != op.arity() {
            return Err(CoreError::invalid_args(
                op.name(),
                format!(
                    "gradient request has {} flags, operator takes {} arguments",
                    request.len(),
                    op.arity()
                ),
            ));
        }
        if let Some(index) = (op.differentiable_inputs()..op.arity()).find(|&i| request.needs(i)) {
            return Err(CoreError::invalid_args(
                op.name(),
                format!("argument {index} is not differentiable"),
            ));
        }

        let output = self
            .run(op.as_ref(), args)?
            .ok_or_else(|| CoreError::invalid_args(op.name(), "operator returned no tensor"))?;
        let ctx = op.setup_context(request, args, &output)?;
        Ok(GradCall { output, ctx })
    }

    /// Consume a context captured by [`OpRegistry::call_with_grad`].
    ///
    /// # Errors
    ///
    /// `UnknownOperator`, or the operator's backward error.
    pub fn call_backward(&self, ctx: SavedContext, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        let op = self.lookup(ctx.op())?;
        op.backward(ctx, grad_output)
    }

    fn run(&self, op: &dyn FusedOp, args: &[Value<'_>]) -> Result<Option<Tensor>> {
        let metas: Vec<ArgMeta> = args.iter().map(Value::meta).collect();
        let signature = op.shape_check(&metas)?;

        let bytes = signature
            .as_ref()
            .map_or(0, |m| estimate_tensor_bytes(m.dims(), m.dtype()));
        self.tracker.allocate(bytes)?;

        tracing::debug!(
            target: "dengww::registry",
            op = %self.qualified_name(op.name()),
            device = %signature.as_ref().map(|m| location_label(m.location())).unwrap_or_default(),
            "call"
        );

        let result = op.forward(args);
        if bytes > 0 && result.is_ok() {
            log_allocation(op.name(), bytes, self.tracker.allocated_bytes());
        }
        // The output belongs to the caller from here on.
        self.tracker.deallocate(bytes);
        result
    }
}

fn unknown(name: &str) -> CoreError {
    CoreError::UnknownOperator {
        name: name.to_string(),
    }
}

/// Build the process-wide registry with the built-in operators.
///
/// Call once at startup. A second call leaves the first registry in place and
/// returns it.
///
/// # Errors
///
/// Returns `CoreError::InvalidConfig` if `config` fails validation.
pub fn init_registry(config: &OpsConfig) -> Result<&'static OpRegistry> {
    if let Some(registry) = GLOBAL.get() {
        tracing::debug!(target: "dengww::registry", "registry already initialized");
        return Ok(registry);
    }
    let registry = OpRegistry::with_builtin_ops(config)?;
    tracing::info!(
        target: "dengww::registry",
        namespace = registry.namespace(),
        ops = registry.operator_names().len(),
        "operator registry initialized"
    );
    Ok(GLOBAL.get_or_init(|| registry))
}

/// The registry built by [`init_registry`].
///
/// # Errors
///
/// Returns `CoreError::RegistryNotInitialized` before [`init_registry`] ran.
pub fn global_registry() -> Result<&'static OpRegistry> {
    GLOBAL.get().ok_or(CoreError::RegistryNotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, DeviceLocation};

    fn registry() -> OpRegistry {
        OpRegistry::with_builtin_ops(&OpsConfig::default()).unwrap()
    }

    fn t(data: &[f32]) -> Tensor {
        Tensor::new(data, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(
            registry().operator_names(),
            vec!["dengww::myadd_out", "dengww::mymul", "dengww::mymuladd"]
        );
    }

    #[test]
    fn test_lookup_qualified_and_bare() {
        let registry = registry();
        assert_eq!(registry.lookup("dengww::mymul").unwrap().name(), "mymul");
        assert_eq!(registry.lookup("mymul").unwrap().name(), "mymul");
        assert!(matches!(
            registry.lookup("other::mymul"),
            Err(CoreError::UnknownOperator { .. })
        ));
        assert!(!registry.contains("dengww::mydiv"));
    }

    #[test]
    fn test_custom_namespace() {
        let registry = OpRegistry::with_builtin_ops(&OpsConfig::new().with_namespace("lab")).unwrap();
        assert!(registry.contains("lab::mymuladd"));
        assert!(!registry.contains("dengww::mymuladd"));
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let err = OpRegistry::new(&OpsConfig::new().with_namespace("not a name")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = registry();
        let err = registry.register(Arc::new(MulOp)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateOperator { ref name } if name == "dengww::mymul"));
    }

    #[test]
    fn test_call_charges_output_bytes() {
        let registry = registry();
        let (a, b) = (t(&[1.0, 2.0, 3.0]), t(&[4.0, 5.0, 6.0]));
        let out = registry
            .call("mymuladd", &[Value::from(&a), Value::from(&b), Value::from(10.0)])
            .unwrap()
            .unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![14.0, 20.0, 28.0]);
        assert_eq!(registry.memory().peak_bytes(), 12);
        assert_eq!(registry.memory().allocated_bytes(), 0);

        let dst = Tensor::zeros(3, DType::F32, &Device::Cpu).unwrap();
        let ret = registry
            .call("myadd_out", &[Value::from(&a), Value::from(&b), Value::from(&dst)])
            .unwrap();
        assert!(ret.is_none());
        assert_eq!(registry.memory().peak_bytes(), 12);
        assert_eq!(registry.memory().allocated_bytes(), 0);
    }

    #[test]
    fn test_budget_released_between_calls() {
        let registry = OpRegistry::with_builtin_ops(&OpsConfig::new().with_memory_limit(1024)).unwrap();
        let (a, b) = (t(&[1.0, 2.0, 3.0]), t(&[4.0, 5.0, 6.0]));
        for _ in 0..200 {
            let out = registry
                .call("mymul", &[Value::from(&a), Value::from(&b)])
                .unwrap()
                .unwrap();
            assert_eq!(out.dims(), &[3]);
        }
        assert_eq!(registry.memory().allocated_bytes(), 0);
        assert_eq!(registry.memory().peak_bytes(), 12);
    }

    #[test]
    fn test_device_follows_config() {
        let config = OpsConfig::new().with_device(DeviceConfig::new().with_force_cpu(true));
        let registry = OpRegistry::new(&config).unwrap();
        assert!(matches!(registry.device().unwrap(), Device::Cpu));
    }

    #[test]
    fn test_memory_budget_preflight() {
        let registry = OpRegistry::with_builtin_ops(&OpsConfig::new().with_memory_limit(8)).unwrap();
        let (a, b) = (t(&[1.0, 2.0, 3.0]), t(&[4.0, 5.0, 6.0]));
        let err = registry
            .call("mymul", &[Value::from(&a), Value::from(&b)])
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfMemory { .. }));
        assert_eq!(registry.memory().allocated_bytes(), 0);
    }

    #[test]
    fn test_validation_error_allocates_nothing() {
        let registry = registry();
        let err = registry
            .call("mymul", &[Value::from(&t(&[1.0, 2.0])), Value::from(&t(&[1.0]))])
            .unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
        assert_eq!(registry.memory().allocated_bytes(), 0);
    }

    #[test]
    fn test_call_abstract() {
        let registry = registry();
        let meta = TensorMeta::new(vec![8, 8], DType::F32, DeviceLocation::Cuda { gpu_id: 0 });
        let out = registry
            .call_abstract(
                "dengww::mymuladd",
                &[meta.clone().into(), meta.clone().into(), ArgMeta::Float(1.0)],
            )
            .unwrap();
        assert_eq!(out, Some(meta));
        assert_eq!(registry.memory().allocated_bytes(), 0);
    }

    #[test]
    fn test_grad_round_trip() {
        let registry = registry();
        let (a, b) = (t(&[2.0]), t(&[3.0]));
        let args = [Value::from(&a), Value::from(&b), Value::from(0.0)];
        let call = registry
            .call_with_grad("mymuladd", &args, &GradientRequest::from([true, true, false]))
            .unwrap();
        assert_eq!(call.output.to_vec1::<f32>().unwrap(), vec![6.0]);
        assert_eq!(call.ctx.saved_count(), 2);

        let grads = registry.call_backward(call.ctx, &t(&[1.0])).unwrap();
        assert_eq!(grads[0].as_ref().unwrap().to_vec1::<f32>().unwrap(), vec![3.0]);
        assert_eq!(grads[1].as_ref().unwrap().to_vec1::<f32>().unwrap(), vec![2.0]);
        assert!(grads[2].is_none());
    }

    #[test]
    fn test_grad_request_checks() {
        let registry = registry();
        let (a, b) = (t(&[2.0]), t(&[3.0]));
        let args = [Value::from(&a), Value::from(&b), Value::from(0.0)];

        let err = registry
            .call_with_grad("mymuladd", &args, &GradientRequest::from([true, true, true]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArguments { .. }));

        let err = registry
            .call_with_grad("mymuladd", &args, &GradientRequest::from([true]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArguments { .. }));

        let err = registry
            .call_with_grad("mymul", &args[..2], &GradientRequest::all(2))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented { .. }));
    }
}
